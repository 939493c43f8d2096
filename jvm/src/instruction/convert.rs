//! Type conversions. Float-to-integer casts follow the JVM rules: NaN
//! becomes zero and out-of-range values saturate, which is exactly what
//! Rust's `as` does for float casts. Narrowing integer conversions
//! truncate and re-extend.

use crate::env::JavaEnv;
use crate::error::VmError;

pub fn i2l(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_long(value as i64)
}

pub fn i2f(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_float(value as f32)
}

pub fn i2d(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_double(value as f64)
}

pub fn l2i(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_long()?;
    frame.push_int(value as i32)
}

pub fn l2f(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_long()?;
    frame.push_float(value as f32)
}

pub fn l2d(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_long()?;
    frame.push_double(value as f64)
}

pub fn f2i(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_float()?;
    frame.push_int(value as i32)
}

pub fn f2l(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_float()?;
    frame.push_long(value as i64)
}

pub fn f2d(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_float()?;
    frame.push_double(value as f64)
}

pub fn d2i(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_double()?;
    frame.push_int(value as i32)
}

pub fn d2l(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_double()?;
    frame.push_long(value as i64)
}

pub fn d2f(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_double()?;
    frame.push_float(value as f32)
}

pub fn i2b(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_int(value as i8 as i32)
}

pub fn i2c(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_int(value as u16 as i32)
}

pub fn i2s(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_int()?;
    frame.push_int(value as i16 as i32)
}
