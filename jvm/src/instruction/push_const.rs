//! Constants and immediates.

use class_format::Constant;

use crate::env::JavaEnv;
use crate::error::VmError;
use crate::mem::slot;

pub fn aconst_null(env: &mut JavaEnv) -> Result<(), VmError> {
    env.thread.top_mut()?.stack.push(slot::NULL)
}

pub fn iconst(env: &mut JavaEnv, value: i32) -> Result<(), VmError> {
    env.thread.top_mut()?.push_int(value)
}

pub fn lconst(env: &mut JavaEnv, value: i64) -> Result<(), VmError> {
    env.thread.top_mut()?.push_long(value)
}

pub fn fconst(env: &mut JavaEnv, value: f32) -> Result<(), VmError> {
    env.thread.top_mut()?.push_float(value)
}

pub fn dconst(env: &mut JavaEnv, value: f64) -> Result<(), VmError> {
    env.thread.top_mut()?.push_double(value)
}

pub fn bipush(env: &mut JavaEnv) -> Result<(), VmError> {
    let value = env.thread.operand_i8(1)? as i32;
    env.thread.pc += 1;
    env.thread.top_mut()?.push_int(value)
}

pub fn sipush(env: &mut JavaEnv) -> Result<(), VmError> {
    let value = env.thread.operand_i16(1)? as i32;
    env.thread.pc += 2;
    env.thread.top_mut()?.push_int(value)
}

pub fn ldc(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    env.thread.pc += 1;
    push_single_constant(env, index)
}

pub fn ldc_w(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    env.thread.pc += 2;
    push_single_constant(env, index)
}

fn push_single_constant(env: &mut JavaEnv, index: u16) -> Result<(), VmError> {
    let pool = env.thread.top()?.pool.clone();

    match pool.try_get(index).map_err(crate::error::bad_constant)? {
        Constant::Int(value) => env.thread.top_mut()?.push_int(*value),
        Constant::Float(value) => env.thread.top_mut()?.push_float(*value),
        Constant::String { string_index } => {
            let text = pool
                .text(*string_index)
                .map_err(crate::error::bad_constant)?
                .to_string();
            let handle = env.intern_string(&text);
            env.thread.top_mut()?.stack.push(handle)
        }
        x => Err(VmError::BadConstant(format!(
            "ldc of unsupported constant {:?}",
            x
        ))),
    }
}

pub fn ldc2_w(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    env.thread.pc += 2;

    let pool = env.thread.top()?.pool.clone();
    match pool.try_get(index).map_err(crate::error::bad_constant)? {
        Constant::Long(value) => env.thread.top_mut()?.push_long(*value),
        Constant::Double(value) => env.thread.top_mut()?.push_double(*value),
        x => Err(VmError::BadConstant(format!(
            "ldc2_w of unsupported constant {:?}",
            x
        ))),
    }
}
