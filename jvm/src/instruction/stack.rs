//! Raw slot shuffles. With the stack modeled as 32-bit words these are
//! direct permutations; the category-2 variants fall out of the slot
//! arithmetic.

use crate::env::JavaEnv;
use crate::error::VmError;

pub fn pop(env: &mut JavaEnv) -> Result<(), VmError> {
    env.thread.top_mut()?.stack.pop()?;
    Ok(())
}

pub fn pop2(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    frame.stack.pop()?;
    frame.stack.pop()?;
    Ok(())
}

pub fn dup(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.stack.peek()?;
    frame.stack.push(value)
}

pub fn dup_x1(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;

    frame.stack.push(v1)?;
    frame.stack.push(v2)?;
    frame.stack.push(v1)
}

pub fn dup_x2(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;
    let v3 = frame.stack.pop()?;

    frame.stack.push(v1)?;
    frame.stack.push(v3)?;
    frame.stack.push(v2)?;
    frame.stack.push(v1)
}

pub fn dup2(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;

    frame.stack.push(v2)?;
    frame.stack.push(v1)?;
    frame.stack.push(v2)?;
    frame.stack.push(v1)
}

pub fn dup2_x1(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;
    let v3 = frame.stack.pop()?;

    frame.stack.push(v2)?;
    frame.stack.push(v1)?;
    frame.stack.push(v3)?;
    frame.stack.push(v2)?;
    frame.stack.push(v1)
}

pub fn dup2_x2(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;
    let v3 = frame.stack.pop()?;
    let v4 = frame.stack.pop()?;

    frame.stack.push(v2)?;
    frame.stack.push(v1)?;
    frame.stack.push(v4)?;
    frame.stack.push(v3)?;
    frame.stack.push(v2)?;
    frame.stack.push(v1)
}

pub fn swap(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let v1 = frame.stack.pop()?;
    let v2 = frame.stack.pop()?;

    frame.stack.push(v1)?;
    frame.stack.push(v2)
}
