//! Method returns. Popping the frame restores the caller's pc; returned
//! values move from the finished frame's operand stack onto the caller's.

use crate::env::JavaEnv;
use crate::error::VmError;

pub fn nop(_env: &mut JavaEnv) -> Result<(), VmError> {
    Ok(())
}

/// `ireturn`/`freturn`/`areturn`: one slot travels to the caller.
pub fn return_word(env: &mut JavaEnv) -> Result<(), VmError> {
    let value = env.thread.top_mut()?.stack.pop()?;
    env.thread.pop_frame()?;

    // The entry frame has no caller; its value evaporates with it.
    if let Some(caller) = env.thread.frames.last_mut() {
        caller.stack.push(value)?;
    }

    Ok(())
}

/// `lreturn`/`dreturn`: the slot pair travels to the caller.
pub fn return_pair(env: &mut JavaEnv) -> Result<(), VmError> {
    let value = env.thread.top_mut()?.pop_long()?;
    env.thread.pop_frame()?;

    if let Some(caller) = env.thread.frames.last_mut() {
        let (low, high) = crate::mem::slot::from_long(value);
        caller.stack.push(low)?;
        caller.stack.push(high)?;
    }

    Ok(())
}

/// `return`: the frame pops, nothing travels.
pub fn return_void(env: &mut JavaEnv) -> Result<(), VmError> {
    env.thread.pop_frame()?;
    Ok(())
}
