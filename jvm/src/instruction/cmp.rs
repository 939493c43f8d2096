//! Comparisons and control transfer. Branch targets are relative to the
//! opcode's own offset; handlers park the pc one byte short so the loop's
//! advance lands exactly on the target.

use std::cmp::Ordering;

use crate::env::JavaEnv;
use crate::error::VmError;
use crate::mem::slot;

fn take_branch_16(env: &mut JavaEnv) -> Result<(), VmError> {
    let offset = env.thread.operand_i16(1)? as i64;
    env.thread.pc += offset - 1;
    Ok(())
}

pub fn lcmp(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value2 = frame.pop_long()?;
    let value1 = frame.pop_long()?;

    frame.push_int(match value1.cmp(&value2) {
        Ordering::Greater => 1,
        Ordering::Equal => 0,
        Ordering::Less => -1,
    })
}

/// `fcmpl`/`fcmpg` differ only in the value pushed for an unordered pair.
pub fn fcmp(env: &mut JavaEnv, on_nan: i32) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value2 = frame.pop_float()?;
    let value1 = frame.pop_float()?;

    frame.push_int(match value1.partial_cmp(&value2) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Less) => -1,
        None => on_nan,
    })
}

pub fn dcmp(env: &mut JavaEnv, on_nan: i32) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value2 = frame.pop_double()?;
    let value1 = frame.pop_double()?;

    frame.push_int(match value1.partial_cmp(&value2) {
        Some(Ordering::Greater) => 1,
        Some(Ordering::Equal) => 0,
        Some(Ordering::Less) => -1,
        None => on_nan,
    })
}

/// `ifeq` family: pop one int, compare against zero.
pub fn if_zero(env: &mut JavaEnv, cond: fn(i32) -> bool) -> Result<(), VmError> {
    let value = env.thread.top_mut()?.pop_int()?;

    if cond(value) {
        take_branch_16(env)
    } else {
        env.thread.pc += 2;
        Ok(())
    }
}

/// `if_icmp*`: value2 comes off the top, value1 beneath it, and the
/// comparison reads `value1 <op> value2`.
pub fn if_icmp(env: &mut JavaEnv, cond: fn(i32, i32) -> bool) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value2 = frame.pop_int()?;
    let value1 = frame.pop_int()?;

    if cond(value1, value2) {
        take_branch_16(env)
    } else {
        env.thread.pc += 2;
        Ok(())
    }
}

/// `if_acmpeq`/`if_acmpne` compare reference slots bit for bit.
pub fn if_acmp(env: &mut JavaEnv, want_equal: bool) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value2 = frame.stack.pop()?;
    let value1 = frame.stack.pop()?;

    if (value1 == value2) == want_equal {
        take_branch_16(env)
    } else {
        env.thread.pc += 2;
        Ok(())
    }
}

/// `ifnull`/`ifnonnull` compare against the null reference.
pub fn if_null(env: &mut JavaEnv, want_null: bool) -> Result<(), VmError> {
    let value = env.thread.top_mut()?.stack.pop()?;

    if (value == slot::NULL) == want_null {
        take_branch_16(env)
    } else {
        env.thread.pc += 2;
        Ok(())
    }
}

pub fn goto(env: &mut JavaEnv) -> Result<(), VmError> {
    take_branch_16(env)
}

pub fn goto_w(env: &mut JavaEnv) -> Result<(), VmError> {
    let offset = env.thread.operand_i32(1)? as i64;
    env.thread.pc += offset - 1;
    Ok(())
}

/// `jsr` pushes the return address (the offset of the following
/// instruction) and branches.
pub fn jsr(env: &mut JavaEnv) -> Result<(), VmError> {
    let return_address = (env.thread.pc + 3) as u32;
    env.thread.top_mut()?.stack.push(return_address)?;
    take_branch_16(env)
}

pub fn jsr_w(env: &mut JavaEnv) -> Result<(), VmError> {
    let return_address = (env.thread.pc + 5) as u32;
    env.thread.top_mut()?.stack.push(return_address)?;
    goto_w(env)
}

/// `ret` reads the return address saved by `jsr` out of a local variable.
pub fn ret(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    let target = env.thread.top_mut()?.local(index)? as i64;
    env.thread.pc = target - 1;
    Ok(())
}

/// `tableswitch`: aligned jump table indexed by `key - low`, with keys
/// outside `[low, high]` going to the default target. Padding counts from
/// the instruction's offset in the code array.
pub fn tableswitch(env: &mut JavaEnv) -> Result<(), VmError> {
    let pad = class_format::opcode::switch_padding(env.thread.pc as usize) as i64;

    let default = env.thread.operand_i32(1 + pad)? as i64;
    let low = env.thread.operand_i32(1 + pad + 4)?;
    let high = env.thread.operand_i32(1 + pad + 8)?;

    let key = env.thread.top_mut()?.pop_int()?;

    let offset = if key < low || key > high {
        default
    } else {
        let slot = (key - low) as i64;
        env.thread.operand_i32(1 + pad + 12 + 4 * slot)? as i64
    };

    env.thread.pc += offset - 1;
    Ok(())
}

/// `lookupswitch`: sorted `(match, offset)` pairs scanned for an exact
/// key.
pub fn lookupswitch(env: &mut JavaEnv) -> Result<(), VmError> {
    let pad = class_format::opcode::switch_padding(env.thread.pc as usize) as i64;

    let default = env.thread.operand_i32(1 + pad)? as i64;
    let npairs = env.thread.operand_i32(1 + pad + 4)? as i64;

    let key = env.thread.top_mut()?.pop_int()?;

    let mut offset = default;
    for pair in 0..npairs {
        let candidate = env.thread.operand_i32(1 + pad + 8 + 8 * pair)?;
        if candidate == key {
            offset = env.thread.operand_i32(1 + pad + 8 + 8 * pair + 4)? as i64;
            break;
        }
        if candidate > key {
            break;
        }
    }

    env.thread.pc += offset - 1;
    Ok(())
}
