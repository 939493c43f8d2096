//! Transfers between the local variable array and the operand stack,
//! including the `wide` prefix forms.

use class_format::Opcode;

use crate::env::JavaEnv;
use crate::error::VmError;

pub fn iload(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    env.thread.pc += 1;
    load_word(env, index)
}

pub fn lload(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    env.thread.pc += 1;
    load_pair(env, index)
}

pub fn istore(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    env.thread.pc += 1;
    store_word(env, index)
}

pub fn lstore(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    env.thread.pc += 1;
    store_pair(env, index)
}

/// `iload`/`fload`/`aload` and their `_n` forms all move one raw slot.
pub fn load_word(env: &mut JavaEnv, index: u16) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.local(index)?;
    frame.stack.push(value)
}

/// `lload`/`dload` and `_n` forms move a slot pair; the high half lives at
/// the lower local index and ends up on top of the stack.
pub fn load_pair(env: &mut JavaEnv, index: u16) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.local_pair(index)?;
    frame.push_long(value)
}

pub fn store_word(env: &mut JavaEnv, index: u16) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.stack.pop()?;
    frame.set_local(index, value)
}

pub fn store_pair(env: &mut JavaEnv, index: u16) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_long()?;
    frame.set_local_pair(index, value)
}

pub fn iinc(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u8(1)? as u16;
    let constant = env.thread.operand_i8(2)? as i32;
    env.thread.pc += 2;

    increment(env, index, constant)
}

fn increment(env: &mut JavaEnv, index: u16, constant: i32) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.local(index)? as i32;
    frame.set_local(index, value.wrapping_add(constant) as u32)
}

/// `wide` widens the local index of the prefixed instruction to 16 bits;
/// the `iinc` form also widens the increment to a signed 16-bit value.
pub fn wide(env: &mut JavaEnv) -> Result<(), VmError> {
    let target = env.thread.operand_u8(1)?;
    let opcode = Opcode::from_byte(target).ok_or(VmError::UnknownOpcode { opcode: target })?;
    let index = env.thread.operand_u16(2)?;

    match opcode {
        Opcode::Iload | Opcode::Fload | Opcode::Aload => {
            env.thread.pc += 3;
            load_word(env, index)
        }
        Opcode::Lload | Opcode::Dload => {
            env.thread.pc += 3;
            load_pair(env, index)
        }
        Opcode::Istore | Opcode::Fstore | Opcode::Astore => {
            env.thread.pc += 3;
            store_word(env, index)
        }
        Opcode::Lstore | Opcode::Dstore => {
            env.thread.pc += 3;
            store_pair(env, index)
        }
        Opcode::Iinc => {
            let constant = env.thread.operand_i16(4)? as i32;
            env.thread.pc += 5;
            increment(env, index, constant)
        }
        Opcode::Ret => {
            let frame = env.thread.top_mut()?;
            let target_pc = frame.local(index)? as i64;
            env.thread.pc = target_pc - 1;
            Ok(())
        }
        _ => Err(VmError::UnsupportedOpcode("wide prefix on this opcode")),
    }
}
