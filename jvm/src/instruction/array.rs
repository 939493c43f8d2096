//! Array allocation and element access. All access checks the reference
//! for null and the index against the bounds before touching storage.

use class_format::FieldDescriptor;

use crate::env::{ClassResolution, JavaEnv};
use crate::error::VmError;
use crate::hooks;
use crate::mem::heap::{ArrayType, HeapEntry, JavaArray};
use crate::mem::slot;

pub fn newarray(env: &mut JavaEnv) -> Result<(), VmError> {
    let atype = env.thread.operand_u8(1)?;
    let kind = ArrayType::from_atype(atype)
        .ok_or_else(|| VmError::BadConstant(format!("newarray type code {}", atype)))?;
    env.thread.pc += 1;

    let count = env.thread.top_mut()?.pop_int()?;
    if count < 0 {
        return Err(VmError::NegativeArraySize(count));
    }

    let reference = env
        .heap
        .alloc(HeapEntry::Array(JavaArray::primitive(kind, count as usize)));
    env.thread.top_mut()?.stack.push(reference)
}

pub fn anewarray(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let component = {
        let pool = &env.thread.top()?.pool;
        pool.class_name(index)
            .map_err(crate::error::bad_constant)?
            .to_string()
    };

    // Resolving the component class can stage initializers; arrays of
    // external classes skip the load entirely.
    if !hooks::is_external(&component) && !component.starts_with('[') {
        if let ClassResolution::Staged = env.resolve_class(&component)? {
            return Ok(());
        }
    }
    env.thread.pc += 2;

    let count = env.thread.top_mut()?.pop_int()?;
    if count < 0 {
        return Err(VmError::NegativeArraySize(count));
    }

    let reference = env
        .heap
        .alloc(HeapEntry::Array(JavaArray::reference(vec![
            slot::NULL;
            count as usize
        ])));
    env.thread.top_mut()?.stack.push(reference)
}

/// `multianewarray` allocates the outer dimension and recursively fills
/// each slot with the next dimension's arrays. A zero count short-circuits
/// the deeper dimensions.
pub fn multianewarray(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let dimensions = env.thread.operand_u8(3)? as usize;

    let descriptor = {
        let pool = &env.thread.top()?.pool;
        pool.class_name(index)
            .map_err(crate::error::bad_constant)?
            .to_string()
    };
    env.thread.pc += 3;

    let mut counts = Vec::with_capacity(dimensions);
    {
        let frame = env.thread.top_mut()?;
        for _ in 0..dimensions {
            counts.push(frame.pop_int()?);
        }
    }
    // Counts were pushed first-dimension first, so they pop in reverse.
    counts.reverse();

    for &count in &counts {
        if count < 0 {
            return Err(VmError::NegativeArraySize(count));
        }
    }

    let element = FieldDescriptor::parse(&descriptor).map_err(crate::error::bad_constant)?;
    let reference = allocate_dimension(env, &element, &counts)?;
    env.thread.top_mut()?.stack.push(reference)
}

fn allocate_dimension(
    env: &mut JavaEnv,
    descriptor: &FieldDescriptor,
    counts: &[i32],
) -> Result<u32, VmError> {
    let (count, rest) = match counts.split_first() {
        Some(v) => v,
        None => return Ok(slot::NULL),
    };
    let length = *count as usize;

    let inner = match descriptor {
        FieldDescriptor::Array(inner) => inner.as_ref(),
        _ => {
            return Err(VmError::BadConstant(format!(
                "multianewarray on non-array descriptor {}",
                descriptor
            )))
        }
    };

    if rest.is_empty() {
        let array = match inner {
            FieldDescriptor::Boolean => JavaArray::primitive(ArrayType::Boolean, length),
            FieldDescriptor::Char => JavaArray::primitive(ArrayType::Char, length),
            FieldDescriptor::Float => JavaArray::primitive(ArrayType::Float, length),
            FieldDescriptor::Double => JavaArray::primitive(ArrayType::Double, length),
            FieldDescriptor::Byte => JavaArray::primitive(ArrayType::Byte, length),
            FieldDescriptor::Short => JavaArray::primitive(ArrayType::Short, length),
            FieldDescriptor::Int => JavaArray::primitive(ArrayType::Int, length),
            FieldDescriptor::Long => JavaArray::primitive(ArrayType::Long, length),
            FieldDescriptor::Object(_) | FieldDescriptor::Array(_) => {
                JavaArray::reference(vec![slot::NULL; length])
            }
        };
        return Ok(env.heap.alloc(HeapEntry::Array(array)));
    }

    let mut elements = Vec::with_capacity(length);
    for _ in 0..length {
        elements.push(allocate_dimension(env, inner, rest)?);
    }

    Ok(env.heap.alloc(HeapEntry::Array(JavaArray::reference(elements))))
}

pub fn arraylength(env: &mut JavaEnv) -> Result<(), VmError> {
    let reference = env.thread.top_mut()?.stack.pop()?;
    let length = env.heap.array(reference)?.len() as i32;
    env.thread.top_mut()?.push_int(length)
}

/// Single-slot element load (`iaload`, `faload`, `aaload`, `baload`,
/// `caload`, `saload`).
pub fn load_word(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let index = frame.pop_int()?;
    let reference = frame.stack.pop()?;

    let value = env.heap.array(reference)?.load_word(index)?;
    env.thread.top_mut()?.stack.push(value)
}

/// Category-2 element load (`laload`, `daload`).
pub fn load_pair(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let index = frame.pop_int()?;
    let reference = frame.stack.pop()?;

    let value = env.heap.array(reference)?.load_long(index)?;
    env.thread.top_mut()?.push_long(value)
}

/// Single-slot element store.
pub fn store_word(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.stack.pop()?;
    let index = frame.pop_int()?;
    let reference = frame.stack.pop()?;

    env.heap.array_mut(reference)?.store_word(index, value)
}

/// Category-2 element store.
pub fn store_pair(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let value = frame.pop_long()?;
    let index = frame.pop_int()?;
    let reference = frame.stack.pop()?;

    env.heap.array_mut(reference)?.store_long(index, value)
}
