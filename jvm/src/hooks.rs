//! The native bridge: emulation of the handful of standard library
//! surfaces programs actually touch. Any class under a recognized prefix
//! is never loaded from disk; field and method operations against it are
//! diverted here. The contract with the interpreter is purely stack
//! shaped: consume what a genuine call with the same descriptor would
//! consume, produce a value of the declared return type.

use std::io::Write;

use class_format::FieldDescriptor;

use crate::env::JavaEnv;
use crate::error::VmError;
use crate::mem::heap::HeapEntry;
use crate::mem::slot;

/// Root namespaces of the emulated library.
const EXTERNAL_PREFIXES: &[&str] = &["java/"];

pub fn is_external(class: &str) -> bool {
    EXTERNAL_PREFIXES
        .iter()
        .any(|prefix| class.starts_with(prefix))
}

/// `getstatic` on an external class. `System.out` yields the shared
/// console handle; everything else produces a default of the field type.
pub fn get_static(
    env: &mut JavaEnv,
    class: &str,
    field: &str,
    descriptor: &str,
) -> Result<(), VmError> {
    if class == "java/lang/System" && (field == "out" || field == "err") {
        let handle = env.intern_string("java/lang/System.out");
        return env.thread.top_mut()?.stack.push(handle);
    }

    push_default(env, descriptor)
}

/// `putstatic` on an external class discards the value.
pub fn put_static(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    let width = field_width(descriptor)?;
    let frame = env.thread.top_mut()?;
    frame.stack.pop_block(width)?;
    Ok(())
}

/// `getfield` on an external class: drop the receiver, produce a default.
pub fn get_field(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    env.thread.top_mut()?.stack.pop()?;
    push_default(env, descriptor)
}

/// `putfield` on an external class: drop value and receiver.
pub fn put_field(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    let width = field_width(descriptor)?;
    let frame = env.thread.top_mut()?;
    frame.stack.pop_block(width)?;
    frame.stack.pop()?;
    Ok(())
}

/// `new` of an external class. `StringBuffer` allocates a live buffer;
/// other external objects are opaque and stay null, as in the original
/// runtime.
pub fn new_object(env: &mut JavaEnv, class: &str) -> Result<(), VmError> {
    let reference = match class {
        "java/lang/StringBuffer" => env.heap.alloc(HeapEntry::Buffer(String::new())),
        _ => slot::NULL,
    };

    env.thread.top_mut()?.stack.push(reference)
}

/// Method invocation against an external class.
pub fn invoke(
    env: &mut JavaEnv,
    class: &str,
    method: &str,
    descriptor: &str,
    has_receiver: bool,
) -> Result<(), VmError> {
    trace!("bridge call {}.{}{}", class, method, descriptor);

    match (class, method) {
        ("java/io/PrintStream", "println") => println(env, descriptor),
        ("java/lang/StringBuffer", "append") => append(env, descriptor),
        ("java/lang/StringBuffer", "toString") => buffer_to_string(env),
        // Pragmatic shim: the receiver stays on the stack and stands in
        // for its own class object.
        ("java/lang/Object", "getClass") => Ok(()),
        _ => generic(env, descriptor, has_receiver),
    }
}

/// `PrintStream.println`: write a newline followed by the value, formatted
/// by descriptor. The stream receiver below the value is discarded.
/// Overloads outside the recognized set consume their operands without
/// printing, as the original shims do.
fn println(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    let parsed = env.method_descriptor(descriptor)?;

    let recognized = match parsed.args.as_slice() {
        [] => true,
        [FieldDescriptor::Object(name)] => name == "java/lang/String",
        [arg] => !arg.is_reference(),
        _ => false,
    };

    if !recognized {
        return generic(env, descriptor, true);
    }

    let text = format_by_descriptor(env, descriptor)?;

    // Receiver (the PrintStream handle)
    env.thread.top_mut()?.stack.pop()?;

    write!(env.console, "\n{}", text).ok();
    Ok(())
}

/// `StringBuffer.append`: pop the argument, pop the buffer, concatenate,
/// push the buffer back.
fn append(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    let text = format_by_descriptor(env, descriptor)?;

    let buffer = env.thread.top_mut()?.stack.pop()?;
    env.heap.buffer_mut(buffer)?.push_str(&text);
    env.thread.top_mut()?.stack.push(buffer)
}

/// `StringBuffer.toString`: a fresh string handle with the buffer's
/// current contents.
fn buffer_to_string(env: &mut JavaEnv) -> Result<(), VmError> {
    let buffer = env.thread.top_mut()?.stack.pop()?;
    let contents = env.heap.text(buffer)?.to_string();
    let handle = env.heap.alloc(HeapEntry::Text(contents));
    env.thread.top_mut()?.stack.push(handle)
}

/// Pop one argument per the descriptor's single parameter and render it
/// the way the console shims print: floats with two decimals, booleans as
/// words, chars as themselves.
fn format_by_descriptor(env: &mut JavaEnv, descriptor: &str) -> Result<String, VmError> {
    let parsed = env.method_descriptor(descriptor)?;

    let arg = match parsed.args.first() {
        Some(v) => v.clone(),
        None => return Ok(String::new()),
    };

    let frame = env.thread.top_mut()?;
    Ok(match arg {
        FieldDescriptor::Int | FieldDescriptor::Short | FieldDescriptor::Byte => {
            format!("{}", frame.pop_int()?)
        }
        FieldDescriptor::Char => {
            let value = frame.pop_int()? as u16;
            match char::from_u32(value as u32) {
                Some(c) => c.to_string(),
                None => String::from(char::REPLACEMENT_CHARACTER),
            }
        }
        FieldDescriptor::Boolean => {
            if frame.pop_int()? == 0 {
                "false".to_string()
            } else {
                "true".to_string()
            }
        }
        FieldDescriptor::Float => format!("{:.2}", frame.pop_float()?),
        FieldDescriptor::Double => format!("{:.2}", frame.pop_double()?),
        FieldDescriptor::Long => format!("{}", frame.pop_long()?),
        FieldDescriptor::Object(_) | FieldDescriptor::Array(_) => {
            let reference = frame.stack.pop()?;
            if reference == slot::NULL {
                "null".to_string()
            } else {
                env.heap.text(reference)?.to_string()
            }
        }
    })
}

/// Unrecognized external call: consume arguments and receiver, produce a
/// default of the return type.
fn generic(env: &mut JavaEnv, descriptor: &str, has_receiver: bool) -> Result<(), VmError> {
    let parsed = env.method_descriptor(descriptor)?;

    let frame = env.thread.top_mut()?;
    frame.stack.pop_block(parsed.arg_slots())?;
    if has_receiver {
        frame.stack.pop()?;
    }

    match parsed.return_slots() {
        0 => Ok(()),
        1 => frame.stack.push(0),
        _ => {
            frame.stack.push(0)?;
            frame.stack.push(0)
        }
    }
}

fn push_default(env: &mut JavaEnv, descriptor: &str) -> Result<(), VmError> {
    let width = field_width(descriptor)?;
    let frame = env.thread.top_mut()?;
    for _ in 0..width {
        frame.stack.push(0)?;
    }
    Ok(())
}

fn field_width(descriptor: &str) -> Result<usize, VmError> {
    let parsed = FieldDescriptor::parse(descriptor).map_err(crate::error::bad_constant)?;
    Ok(parsed.word_len())
}
