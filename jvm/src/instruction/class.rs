//! Field access, object creation, method invocation and the type-test
//! opcodes. These are the handlers that resolve symbolic references, so
//! they are also where class loading (and `<clinit>` staging) gets
//! triggered; resolution always happens before any operand is popped.

use class_format::{AccessFlags, Constant, MethodDescriptor};

use crate::env::{ClassResolution, JavaEnv};
use crate::error::{bad_constant, VmError};
use crate::hooks;
use crate::mem::fields::SlotValue;
use crate::mem::method_area::{parse_field_descriptor, ClassId};
use crate::mem::slot;

/// Fieldref resolution: `(class, name, descriptor)` as owned strings so
/// the pool borrow ends before the interpreter mutates anything.
fn field_ref(env: &JavaEnv, index: u16) -> Result<(String, String, String), VmError> {
    let pool = &env.thread.top()?.pool;
    let (class, name, descriptor) = pool.element_ref(index).map_err(bad_constant)?;
    Ok((class.to_string(), name.to_string(), descriptor.to_string()))
}

fn pop_field_value(env: &mut JavaEnv, descriptor: &str) -> Result<SlotValue, VmError> {
    let wide = parse_field_descriptor(descriptor)?.is_wide();
    let frame = env.thread.top_mut()?;

    Ok(if wide {
        let high = frame.stack.pop()?;
        let low = frame.stack.pop()?;
        SlotValue::Pair { high, low }
    } else {
        SlotValue::Word(frame.stack.pop()?)
    })
}

fn push_field_value(env: &mut JavaEnv, value: SlotValue) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    match value {
        SlotValue::Word(slot) => frame.stack.push(slot),
        SlotValue::Pair { high, low } => {
            frame.stack.push(low)?;
            frame.stack.push(high)
        }
    }
}

pub fn getstatic(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = field_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::get_static(env, &class, &name, &descriptor);
    }

    let id = match env.resolve_class(&class)? {
        ClassResolution::Ready(id) => id,
        ClassResolution::Staged => return Ok(()),
    };
    env.thread.pc += 2;

    let owner = resolve_static_owner(env, id, &name)?;
    if let Some(cell) = env.method_area.get(owner).statics.get(&name) {
        let value = cell.load();
        return push_field_value(env, value);
    }

    // Final statics carry their value in a ConstantValue attribute and are
    // materialized at first read rather than prepared up front.
    if let Some(value) = constant_value_of(env, owner, &name)? {
        return push_field_value(env, value);
    }

    Err(VmError::NoSuchField { class, name })
}

pub fn putstatic(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = field_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::put_static(env, &descriptor);
    }

    let id = match env.resolve_class(&class)? {
        ClassResolution::Ready(id) => id,
        ClassResolution::Staged => return Ok(()),
    };
    env.thread.pc += 2;

    let owner = resolve_static_owner(env, id, &name)?;
    let value = pop_field_value(env, &descriptor)?;

    let runtime = env.method_area.get_mut(owner);
    if let Some(cell) = runtime.statics.get_mut(&name) {
        cell.store(value);
        return Ok(());
    }

    // Runtime-computed finals have no prepared cell; their first write
    // from `<clinit>` creates it.
    if runtime.image.get_field(&name).map(|f| f.is_static()) == Some(true) {
        let parsed = parse_field_descriptor(&descriptor)?;
        runtime.statics.declare(&name, parsed);
        if let Some(cell) = runtime.statics.get_mut(&name) {
            cell.store(value);
        }
        return Ok(());
    }

    Err(VmError::NoSuchField { class, name })
}

/// Static fields are inherited: the declaring class closest to `id` in
/// the super chain owns the cell.
fn resolve_static_owner(env: &JavaEnv, id: ClassId, name: &str) -> Result<ClassId, VmError> {
    for candidate in env.method_area.super_chain(id) {
        let runtime = env.method_area.get(candidate);
        if runtime.statics.get(name).is_some() {
            return Ok(candidate);
        }
        if runtime.image.get_field(name).map(|f| f.is_static()) == Some(true) {
            return Ok(candidate);
        }
    }

    Ok(id)
}

fn constant_value_of(
    env: &mut JavaEnv,
    id: ClassId,
    name: &str,
) -> Result<Option<SlotValue>, VmError> {
    let constant = {
        let image = &env.method_area.get(id).image;
        let field = match image.get_field(name) {
            Some(field) if field.is_static() => field,
            _ => return Ok(None),
        };

        match field.constant_value(&image.constants).map_err(bad_constant)? {
            Some(index) => image.constants.try_get(index).map_err(bad_constant)?.clone(),
            None => return Ok(None),
        }
    };

    Ok(Some(match constant {
        Constant::Int(value) => SlotValue::Word(slot::from_int(value)),
        Constant::Float(value) => SlotValue::Word(slot::from_float(value)),
        Constant::Long(value) => {
            let (low, high) = slot::from_long(value);
            SlotValue::Pair { high, low }
        }
        Constant::Double(value) => {
            let (low, high) = slot::from_double(value);
            SlotValue::Pair { high, low }
        }
        Constant::String { string_index } => {
            let text = {
                let image = &env.method_area.get(id).image;
                image
                    .constants
                    .text(string_index)
                    .map_err(bad_constant)?
                    .to_string()
            };
            SlotValue::Word(env.intern_string(&text))
        }
        x => {
            return Err(VmError::BadConstant(format!(
                "ConstantValue points at {:?}",
                x
            )))
        }
    }))
}

pub fn getfield(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = field_ref(env, index)?;
    env.thread.pc += 2;

    if hooks::is_external(&class) {
        return hooks::get_field(env, &descriptor);
    }

    let reference = env.thread.top_mut()?.stack.pop()?;
    let instance = env.heap.instance(reference)?;

    let value = instance
        .fields
        .get(&name)
        .ok_or(VmError::NoSuchField { class, name })?
        .load();

    push_field_value(env, value)
}

pub fn putfield(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = field_ref(env, index)?;
    env.thread.pc += 2;

    if hooks::is_external(&class) {
        return hooks::put_field(env, &descriptor);
    }

    // The reference sits beneath the value.
    let value = pop_field_value(env, &descriptor)?;
    let reference = env.thread.top_mut()?.stack.pop()?;

    let instance = env.heap.instance_mut(reference)?;
    match instance.fields.get_mut(&name) {
        Some(cell) => {
            cell.store(value);
            Ok(())
        }
        None => Err(VmError::NoSuchField { class, name }),
    }
}

pub fn new(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let class = {
        let pool = &env.thread.top()?.pool;
        pool.class_name(index).map_err(bad_constant)?.to_string()
    };

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::new_object(env, &class);
    }

    let id = match env.resolve_class(&class)? {
        ClassResolution::Ready(id) => id,
        ClassResolution::Staged => return Ok(()),
    };
    env.thread.pc += 2;

    let reference = env.new_object(id)?;
    env.thread.top_mut()?.stack.push(reference)
}

/// Methodref resolution shared by the four invoke forms.
fn method_ref(env: &JavaEnv, index: u16) -> Result<(String, String, String), VmError> {
    field_ref(env, index)
}

/// Pop `descriptor`'s argument slots for a static call.
fn pop_invocation(env: &mut JavaEnv, descriptor: &MethodDescriptor) -> Result<Vec<u32>, VmError> {
    let frame = env.thread.top_mut()?;
    frame.stack.pop_block(descriptor.arg_slots())
}

/// Pop arguments plus the receiver beneath them; a null receiver faults
/// before any frame is built.
fn pop_instance_invocation(
    env: &mut JavaEnv,
    descriptor: &MethodDescriptor,
) -> Result<(u32, Vec<u32>), VmError> {
    let frame = env.thread.top_mut()?;
    let args = frame.stack.pop_block(descriptor.arg_slots())?;

    let receiver = frame.stack.pop()?;
    if receiver == slot::NULL {
        return Err(VmError::NullPointer);
    }

    Ok((receiver, args))
}

/// Copy receiver and arguments into the locals of the frame just pushed.
/// Category-2 arguments flip from stack order (high on top) to the locals
/// convention (high half at the lower index).
fn fill_locals(
    env: &mut JavaEnv,
    receiver: Option<u32>,
    args: &[u32],
    descriptor: &MethodDescriptor,
) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let mut local = 0u16;

    if let Some(reference) = receiver {
        frame.set_local(0, reference)?;
        local = 1;
    }

    let mut slot_index = 0;
    for arg in &descriptor.args {
        if arg.is_wide() {
            let low = args[slot_index];
            let high = args[slot_index + 1];
            frame.set_local(local, high)?;
            frame.set_local(local + 1, low)?;
            local += 2;
            slot_index += 2;
        } else {
            frame.set_local(local, args[slot_index])?;
            local += 1;
            slot_index += 1;
        }
    }

    Ok(())
}

/// Method lookup that walks the super chain from `from` and applies the
/// abstract check shared by every invoke form.
fn find_concrete(
    env: &JavaEnv,
    from: ClassId,
    class: &str,
    name: &str,
    descriptor: &str,
) -> Result<ClassId, VmError> {
    let described = format!("{}.{}{}", class, name, descriptor);

    let (target, method) = env
        .method_area
        .find_method(from, name, descriptor)
        .ok_or_else(|| VmError::AbstractMethod(described.clone()))?;

    if method.is_abstract() {
        return Err(VmError::AbstractMethod(described));
    }

    Ok(target)
}

/// The class of an instance receiver. Interned strings and arrays have no
/// runtime class record; methods on them only arrive here for non-external
/// owners, which is a linkage inconsistency.
fn receiver_class(env: &JavaEnv, reference: u32) -> Result<ClassId, VmError> {
    Ok(env.heap.instance(reference)?.class)
}

pub fn invokevirtual(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = method_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::invoke(env, &class, &name, &descriptor, true);
    }

    if let ClassResolution::Staged = env.resolve_class(&class)? {
        return Ok(());
    }

    let parsed = env.method_descriptor(&descriptor)?;
    let (receiver, args) = pop_instance_invocation(env, &parsed)?;

    let dynamic_class = receiver_class(env, receiver)?;
    let target = find_concrete(env, dynamic_class, &class, &name, &descriptor)?;

    env.thread.pc += 2;
    env.push_frame(target, &name, &descriptor)?;
    fill_locals(env, Some(receiver), &args, &parsed)
}

pub fn invokespecial(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = method_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::invoke(env, &class, &name, &descriptor, true);
    }

    let declared = match env.resolve_class(&class)? {
        ClassResolution::Ready(id) => id,
        ClassResolution::Staged => return Ok(()),
    };

    let described = format!("{}.{}{}", class, name, descriptor);

    // ACC_SUPER gating: calls to a superclass method (other than a
    // constructor) from a class compiled with ACC_SUPER walk the chain;
    // everything else binds to the declared class directly.
    let current_class = env.thread.top()?.class;
    let current_flags = env.method_area.get(current_class).image.access_flags;
    let use_walk = current_flags.contains(AccessFlags::SUPER)
        && env.method_area.is_super_of(declared, current_class)
        && name != "<init>";

    let target = if use_walk {
        find_concrete(env, declared, &class, &name, &descriptor)?
    } else {
        let method = env
            .method_area
            .get(declared)
            .image
            .get_method(&name, &descriptor)
            .ok_or_else(|| VmError::NoSuchMethod {
                class: class.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
            })?;

        if method.is_static() {
            return Err(VmError::IncompatibleClassChange(described));
        }
        if method.is_abstract() {
            return Err(VmError::AbstractMethod(described));
        }
        declared
    };

    if let Some(method) = env.method_area.get(target).image.get_method(&name, &descriptor) {
        if method.is_static() {
            return Err(VmError::IncompatibleClassChange(described));
        }
    }

    let parsed = env.method_descriptor(&descriptor)?;
    let (receiver, args) = pop_instance_invocation(env, &parsed)?;

    env.thread.pc += 2;
    env.push_frame(target, &name, &descriptor)?;
    fill_locals(env, Some(receiver), &args, &parsed)
}

pub fn invokestatic(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let (class, name, descriptor) = method_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 2;
        return hooks::invoke(env, &class, &name, &descriptor, false);
    }

    let id = match env.resolve_class(&class)? {
        ClassResolution::Ready(id) => id,
        ClassResolution::Staged => return Ok(()),
    };

    let method = env
        .method_area
        .get(id)
        .image
        .get_method(&name, &descriptor)
        .ok_or_else(|| VmError::NoSuchMethod {
            class: class.clone(),
            name: name.clone(),
            descriptor: descriptor.clone(),
        })?;

    if !method.is_static() {
        return Err(VmError::IncompatibleClassChange(format!(
            "{}.{}{} is not static",
            class, name, descriptor
        )));
    }

    let parsed = env.method_descriptor(&descriptor)?;
    let args = pop_invocation(env, &parsed)?;

    env.thread.pc += 2;
    env.push_frame(id, &name, &descriptor)?;
    fill_locals(env, None, &args, &parsed)
}

pub fn invokeinterface(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    // Historical count and zero bytes; consumed, never used.
    let _count = env.thread.operand_u8(3)?;
    let _zero = env.thread.operand_u8(4)?;

    let (class, name, descriptor) = method_ref(env, index)?;

    if hooks::is_external(&class) {
        env.thread.pc += 4;
        return hooks::invoke(env, &class, &name, &descriptor, true);
    }

    if let ClassResolution::Staged = env.resolve_class(&class)? {
        return Ok(());
    }

    let parsed = env.method_descriptor(&descriptor)?;
    let (receiver, args) = pop_instance_invocation(env, &parsed)?;

    let dynamic_class = receiver_class(env, receiver)?;
    let target = find_concrete(env, dynamic_class, &class, &name, &descriptor)?;

    let described = format!("{}.{}{}", class, name, descriptor);
    let method = env
        .method_area
        .get(target)
        .image
        .get_method(&name, &descriptor)
        .ok_or_else(|| VmError::AbstractMethod(described.clone()))?;
    if !method.access.contains(AccessFlags::PUBLIC) {
        return Err(VmError::IllegalAccess(described));
    }

    env.thread.pc += 4;
    env.push_frame(target, &name, &descriptor)?;
    fill_locals(env, Some(receiver), &args, &parsed)
}

/// `checkcast` keeps the reference; with no verifier and no exception
/// dispatch there is nothing useful a failed check could do.
pub fn checkcast(env: &mut JavaEnv) -> Result<(), VmError> {
    env.thread.pc += 2;
    Ok(())
}

pub fn instanceof(env: &mut JavaEnv) -> Result<(), VmError> {
    let index = env.thread.operand_u16(1)?;
    let target = {
        let pool = &env.thread.top()?.pool;
        pool.class_name(index).map_err(bad_constant)?.to_string()
    };
    env.thread.pc += 2;

    let reference = env.thread.top_mut()?.stack.pop()?;
    if reference == slot::NULL {
        return env.thread.top_mut()?.push_int(0);
    }

    let result = match env.heap.instance(reference) {
        Ok(instance) => is_instance_of(env, instance.class, &target),
        // Strings, buffers and arrays only satisfy the root type.
        Err(_) => target == "java/lang/Object",
    };

    env.thread.top_mut()?.push_int(result as i32)
}

fn is_instance_of(env: &JavaEnv, class: ClassId, target: &str) -> bool {
    if target == "java/lang/Object" {
        return true;
    }

    for id in env.method_area.super_chain(class) {
        let runtime = env.method_area.get(id);
        if runtime.name == target {
            return true;
        }

        if let Ok(interfaces) = runtime.image.interface_names() {
            if interfaces.iter().any(|&name| name == target) {
                return true;
            }
        }
    }

    false
}

/// `monitorenter`/`monitorexit`: single-threaded machine, no monitors.
/// The reference is popped and checked for null, nothing more.
pub fn monitor(env: &mut JavaEnv) -> Result<(), VmError> {
    let reference = env.thread.top_mut()?.stack.pop()?;
    if reference == slot::NULL {
        return Err(VmError::NullPointer);
    }
    Ok(())
}

/// `athrow` has no handler table to consult; it ends the run.
pub fn athrow(env: &mut JavaEnv) -> Result<(), VmError> {
    let _ = env.thread.top_mut()?.stack.pop();
    Err(VmError::UnsupportedOpcode("athrow"))
}
