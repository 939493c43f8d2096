//! The fetch-decode-execute loop. One logical thread, one dispatch per
//! instruction, no suspension points; the machine ends when the frame
//! stack empties or an error aborts it.

use std::io::{BufRead, Write};

use class_format::Opcode;

use crate::env::{launch, DebugFlags, JavaEnv};
use crate::error::VmError;
use crate::instruction::{array, class, cmp, convert, general, locals, math, push_const, stack};

/// Convenience wrapper: set up the entry point and run to completion.
pub fn run(env: &mut JavaEnv, main_class: &str, args: &[String]) -> Result<(), VmError> {
    launch(env, main_class, args)?;
    execute(env)
}

/// Drive the current frame stack until it empties. The pc advances before
/// every fetch, so frame pushes leave it parked one byte short of the
/// entry point.
pub fn execute(env: &mut JavaEnv) -> Result<(), VmError> {
    while !env.thread.frames.is_empty() {
        env.thread.pc += 1;
        let opcode = env.thread.fetch()?;

        if env.flags.contains(DebugFlags::STEP) {
            print_frame_info(env, opcode)?;
            wait_for_enter(env);
        }

        step(env, opcode)?;
    }

    Ok(())
}

/// Decode and dispatch a single opcode byte.
pub fn step(env: &mut JavaEnv, byte: u8) -> Result<(), VmError> {
    let opcode = Opcode::from_byte(byte).ok_or(VmError::UnknownOpcode { opcode: byte })?;
    trace!("pc {:>5}: {}", env.thread.pc, opcode.mnemonic());

    match opcode {
        Opcode::Nop => general::nop(env),

        // Constants and immediates
        Opcode::AconstNull => push_const::aconst_null(env),
        Opcode::IconstM1 => push_const::iconst(env, -1),
        Opcode::Iconst0 => push_const::iconst(env, 0),
        Opcode::Iconst1 => push_const::iconst(env, 1),
        Opcode::Iconst2 => push_const::iconst(env, 2),
        Opcode::Iconst3 => push_const::iconst(env, 3),
        Opcode::Iconst4 => push_const::iconst(env, 4),
        Opcode::Iconst5 => push_const::iconst(env, 5),
        Opcode::Lconst0 => push_const::lconst(env, 0),
        Opcode::Lconst1 => push_const::lconst(env, 1),
        Opcode::Fconst0 => push_const::fconst(env, 0.0),
        Opcode::Fconst1 => push_const::fconst(env, 1.0),
        Opcode::Fconst2 => push_const::fconst(env, 2.0),
        Opcode::Dconst0 => push_const::dconst(env, 0.0),
        Opcode::Dconst1 => push_const::dconst(env, 1.0),
        Opcode::Bipush => push_const::bipush(env),
        Opcode::Sipush => push_const::sipush(env),
        Opcode::Ldc => push_const::ldc(env),
        Opcode::LdcW => push_const::ldc_w(env),
        Opcode::Ldc2W => push_const::ldc2_w(env),

        // Loads and stores
        Opcode::Iload | Opcode::Fload | Opcode::Aload => locals::iload(env),
        Opcode::Lload | Opcode::Dload => locals::lload(env),
        Opcode::Iload0 | Opcode::Fload0 | Opcode::Aload0 => locals::load_word(env, 0),
        Opcode::Iload1 | Opcode::Fload1 | Opcode::Aload1 => locals::load_word(env, 1),
        Opcode::Iload2 | Opcode::Fload2 | Opcode::Aload2 => locals::load_word(env, 2),
        Opcode::Iload3 | Opcode::Fload3 | Opcode::Aload3 => locals::load_word(env, 3),
        Opcode::Lload0 | Opcode::Dload0 => locals::load_pair(env, 0),
        Opcode::Lload1 | Opcode::Dload1 => locals::load_pair(env, 1),
        Opcode::Lload2 | Opcode::Dload2 => locals::load_pair(env, 2),
        Opcode::Lload3 | Opcode::Dload3 => locals::load_pair(env, 3),
        Opcode::Istore | Opcode::Fstore | Opcode::Astore => locals::istore(env),
        Opcode::Lstore | Opcode::Dstore => locals::lstore(env),
        Opcode::Istore0 | Opcode::Fstore0 | Opcode::Astore0 => locals::store_word(env, 0),
        Opcode::Istore1 | Opcode::Fstore1 | Opcode::Astore1 => locals::store_word(env, 1),
        Opcode::Istore2 | Opcode::Fstore2 | Opcode::Astore2 => locals::store_word(env, 2),
        Opcode::Istore3 | Opcode::Fstore3 | Opcode::Astore3 => locals::store_word(env, 3),
        Opcode::Lstore0 | Opcode::Dstore0 => locals::store_pair(env, 0),
        Opcode::Lstore1 | Opcode::Dstore1 => locals::store_pair(env, 1),
        Opcode::Lstore2 | Opcode::Dstore2 => locals::store_pair(env, 2),
        Opcode::Lstore3 | Opcode::Dstore3 => locals::store_pair(env, 3),
        Opcode::Iinc => locals::iinc(env),
        Opcode::Wide => locals::wide(env),

        // Array element access
        Opcode::Iaload | Opcode::Faload | Opcode::Aaload | Opcode::Baload | Opcode::Caload
        | Opcode::Saload => array::load_word(env),
        Opcode::Laload | Opcode::Daload => array::load_pair(env),
        Opcode::Iastore | Opcode::Fastore | Opcode::Aastore | Opcode::Bastore
        | Opcode::Castore | Opcode::Sastore => array::store_word(env),
        Opcode::Lastore | Opcode::Dastore => array::store_pair(env),

        // Stack manipulation
        Opcode::Pop => stack::pop(env),
        Opcode::Pop2 => stack::pop2(env),
        Opcode::Dup => stack::dup(env),
        Opcode::DupX1 => stack::dup_x1(env),
        Opcode::DupX2 => stack::dup_x2(env),
        Opcode::Dup2 => stack::dup2(env),
        Opcode::Dup2X1 => stack::dup2_x1(env),
        Opcode::Dup2X2 => stack::dup2_x2(env),
        Opcode::Swap => stack::swap(env),

        // Arithmetic and bitwise
        Opcode::Iadd => math::iadd(env),
        Opcode::Ladd => math::ladd(env),
        Opcode::Fadd => math::fadd(env),
        Opcode::Dadd => math::dadd(env),
        Opcode::Isub => math::isub(env),
        Opcode::Lsub => math::lsub(env),
        Opcode::Fsub => math::fsub(env),
        Opcode::Dsub => math::dsub(env),
        Opcode::Imul => math::imul(env),
        Opcode::Lmul => math::lmul(env),
        Opcode::Fmul => math::fmul(env),
        Opcode::Dmul => math::dmul(env),
        Opcode::Idiv => math::idiv(env),
        Opcode::Ldiv => math::ldiv(env),
        Opcode::Fdiv => math::fdiv(env),
        Opcode::Ddiv => math::ddiv(env),
        Opcode::Irem => math::irem(env),
        Opcode::Lrem => math::lrem(env),
        Opcode::Frem => math::frem(env),
        Opcode::Drem => math::drem(env),
        Opcode::Ineg => math::ineg(env),
        Opcode::Lneg => math::lneg(env),
        Opcode::Fneg => math::fneg(env),
        Opcode::Dneg => math::dneg(env),
        Opcode::Ishl => math::ishl(env),
        Opcode::Lshl => math::lshl(env),
        Opcode::Ishr => math::ishr(env),
        Opcode::Lshr => math::lshr(env),
        Opcode::Iushr => math::iushr(env),
        Opcode::Lushr => math::lushr(env),
        Opcode::Iand => math::iand(env),
        Opcode::Land => math::land(env),
        Opcode::Ior => math::ior(env),
        Opcode::Lor => math::lor(env),
        Opcode::Ixor => math::ixor(env),
        Opcode::Lxor => math::lxor(env),

        // Conversions
        Opcode::I2l => convert::i2l(env),
        Opcode::I2f => convert::i2f(env),
        Opcode::I2d => convert::i2d(env),
        Opcode::L2i => convert::l2i(env),
        Opcode::L2f => convert::l2f(env),
        Opcode::L2d => convert::l2d(env),
        Opcode::F2i => convert::f2i(env),
        Opcode::F2l => convert::f2l(env),
        Opcode::F2d => convert::f2d(env),
        Opcode::D2i => convert::d2i(env),
        Opcode::D2l => convert::d2l(env),
        Opcode::D2f => convert::d2f(env),
        Opcode::I2b => convert::i2b(env),
        Opcode::I2c => convert::i2c(env),
        Opcode::I2s => convert::i2s(env),

        // Comparisons and branches
        Opcode::Lcmp => cmp::lcmp(env),
        Opcode::Fcmpl => cmp::fcmp(env, -1),
        Opcode::Fcmpg => cmp::fcmp(env, 1),
        Opcode::Dcmpl => cmp::dcmp(env, -1),
        Opcode::Dcmpg => cmp::dcmp(env, 1),
        Opcode::Ifeq => cmp::if_zero(env, |v| v == 0),
        Opcode::Ifne => cmp::if_zero(env, |v| v != 0),
        Opcode::Iflt => cmp::if_zero(env, |v| v < 0),
        Opcode::Ifge => cmp::if_zero(env, |v| v >= 0),
        Opcode::Ifgt => cmp::if_zero(env, |v| v > 0),
        Opcode::Ifle => cmp::if_zero(env, |v| v <= 0),
        Opcode::IfIcmpeq => cmp::if_icmp(env, |a, b| a == b),
        Opcode::IfIcmpne => cmp::if_icmp(env, |a, b| a != b),
        Opcode::IfIcmplt => cmp::if_icmp(env, |a, b| a < b),
        Opcode::IfIcmpge => cmp::if_icmp(env, |a, b| a >= b),
        Opcode::IfIcmpgt => cmp::if_icmp(env, |a, b| a > b),
        Opcode::IfIcmple => cmp::if_icmp(env, |a, b| a <= b),
        Opcode::IfAcmpeq => cmp::if_acmp(env, true),
        Opcode::IfAcmpne => cmp::if_acmp(env, false),
        Opcode::Goto => cmp::goto(env),
        Opcode::GotoW => cmp::goto_w(env),
        Opcode::Jsr => cmp::jsr(env),
        Opcode::JsrW => cmp::jsr_w(env),
        Opcode::Ret => cmp::ret(env),
        Opcode::Tableswitch => cmp::tableswitch(env),
        Opcode::Lookupswitch => cmp::lookupswitch(env),
        Opcode::Ifnull => cmp::if_null(env, true),
        Opcode::Ifnonnull => cmp::if_null(env, false),

        // Field access and method invocation
        Opcode::Getstatic => class::getstatic(env),
        Opcode::Putstatic => class::putstatic(env),
        Opcode::Getfield => class::getfield(env),
        Opcode::Putfield => class::putfield(env),
        Opcode::Invokevirtual => class::invokevirtual(env),
        Opcode::Invokespecial => class::invokespecial(env),
        Opcode::Invokestatic => class::invokestatic(env),
        Opcode::Invokeinterface => class::invokeinterface(env),

        // Object and array creation
        Opcode::New => class::new(env),
        Opcode::Newarray => array::newarray(env),
        Opcode::Anewarray => array::anewarray(env),
        Opcode::Multianewarray => array::multianewarray(env),
        Opcode::Arraylength => array::arraylength(env),

        // Type tests and monitors
        Opcode::Checkcast => class::checkcast(env),
        Opcode::Instanceof => class::instanceof(env),
        Opcode::Monitorenter | Opcode::Monitorexit => class::monitor(env),
        Opcode::Athrow => class::athrow(env),

        // Returns
        Opcode::Ireturn | Opcode::Freturn | Opcode::Areturn => general::return_word(env),
        Opcode::Lreturn | Opcode::Dreturn => general::return_pair(env),
        Opcode::Return => general::return_void(env),
    }
}

/// Step-mode frame dump: class, method, mnemonic, operand stack top-down,
/// then the locals array.
fn print_frame_info(env: &mut JavaEnv, opcode: u8) -> Result<(), VmError> {
    let (class, method) = env.current_location();
    let mnemonic = Opcode::from_byte(opcode)
        .map(Opcode::mnemonic)
        .unwrap_or("<unknown>");

    let (stack_slots, local_slots) = {
        let frame = env.thread.top()?;
        (frame.stack.slots().to_vec(), frame.locals.clone())
    };

    let out = &mut env.console;
    writeln!(out, "\n------------------------------------").ok();
    writeln!(out, "Class: {}", class).ok();
    writeln!(out, "Method: {}", method).ok();
    writeln!(out, "Opcode: {}", mnemonic).ok();
    writeln!(out, "Operand stack:").ok();
    for slot in stack_slots.iter().rev() {
        writeln!(out, "| 0x{:x}", slot).ok();
    }
    writeln!(out, "Locals:").ok();
    for slot in &local_slots {
        write!(out, " 0x{:x} |", slot).ok();
    }
    writeln!(out, "\n------------------------------------").ok();

    Ok(())
}

fn wait_for_enter(env: &mut JavaEnv) {
    write!(env.console, ">Press Enter to continue...").ok();
    env.console.flush().ok();

    let stdin = std::io::stdin();
    let mut line = String::new();
    let _ = stdin.lock().read_line(&mut line);
}
