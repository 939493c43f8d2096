//! Arithmetic and bitwise instructions. Integer math is two's complement
//! with wraparound; shift distances take only their low five (or six, for
//! `long`) bits; float remainder keeps the `fmod` semantics of `%`.

use crate::env::JavaEnv;
use crate::error::VmError;

/// Binary and unary arithmetic over the four numeric computational types.
/// Operands pop in reverse push order, so `$b` names the top of stack.
macro_rules! math_instruction {
    ($name:ident, int($a:ident, $b:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $b = frame.pop_int()?;
            let $a = frame.pop_int()?;
            frame.push_int($result)
        }
    };
    ($name:ident, int($a:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $a = frame.pop_int()?;
            frame.push_int($result)
        }
    };
    ($name:ident, long($a:ident, $b:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $b = frame.pop_long()?;
            let $a = frame.pop_long()?;
            frame.push_long($result)
        }
    };
    ($name:ident, long($a:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $a = frame.pop_long()?;
            frame.push_long($result)
        }
    };
    ($name:ident, float($a:ident, $b:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $b = frame.pop_float()?;
            let $a = frame.pop_float()?;
            frame.push_float($result)
        }
    };
    ($name:ident, float($a:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $a = frame.pop_float()?;
            frame.push_float($result)
        }
    };
    ($name:ident, double($a:ident, $b:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $b = frame.pop_double()?;
            let $a = frame.pop_double()?;
            frame.push_double($result)
        }
    };
    ($name:ident, double($a:ident) => $result:expr) => {
        pub fn $name(env: &mut JavaEnv) -> Result<(), VmError> {
            let frame = env.thread.top_mut()?;
            let $a = frame.pop_double()?;
            frame.push_double($result)
        }
    };
}

math_instruction! {iadd, int(a, b) => a.wrapping_add(b)}
math_instruction! {isub, int(a, b) => a.wrapping_sub(b)}
math_instruction! {imul, int(a, b) => a.wrapping_mul(b)}
math_instruction! {ineg, int(a) => a.wrapping_neg()}
math_instruction! {iand, int(a, b) => a & b}
math_instruction! {ior, int(a, b) => a | b}
math_instruction! {ixor, int(a, b) => a ^ b}
math_instruction! {ishl, int(a, b) => a.wrapping_shl(b as u32 & 0x1F)}
math_instruction! {ishr, int(a, b) => a.wrapping_shr(b as u32 & 0x1F)}
math_instruction! {iushr, int(a, b) => ((a as u32) >> (b as u32 & 0x1F)) as i32}

math_instruction! {ladd, long(a, b) => a.wrapping_add(b)}
math_instruction! {lsub, long(a, b) => a.wrapping_sub(b)}
math_instruction! {lmul, long(a, b) => a.wrapping_mul(b)}
math_instruction! {lneg, long(a) => a.wrapping_neg()}
math_instruction! {land, long(a, b) => a & b}
math_instruction! {lor, long(a, b) => a | b}
math_instruction! {lxor, long(a, b) => a ^ b}

math_instruction! {fadd, float(a, b) => a + b}
math_instruction! {fsub, float(a, b) => a - b}
math_instruction! {fmul, float(a, b) => a * b}
math_instruction! {fdiv, float(a, b) => a / b}
math_instruction! {frem, float(a, b) => a % b}
math_instruction! {fneg, float(a) => -a}

math_instruction! {dadd, double(a, b) => a + b}
math_instruction! {dsub, double(a, b) => a - b}
math_instruction! {dmul, double(a, b) => a * b}
math_instruction! {ddiv, double(a, b) => a / b}
math_instruction! {drem, double(a, b) => a % b}
math_instruction! {dneg, double(a) => -a}

// Division and remainder are the only arithmetic that can fault; a zero
// divisor is detected and aborts the machine. MIN / -1 wraps.

pub fn idiv(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let divisor = frame.pop_int()?;
    let value = frame.pop_int()?;

    if divisor == 0 {
        error!("integer division by zero");
        return Err(VmError::DivisionByZero);
    }

    frame.push_int(value.wrapping_div(divisor))
}

pub fn irem(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let divisor = frame.pop_int()?;
    let value = frame.pop_int()?;

    if divisor == 0 {
        error!("integer remainder by zero");
        return Err(VmError::DivisionByZero);
    }

    frame.push_int(value.wrapping_rem(divisor))
}

pub fn ldiv(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let divisor = frame.pop_long()?;
    let value = frame.pop_long()?;

    if divisor == 0 {
        error!("long division by zero");
        return Err(VmError::DivisionByZero);
    }

    frame.push_long(value.wrapping_div(divisor))
}

pub fn lrem(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let divisor = frame.pop_long()?;
    let value = frame.pop_long()?;

    if divisor == 0 {
        error!("long remainder by zero");
        return Err(VmError::DivisionByZero);
    }

    frame.push_long(value.wrapping_rem(divisor))
}

// Long shifts take an int distance on top of a category-2 value: one slot
// plus a pair, not three independent words.

pub fn lshl(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let distance = frame.pop_int()?;
    let value = frame.pop_long()?;
    frame.push_long(value.wrapping_shl(distance as u32 & 0x3F))
}

pub fn lshr(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let distance = frame.pop_int()?;
    let value = frame.pop_long()?;
    frame.push_long(value.wrapping_shr(distance as u32 & 0x3F))
}

pub fn lushr(env: &mut JavaEnv) -> Result<(), VmError> {
    let frame = env.thread.top_mut()?;
    let distance = frame.pop_int()?;
    let value = frame.pop_long()?;
    frame.push_long(((value as u64) >> (distance as u32 & 0x3F)) as i64)
}
