use std::io;

use thiserror::Error;

/// Everything that can abort the virtual machine. There is no recovery
/// path: errors propagate to the driver, which prints the banner and exits
/// nonzero. The runtime kinds mirror the errors a real JVM would throw
/// synthetically; without exception-handler dispatch they are all fatal
/// here.
#[derive(Debug, Error)]
pub enum VmError {
    // Linkage
    #[error("ClassFormatError: {file}: {detail}")]
    ClassFormat { file: String, detail: String },
    #[error("UnsupportedClassVersionError: {file} is version {major}.{minor}")]
    UnsupportedVersion { file: String, major: u16, minor: u16 },
    #[error("ClassCircularityError: {0}")]
    Circularity(String),
    #[error("NoClassDefFoundError: {0}")]
    NoClassDef(String),

    // Runtime signals
    #[error("NullPointerException")]
    NullPointer,
    #[error("ArrayIndexOutOfBoundsException: index {index}, length {length}")]
    IndexOutOfBounds { index: i32, length: i32 },
    #[error("NegativeArraySizeException: {0}")]
    NegativeArraySize(i32),
    #[error("AbstractMethodError: {0}")]
    AbstractMethod(String),
    #[error("IncompatibleClassChangeError: {0}")]
    IncompatibleClassChange(String),
    #[error("IllegalAccessError: {0}")]
    IllegalAccess(String),
    #[error("ArithmeticException: division by zero")]
    DivisionByZero,

    // Interpreter invariants
    #[error("unrecognized opcode 0x{opcode:02x}")]
    UnknownOpcode { opcode: u8 },
    #[error("opcode {0} is not supported by this virtual machine")]
    UnsupportedOpcode(&'static str),
    #[error("NoSuchMethodError: {class}.{name}{descriptor}")]
    NoSuchMethod { class: String, name: String, descriptor: String },
    #[error("NoSuchFieldError: {class}.{name}")]
    NoSuchField { class: String, name: String },
    #[error("method {class}.{name}{descriptor} has no Code attribute")]
    MissingCode { class: String, name: String, descriptor: String },
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("operand stack overflow")]
    StackOverflow,
    #[error("local variable index {0} out of range")]
    BadLocalIndex(u16),
    #[error("invalid constant pool reference: {0}")]
    BadConstant(String),
    #[error("execution left the method body (pc {0})")]
    PcOutOfRange(i64),
    #[error("no active frame")]
    NoFrame,
    #[error("invalid heap reference {0}")]
    BadReference(u32),
}

impl VmError {
    /// Short name used in the abort banner.
    pub fn kind(&self) -> &'static str {
        match self {
            VmError::ClassFormat { .. } => "ClassFormatError",
            VmError::UnsupportedVersion { .. } => "UnsupportedClassVersionError",
            VmError::Circularity(_) => "ClassCircularityError",
            VmError::NoClassDef(_) => "NoClassDefFoundError",
            VmError::NullPointer => "NullPointerException",
            VmError::IndexOutOfBounds { .. } => "ArrayIndexOutOfBoundsException",
            VmError::NegativeArraySize(_) => "NegativeArraySizeException",
            VmError::AbstractMethod(_) => "AbstractMethodError",
            VmError::IncompatibleClassChange(_) => "IncompatibleClassChangeError",
            VmError::IllegalAccess(_) => "IllegalAccessError",
            VmError::DivisionByZero => "ArithmeticException",
            VmError::UnknownOpcode { .. } => "UnknownOpcode",
            VmError::UnsupportedOpcode(_) => "UnsupportedOpcode",
            VmError::NoSuchMethod { .. } => "NoSuchMethodError",
            VmError::NoSuchField { .. } => "NoSuchFieldError",
            VmError::MissingCode { .. } => "MissingCode",
            VmError::StackUnderflow => "StackUnderflow",
            VmError::StackOverflow => "StackOverflow",
            VmError::BadLocalIndex(_) => "BadLocalIndex",
            VmError::BadConstant(_) => "BadConstant",
            VmError::PcOutOfRange(_) => "PcOutOfRange",
            VmError::NoFrame => "NoFrame",
            VmError::BadReference(_) => "BadReference",
        }
    }
}

/// Constant pool lookups surface as `io::Error` in `class_format`; in the
/// interpreter they become linkage-level faults.
pub fn bad_constant(error: io::Error) -> VmError {
    VmError::BadConstant(error.to_string())
}
