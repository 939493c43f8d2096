//! Parsing, assembly and inspection of Java class files through major
//! version 48, the format consumed by the interpreter in the `jvm` crate.
//! Structures follow the class file grammar directly; attribute bodies are
//! kept as raw bytes and decoded on demand by the typed parsers in
//! [`attribute`].

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

pub mod attribute;
pub mod class_file;
pub mod constant;
pub mod descriptor;
pub mod display;
pub mod opcode;
pub mod read;
pub mod version;

pub use attribute::{AttributeInfo, CodeAttribute, ConstantValue, ExceptionRange, Exceptions};
pub use class_file::{AccessFlags, ClassFile, FieldInfo, MethodInfo};
pub use constant::{Constant, ConstantPool};
pub use descriptor::{FieldDescriptor, MethodDescriptor};
pub use opcode::Opcode;
pub use read::BufferedRead;
pub use version::ClassVersion;
