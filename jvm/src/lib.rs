//! A stack-based interpreter for classic (major version <= 48) Java class
//! files: lazy class loading into a method area, an index-addressed heap,
//! per-thread frame stacks of 32-bit slots, a fetch-decode-execute loop
//! over the full opcode set, and a native bridge emulating the console
//! surfaces of the standard library.
//!
//! The machine is single threaded and cooperative; errors are never
//! recovered, they abort to the driver with a banner naming the current
//! class and method.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

pub mod env;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod instruction;
pub mod mem;
pub mod thread;

pub use env::{launch, ClassResolution, Console, DebugFlags, JavaEnv};
pub use error::VmError;
pub use exec::{execute, run};
