//! The bytecode interpreter: a typed value stack, a call-frame stack,
//! per-VM symbol interning, globals, and dispatch over compiled
//! chunks.

pub mod arith;
pub mod compare;
pub mod error;
pub mod fmt;
pub mod frame;
pub mod host;
pub mod intrinsics;
pub mod vm;

pub use error::RuntimeError;
pub use host::{Host, HostValue, StdHost};
pub use vm::{ScriptId, Vm};
