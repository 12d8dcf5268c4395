//! inferior-assert - checks a debugger against an asserting inferior
//!
//! Drives an external debugger through the Debug Adapter Protocol (DAP),
//! launches a helper program that fails an assertion, and checks what the
//! debugger reports about the stop.

pub mod cli;
pub mod commands;
pub mod common;
pub mod dap;
pub mod debugger;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use debugger::{Debugger, Process, ProcessState, StopReason};
