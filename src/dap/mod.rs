//! Debug Adapter Protocol (DAP) client
//!
//! The harness reaches the debugger under test (lldb-dap by default) through
//! this module only.

pub mod client;
pub mod codec;
pub mod types;

pub use client::DapClient;
pub use types::*;
