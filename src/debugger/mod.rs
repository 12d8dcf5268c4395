//! Typed view of the debugger under test
//!
//! Mirrors the debugger's own object model: a [`Debugger`] session creates
//! [`Target`]s, a target launches a [`Process`], and a stopped process hands
//! out [`Thread`] and [`Frame`] views that stay valid until the next resume.

mod handles;
mod process;
mod session;
mod stop;
mod target;

pub use handles::{parse_address, Frame, StopGeneration, Thread};
pub use process::Process;
pub use session::Debugger;
pub use stop::{ProcessState, StopReason};
pub use target::{LaunchOptions, Target};
