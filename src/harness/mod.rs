//! The inferior-assert harness
//!
//! Builds the asserting helper, runs scenarios against it under the
//! debugger, and reports pass, fail or skip per scenario.

pub mod arch;
pub mod expect;
pub mod helper;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod scenarios;
pub mod suite;

pub use helper::HelperProgram;
pub use runner::{run_suite, Outcome, RunOptions, RunReport, ScenarioReport};
pub use scenario::{Scenario, ScenarioContext, ScenarioInfo};
pub use suite::{BuildVariant, KnownDefect, Suite, SuiteEntry};
