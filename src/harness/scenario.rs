//! The scenario trait and the checks scenarios share

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::debugger::{Debugger, Process, ProcessState, Thread};

use super::expect::{expect_command, ABORT_STOP_REASON};
use super::helper::HelperProgram;

/// Information about a scenario
#[derive(Debug, Clone)]
pub struct ScenarioInfo {
    /// Unique identifier used by suites and `--scenario`
    pub id: &'static str,
    /// Brief description
    pub description: &'static str,
}

/// What a scenario gets to work with
pub struct ScenarioContext<'a> {
    pub debugger: &'a Debugger,
    pub helper: &'a HelperProgram,
}

impl ScenarioContext<'_> {
    /// Launch a fresh helper process with no breakpoints
    pub async fn launch(&self) -> Result<Process> {
        let target = self.debugger.create_target(self.helper.executable())?;
        target.launch_simple(self.helper.dir()).await
    }

    /// Launch a fresh helper process with a breakpoint on the assertion line
    pub async fn launch_to_assert_line(&self) -> Result<Process> {
        let mut target = self.debugger.create_target(self.helper.executable())?;
        target.breakpoint_set_by_file_and_line(self.helper.source(), self.helper.assert_line());
        target.launch_simple(self.helper.dir()).await
    }
}

/// One independent test case
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Get scenario metadata
    fn info(&self) -> &ScenarioInfo;

    /// Run against a fresh helper process; any error fails the scenario
    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()>;
}

/// Kill the process and hand back the scenario result
///
/// A failure to end the session is only logged so it never hides the
/// scenario's own outcome.
pub async fn finish(process: Process, result: Result<()>) -> Result<()> {
    if let Err(e) = process.kill().await {
        tracing::debug!(error = %e, "Debug session did not end cleanly");
    }
    result
}

/// `thread list` must show the process stopped by SIGABRT
///
/// Returns the stop reason text for later backtrace checks.
pub async fn check_stop_reason(process: &mut Process) -> Result<&'static str> {
    expect_command(process, "thread list", None, &["stopped", ABORT_STOP_REASON]).await?;
    Ok(ABORT_STOP_REASON)
}

/// The process must be stopped with some thread stopped by a signal
pub async fn stopped_by_signal(process: &mut Process) -> Result<Thread> {
    if process.state() != ProcessState::Stopped {
        return Err(Error::unexpected_state("stopped", &process.state().to_string()));
    }

    process
        .stopped_thread(|reason| reason.is_signal())
        .await?
        .ok_or_else(|| {
            let actual = process
                .stop_reason()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no stop reason".to_string());
            Error::unexpected_state("a thread stopped by a signal", &actual)
        })
}

/// Find `main` among the frames of `thread`, select it and evaluate the
/// helper's variables there
pub async fn check_expr_in_main(process: &mut Process, thread: &Thread) -> Result<()> {
    let frames = process.frames(thread).await?;
    for frame in &frames {
        if !frame.is_valid() {
            return Err(Error::InvalidHandle(format!("frame #{}", frame.index())));
        }
        tracing::debug!(function = frame.function_name(), "Checking if frame is main");

        if frame.function_name() == "main" {
            let select = format!("frame select {}", frame.index());
            process.run_command(&select, Some(frame)).await?;

            let checks: &[(&str, &[&str])] = &[
                ("expression -- argc", &["(int)", " = 1"]),
                ("expression -- hello_world", &["Hello"]),
                ("expression -- argv[0]", &["a.out"]),
                ("expression -- null_ptr", &["= 0x0"]),
            ];
            for (command, substrs) in checks {
                expect_command(process, command, Some(frame), substrs).await?;
            }
            return Ok(());
        }
    }
    Err(Error::MainFrameNotFound)
}
