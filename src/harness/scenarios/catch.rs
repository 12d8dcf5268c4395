//! Catching the assertion at launch
//!
//! Two views of the same stop: the debugger's textual commands and the
//! structured process/thread interface.

use async_trait::async_trait;

use crate::common::Result;
use crate::debugger::Process;
use crate::harness::expect::expect_command;
use crate::harness::scenario::{
    check_stop_reason, finish, stopped_by_signal, Scenario, ScenarioContext, ScenarioInfo,
};

static INFO: ScenarioInfo = ScenarioInfo {
    id: "launch-and-catch",
    description: "Stop on the assertion and report it in the backtrace",
};

static API_INFO: ScenarioInfo = ScenarioInfo {
    id: "launch-and-catch-api",
    description: "Stop on the assertion, checked through the structured interface",
};

pub struct LaunchAndCatch;

#[async_trait]
impl Scenario for LaunchAndCatch {
    fn info(&self) -> &ScenarioInfo {
        &INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let mut process = ctx.launch().await?;
        let result = check_backtrace(&mut process, &ctx.helper.assert_location()).await;
        finish(process, result).await
    }
}

async fn check_backtrace(process: &mut Process, location: &str) -> Result<()> {
    let stop_reason = check_stop_reason(process).await?;

    expect_command(
        process,
        "thread backtrace all",
        None,
        &[stop_reason, "main", "argc", "argv"],
    )
    .await?;

    expect_command(process, "thread backtrace all", None, &[stop_reason, location]).await?;
    Ok(())
}

pub struct LaunchAndCatchApi;

#[async_trait]
impl Scenario for LaunchAndCatchApi {
    fn info(&self) -> &ScenarioInfo {
        &API_INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let mut process = ctx.launch().await?;
        let result = check_stopped_thread(&mut process).await;
        finish(process, result).await
    }
}

async fn check_stopped_thread(process: &mut Process) -> Result<()> {
    let thread = stopped_by_signal(process).await?;

    for frame in process.frames(&thread).await? {
        tracing::debug!(
            index = frame.index(),
            function = frame.function_name(),
            file = frame.file_name().unwrap_or("??"),
            line = frame.line(),
            "frame"
        );
    }
    Ok(())
}
