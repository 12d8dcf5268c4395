//! Stepping over the assertion from a breakpoint on its line

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::debugger::Process;
use crate::harness::arch;
use crate::harness::expect::{expect_command, expect_register, BREAKPOINT_STOP_REASON};
use crate::harness::scenario::{
    check_expr_in_main, check_stop_reason, finish, Scenario, ScenarioContext, ScenarioInfo,
};

static INFO: ScenarioInfo = ScenarioInfo {
    id: "step-then-assert",
    description: "Break on the assertion line, step over it and inspect the stop",
};

pub struct StepThenAssert;

#[async_trait]
impl Scenario for StepThenAssert {
    fn info(&self) -> &ScenarioInfo {
        &INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let mut process = ctx.launch_to_assert_line().await?;
        let result = step_over_assert(&mut process, &ctx.helper.assert_location()).await;
        finish(process, result).await
    }
}

async fn step_over_assert(process: &mut Process, location: &str) -> Result<()> {
    expect_command(process, "thread list", None, &[location, BREAKPOINT_STOP_REASON]).await?;

    let thread = process.thread_at_index(0).await?;
    process.step_over(&thread).await?;
    let stop_reason = check_stop_reason(process).await?;

    match arch::frame_pointer_register(arch::current()) {
        Some(register) => expect_register(process, register).await?,
        None => tracing::debug!(arch = arch::current(), "No frame pointer register to check"),
    }

    if !process.is_valid() {
        return Err(Error::InvalidHandle("process is not valid".to_string()));
    }
    let thread = process.thread_at_index(0).await?;
    check_expr_in_main(process, &thread).await?;

    expect_command(process, "thread backtrace all", None, &[stop_reason, location]).await?;
    Ok(())
}
