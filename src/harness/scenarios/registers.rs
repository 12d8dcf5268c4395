//! Reading registers after the assertion

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::debugger::Process;
use crate::harness::arch;
use crate::harness::expect::expect_register;
use crate::harness::scenario::{check_stop_reason, finish, Scenario, ScenarioContext, ScenarioInfo};

static INFO: ScenarioInfo = ScenarioInfo {
    id: "register-read",
    description: "Read a general purpose register after the assertion",
};

pub struct RegisterRead;

#[async_trait]
impl Scenario for RegisterRead {
    fn info(&self) -> &ScenarioInfo {
        &INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let register = arch::general_purpose_register(arch::current()).ok_or_else(|| {
            Error::Unsupported(format!("register names for {}", arch::current()))
        })?;

        let mut process = ctx.launch().await?;
        let result = read_after_abort(&mut process, register).await;
        finish(process, result).await
    }
}

async fn read_after_abort(process: &mut Process, register: &str) -> Result<()> {
    check_stop_reason(process).await?;
    expect_register(process, register).await
}
