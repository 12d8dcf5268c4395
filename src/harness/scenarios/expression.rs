//! Evaluating expressions in `main` after the assertion

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::debugger::Process;
use crate::harness::scenario::{
    check_expr_in_main, check_stop_reason, finish, Scenario, ScenarioContext, ScenarioInfo,
};

static INFO: ScenarioInfo = ScenarioInfo {
    id: "expression-evaluation",
    description: "Evaluate argc, argv and globals in main after the assertion",
};

pub struct ExpressionEvaluation;

#[async_trait]
impl Scenario for ExpressionEvaluation {
    fn info(&self) -> &ScenarioInfo {
        &INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let mut process = ctx.launch().await?;
        let result = evaluate_in_main(&mut process).await;
        finish(process, result).await
    }
}

async fn evaluate_in_main(process: &mut Process) -> Result<()> {
    check_stop_reason(process).await?;

    if !process.is_valid() {
        return Err(Error::InvalidHandle("process is not valid".to_string()));
    }
    let thread = process.thread_at_index(0).await?;
    check_expr_in_main(process, &thread).await
}
