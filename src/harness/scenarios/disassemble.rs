//! Disassembling every frame after the assertion

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::debugger::{parse_address, Process};
use crate::harness::expect::expect_command;
use crate::harness::scenario::{check_stop_reason, finish, Scenario, ScenarioContext, ScenarioInfo};

static INFO: ScenarioInfo = ScenarioInfo {
    id: "disassemble",
    description: "Disassemble each frame of the asserting thread",
};

/// Marks the current instruction in `disassemble` output
const PC_MARKER: &str = "->";

pub struct Disassemble;

#[async_trait]
impl Scenario for Disassemble {
    fn info(&self) -> &ScenarioInfo {
        &INFO
    }

    async fn run(&self, ctx: &ScenarioContext<'_>) -> Result<()> {
        let mut process = ctx.launch().await?;
        let result = disassemble_frames(&mut process).await;
        finish(process, result).await
    }
}

async fn disassemble_frames(process: &mut Process) -> Result<()> {
    check_stop_reason(process).await?;

    if !process.is_valid() {
        return Err(Error::InvalidHandle("process is not valid".to_string()));
    }
    let thread = process.thread_at_index(0).await?;

    for frame in process.frames(&thread).await? {
        if !frame.is_valid() {
            return Err(Error::InvalidHandle(format!("frame #{}", frame.index())));
        }
        let pc = frame.pc().ok_or_else(|| {
            Error::InvalidHandle(format!(
                "frame #{} ({}) has no program counter",
                frame.index(),
                frame.function_name()
            ))
        })?;

        process
            .run_command(&format!("frame select {}", frame.index()), Some(&frame))
            .await?;

        expect_command(
            process,
            &format!("disassemble -a 0x{:x}", pc),
            Some(&frame),
            &[PC_MARKER, frame.function_name()],
        )
        .await?;

        if process.capabilities().supports_disassemble_request {
            let instructions = process.disassemble_at(pc, 1).await?;
            let first = instructions.first().and_then(|i| parse_address(&i.address));
            if first != Some(pc) {
                return Err(Error::mismatch(
                    "disassemble request",
                    &[&format!("0x{:x}", pc)],
                    &format!("{:?}", instructions),
                ));
            }
        }
    }
    Ok(())
}
