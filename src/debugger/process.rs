//! A launched helper process under adapter control

use std::time::Duration;

use crate::common::{Error, Result};
use crate::dap::{self, DapClient, DisassembledInstruction, Event};

use super::handles::{parse_address, Frame, StopGeneration, Thread};
use super::{ProcessState, StopReason};

/// A debugged process
///
/// Owns the adapter connection. Thread and frame views taken from it are
/// invalidated by [`Process::step_over`] and [`Process::resume`].
pub struct Process {
    client: DapClient,
    command_escape_prefix: String,
    stop_timeout: Option<Duration>,
    state: ProcessState,
    /// Thread that caused the last stop and why
    last_stop: Option<(Option<i64>, StopReason)>,
    generation: StopGeneration,
    /// Inferior stdout/stderr forwarded by the adapter
    output: String,
}

impl Process {
    /// Wrap a client whose `configurationDone` was just sent and wait for the
    /// first stop
    pub(crate) async fn start(
        client: DapClient,
        command_escape_prefix: String,
        stop_timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut process = Self {
            client,
            command_escape_prefix,
            stop_timeout,
            state: ProcessState::Running,
            last_stop: None,
            generation: StopGeneration::default(),
            output: String::new(),
        };
        process.wait_for_stop().await?;
        Ok(process)
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// False once the process has exited
    pub fn is_valid(&self) -> bool {
        !matches!(self.state, ProcessState::Exited { .. })
    }

    /// Why the process last stopped
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.last_stop.as_ref().map(|(_, reason)| reason)
    }

    /// Output the inferior printed so far
    pub fn output(&self) -> &str {
        &self.output
    }

    fn ensure_stopped(&self, action: &str) -> Result<()> {
        if self.state == ProcessState::Stopped {
            Ok(())
        } else {
            Err(Error::unexpected_state(
                &format!("stopped (to {})", action),
                &self.state.to_string(),
            ))
        }
    }

    async fn wait_for_stop(&mut self) -> Result<ProcessState> {
        let output = &mut self.output;
        let event = self
            .client
            .wait_for_stop(self.stop_timeout, |event| match event {
                Event::Output(body) if body.category.as_deref() != Some("console") => {
                    output.push_str(&body.output);
                }
                Event::Continued { thread_id } => {
                    tracing::trace!(thread_id, "Process continued");
                }
                _ => {}
            })
            .await?;

        match event {
            Event::Stopped(body) => {
                let reason = StopReason::from_event(&body);
                tracing::info!(thread = ?body.thread_id, %reason, "Process stopped");
                self.last_stop = Some((body.thread_id, reason));
                self.state = ProcessState::Stopped;
            }
            Event::Exited(body) => {
                tracing::info!(code = body.exit_code, "Process exited");
                self.last_stop = None;
                self.state = ProcessState::Exited {
                    code: Some(body.exit_code),
                };
            }
            _ => {
                tracing::info!("Debug session terminated");
                self.last_stop = None;
                self.state = ProcessState::Exited { code: None };
            }
        }

        Ok(self.state)
    }

    /// Every thread of the stopped process
    ///
    /// Only the thread named in the stop event carries a stop reason.
    pub async fn threads(&mut self) -> Result<Vec<Thread>> {
        self.ensure_stopped("list threads")?;

        let stop_thread = self.last_stop.as_ref().and_then(|(id, _)| *id);
        let threads = self.client.threads().await?;

        // An adapter that omits threadId means the stop applies to the first thread
        let stopped_id = stop_thread.or_else(|| threads.first().map(|t| t.id));

        Ok(threads
            .into_iter()
            .enumerate()
            .map(|(index, thread)| {
                let reason = if Some(thread.id) == stopped_id {
                    self.stop_reason().cloned()
                } else {
                    None
                };
                Thread::new(thread.id, index, thread.name, reason, self.generation.stamp())
            })
            .collect())
    }

    /// Thread at a position in the thread list
    pub async fn thread_at_index(&mut self, index: usize) -> Result<Thread> {
        let mut threads = self.threads().await?;
        if index >= threads.len() {
            return Err(Error::InvalidHandle(format!(
                "thread index {} (process has {} threads)",
                index,
                threads.len()
            )));
        }
        Ok(threads.swap_remove(index))
    }

    /// First thread whose stop reason satisfies `matches`
    pub async fn stopped_thread<F>(&mut self, matches: F) -> Result<Option<Thread>>
    where
        F: Fn(&StopReason) -> bool,
    {
        let threads = self.threads().await?;
        Ok(threads
            .into_iter()
            .find(|t| t.stop_reason().map(&matches).unwrap_or(false)))
    }

    /// Every frame of a thread, innermost first
    pub async fn frames(&mut self, thread: &Thread) -> Result<Vec<Frame>> {
        if !thread.is_valid() {
            return Err(Error::InvalidHandle(format!(
                "thread {} was taken before the last resume",
                thread.id()
            )));
        }
        self.ensure_stopped("walk frames")?;

        let frames = self.client.stack_trace(thread.id()).await?;
        Ok(frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let pc = frame
                    .instruction_pointer_reference
                    .as_deref()
                    .and_then(parse_address);
                let source_path = frame.source.and_then(|s| s.path.or(s.name));
                Frame::new(
                    frame.id,
                    index,
                    thread.id(),
                    frame.name,
                    source_path,
                    frame.line,
                    pc,
                    self.generation.stamp(),
                )
            })
            .collect())
    }

    /// Run a textual debugger command and return its output
    ///
    /// With a frame, the adapter evaluates the command with that frame
    /// selected.
    pub async fn run_command(&mut self, command: &str, frame: Option<&Frame>) -> Result<String> {
        self.ensure_stopped("run a command")?;
        if let Some(frame) = frame {
            if !frame.is_valid() {
                return Err(Error::InvalidHandle(format!(
                    "frame #{} was taken before the last resume",
                    frame.index()
                )));
            }
        }

        tracing::debug!(command, frame = ?frame.map(Frame::index), "Running debugger command");
        let line = format!("{}{}", self.command_escape_prefix, command);
        let response = self
            .client
            .evaluate(&line, frame.map(Frame::id), "repl")
            .await?;
        Ok(response.result)
    }

    /// Disassemble `count` instructions starting at `address`
    pub async fn disassemble_at(
        &mut self,
        address: u64,
        count: i64,
    ) -> Result<Vec<DisassembledInstruction>> {
        self.ensure_stopped("disassemble")?;
        self.client
            .disassemble(&format!("0x{:x}", address), count)
            .await
    }

    /// Step over one source line on `thread` and wait for the next stop
    pub async fn step_over(&mut self, thread: &Thread) -> Result<ProcessState> {
        self.ensure_stopped("step")?;
        if !thread.is_valid() {
            return Err(Error::InvalidHandle(format!(
                "thread {} was taken before the last resume",
                thread.id()
            )));
        }

        self.generation.advance();
        self.state = ProcessState::Running;
        self.client.next(thread.id()).await?;
        self.wait_for_stop().await
    }

    /// Continue all threads and wait for the next stop
    pub async fn resume(&mut self) -> Result<ProcessState> {
        self.ensure_stopped("continue")?;
        let thread_id = match self.last_stop.as_ref().and_then(|(id, _)| *id) {
            Some(id) => id,
            None => self
                .client
                .threads()
                .await?
                .first()
                .map(|t| t.id)
                .ok_or_else(|| Error::InvalidHandle("process has no threads".to_string()))?,
        };

        self.generation.advance();
        self.state = ProcessState::Running;
        self.client.continue_execution(thread_id).await?;
        self.wait_for_stop().await
    }

    /// End the debug session, killing the inferior
    pub async fn kill(mut self) -> Result<()> {
        self.generation.advance();
        self.client.terminate().await
    }

    /// Capabilities the adapter announced
    pub fn capabilities(&self) -> &dap::Capabilities {
        &self.client.capabilities
    }
}
