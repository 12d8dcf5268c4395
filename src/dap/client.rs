//! DAP client for communicating with debug adapters
//!
//! Owns the adapter child process. Requests are strictly sequential: a
//! request is written, then messages are read until its response arrives.
//! Events seen on the way are queued for [`DapClient::next_event`].

use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::common::{Error, Result};

use super::codec;
use super::types::*;

/// DAP client for communicating with a debug adapter
pub struct DapClient {
    /// Adapter subprocess
    adapter: Child,
    /// Buffered reader for adapter stdout
    reader: BufReader<ChildStdout>,
    /// Buffered writer for adapter stdin
    writer: BufWriter<ChildStdin>,
    /// Sequence number for the next request
    seq: i64,
    /// Adapter capabilities (populated after initialize)
    pub capabilities: Capabilities,
    /// Events read while waiting for responses
    events: VecDeque<Event>,
}

impl DapClient {
    /// Spawn a new DAP adapter and create a client
    pub async fn spawn(adapter_path: &Path, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(adapter_path);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut adapter = cmd.spawn().map_err(|e| {
            Error::AdapterStartFailed(format!(
                "Failed to start {}: {}",
                adapter_path.display(),
                e
            ))
        })?;

        let stdin = adapter
            .stdin
            .take()
            .ok_or_else(|| Error::AdapterStartFailed("Failed to get adapter stdin".to_string()))?;
        let stdout = adapter.stdout.take().ok_or_else(|| {
            Error::AdapterStartFailed("Failed to get adapter stdout".to_string())
        })?;

        tracing::debug!(adapter = %adapter_path.display(), ?args, "Spawned DAP adapter");

        Ok(Self {
            adapter,
            reader: BufReader::new(stdout),
            writer: BufWriter::new(stdin),
            seq: 1,
            capabilities: Capabilities::default(),
            events: VecDeque::new(),
        })
    }

    /// Send a request and return its sequence number
    async fn send_request(&mut self, command: &str, arguments: Option<Value>) -> Result<i64> {
        let seq = self.seq;
        self.seq += 1;

        let mut request = serde_json::json!({
            "seq": seq,
            "type": "request",
            "command": command,
        });
        if let Some(args) = arguments {
            request["arguments"] = args;
        }

        let json = serde_json::to_string(&request)?;
        tracing::debug!(target: "inferior_assert::dap", ">>> {}", json);

        codec::write_message(&mut self.writer, &json).await?;

        Ok(seq)
    }

    /// Read the next message from the adapter
    async fn read_message(&mut self) -> Result<Value> {
        let json = codec::read_message(&mut self.reader).await?;
        tracing::debug!(target: "inferior_assert::dap", "<<< {}", json);
        serde_json::from_str(&json).map_err(|e| Error::DapProtocol(format!("Invalid JSON: {}", e)))
    }

    /// Send a request and wait for the response
    ///
    /// Events that arrive first are queued, not dropped
    pub async fn request<T: serde::de::DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: Option<Value>,
    ) -> Result<T> {
        let seq = self.send_request(command, arguments).await?;

        loop {
            let msg = self.read_message().await?;

            match msg.get("type").and_then(Value::as_str).unwrap_or("unknown") {
                "response" => {
                    let response: ResponseMessage = serde_json::from_value(msg)?;

                    if response.request_seq != seq {
                        tracing::warn!(
                            request_seq = response.request_seq,
                            expected = seq,
                            "Dropping response to a request nobody is waiting on"
                        );
                        continue;
                    }

                    if !response.success {
                        return Err(Error::dap_request_failed(
                            command,
                            &response.message.unwrap_or_else(|| "Unknown error".to_string()),
                        ));
                    }

                    let body = response.body.unwrap_or(Value::Null);
                    return serde_json::from_value(body).map_err(|e| {
                        Error::DapProtocol(format!("Failed to parse {} response: {}", command, e))
                    });
                }
                "event" => {
                    let event_msg: EventMessage = serde_json::from_value(msg)?;
                    self.events.push_back(Event::from_message(&event_msg));
                }
                // Reverse requests (runInTerminal etc.) are not supported
                other => {
                    tracing::warn!("Ignoring DAP message of type {}", other);
                }
            }
        }
    }

    /// Next event, from the queue or from the adapter
    pub async fn next_event(&mut self) -> Result<Event> {
        if let Some(event) = self.events.pop_front() {
            return Ok(event);
        }

        loop {
            let msg = self.read_message().await?;
            if msg.get("type").and_then(Value::as_str) == Some("event") {
                let event_msg: EventMessage = serde_json::from_value(msg)?;
                return Ok(Event::from_message(&event_msg));
            }
            tracing::warn!("Unexpected non-event message while waiting for events");
        }
    }

    /// Wait for the next event that ends a run (stopped, exited, terminated)
    ///
    /// Other events are handed to `on_event` and discarded. With no timeout
    /// this blocks until the adapter reports something.
    pub async fn wait_for_stop<F>(
        &mut self,
        timeout: Option<Duration>,
        mut on_event: F,
    ) -> Result<Event>
    where
        F: FnMut(&Event),
    {
        let wait = async {
            loop {
                let event = self.next_event().await?;
                if event.ends_run() {
                    return Ok::<_, Error>(event);
                }
                on_event(&event);
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| Error::StopTimeout(limit.as_secs()))?,
            None => wait.await,
        }
    }

    /// Initialize the debug adapter
    pub async fn initialize(&mut self, adapter_id: &str) -> Result<Capabilities> {
        let args = InitializeArguments::new(adapter_id);

        let caps: Capabilities = self
            .request("initialize", Some(serde_json::to_value(&args)?))
            .await?;

        self.capabilities = caps.clone();
        Ok(caps)
    }

    /// Wait for the initialized event
    pub async fn wait_initialized(&mut self) -> Result<()> {
        loop {
            match self.next_event().await? {
                Event::Initialized => return Ok(()),
                Event::Exited(body) => {
                    return Err(Error::AdapterStartFailed(format!(
                        "Program exited with code {} before initialization",
                        body.exit_code
                    )))
                }
                Event::Terminated => {
                    return Err(Error::AdapterStartFailed(
                        "Session terminated before initialization".to_string(),
                    ))
                }
                other => tracing::trace!(?other, "Event before initialized"),
            }
        }
    }

    /// Launch a program for debugging
    pub async fn launch(&mut self, args: LaunchArguments) -> Result<()> {
        self.request::<Value>("launch", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// Signal that configuration is done
    pub async fn configuration_done(&mut self) -> Result<()> {
        self.request::<Value>("configurationDone", None).await?;
        Ok(())
    }

    /// Set breakpoints for a source file, replacing any set before
    pub async fn set_breakpoints(
        &mut self,
        source_path: &Path,
        lines: &[u32],
    ) -> Result<Vec<Breakpoint>> {
        let args = SetBreakpointsArguments {
            source: Source {
                name: source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned()),
                path: Some(source_path.to_string_lossy().into_owned()),
            },
            breakpoints: lines.iter().map(|&line| SourceBreakpoint { line }).collect(),
        };

        let response: SetBreakpointsResponseBody = self
            .request("setBreakpoints", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.breakpoints)
    }

    /// Continue execution
    pub async fn continue_execution(&mut self, thread_id: i64) -> Result<()> {
        let args = ThreadArguments {
            thread_id,
            granularity: None,
        };
        self.request::<Value>("continue", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// Step over (next) one source line
    pub async fn next(&mut self, thread_id: i64) -> Result<()> {
        let args = ThreadArguments {
            thread_id,
            granularity: Some("line".to_string()),
        };
        self.request::<Value>("next", Some(serde_json::to_value(&args)?))
            .await?;
        Ok(())
    }

    /// Get every frame of a thread
    pub async fn stack_trace(&mut self, thread_id: i64) -> Result<Vec<StackFrame>> {
        let args = StackTraceArguments {
            thread_id,
            start_frame: 0,
            levels: 0,
        };

        let response: StackTraceResponseBody = self
            .request("stackTrace", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.stack_frames)
    }

    /// Get threads
    pub async fn threads(&mut self) -> Result<Vec<Thread>> {
        let response: ThreadsResponseBody = self.request("threads", None).await?;
        Ok(response.threads)
    }

    /// Evaluate an expression or, in the repl context, a debugger command
    pub async fn evaluate(
        &mut self,
        expression: &str,
        frame_id: Option<i64>,
        context: &str,
    ) -> Result<EvaluateResponseBody> {
        let args = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: context.to_string(),
        };

        self.request("evaluate", Some(serde_json::to_value(&args)?))
            .await
    }

    /// Disassemble instructions around a memory reference
    pub async fn disassemble(
        &mut self,
        memory_reference: &str,
        instruction_count: i64,
    ) -> Result<Vec<DisassembledInstruction>> {
        if !self.capabilities.supports_disassemble_request {
            return Err(Error::Unsupported("disassemble".to_string()));
        }

        let args = DisassembleArguments {
            memory_reference: memory_reference.to_string(),
            instruction_offset: 0,
            instruction_count,
            resolve_symbols: true,
        };

        let response: DisassembleResponseBody = self
            .request("disassemble", Some(serde_json::to_value(&args)?))
            .await?;

        Ok(response.instructions)
    }

    /// Ask the adapter to end the session
    pub async fn disconnect(&mut self, terminate_debuggee: bool) -> Result<()> {
        let args = DisconnectArguments { terminate_debuggee };

        // Don't wait for response - adapter might exit immediately
        let _ = self
            .send_request("disconnect", Some(serde_json::to_value(&args)?))
            .await;

        Ok(())
    }

    /// Disconnect and make sure the adapter process is gone
    pub async fn terminate(&mut self) -> Result<()> {
        let _ = self.disconnect(true).await;

        match tokio::time::timeout(Duration::from_millis(500), self.adapter.wait()).await {
            Ok(_) => {}
            Err(_) => {
                tracing::debug!("Adapter still running after disconnect, killing it");
                let _ = self.adapter.kill().await;
            }
        }

        Ok(())
    }
}

impl Drop for DapClient {
    fn drop(&mut self) {
        // Best-effort since we can't await in drop
        let _ = self.adapter.start_kill();
    }
}
