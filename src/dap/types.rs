//! DAP message types
//!
//! Only the part of the protocol the harness speaks is modelled here.
//! See: https://microsoft.github.io/debug-adapter-protocol/specification

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// === Base Protocol Messages ===

/// DAP response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub seq: i64,
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// DAP event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub seq: i64,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// === Request Arguments ===

/// Initialize request arguments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    pub client_id: String,
    pub client_name: String,
    #[serde(rename = "adapterID")]
    pub adapter_id: String,
    pub lines_start_at1: bool,
    pub columns_start_at1: bool,
    pub path_format: String,
    pub supports_variable_type: bool,
    pub supports_run_in_terminal_request: bool,
}

impl InitializeArguments {
    pub fn new(adapter_id: &str) -> Self {
        Self {
            client_id: "inferior-assert".to_string(),
            client_name: "inferior-assert harness".to_string(),
            adapter_id: adapter_id.to_string(),
            lines_start_at1: true,
            columns_start_at1: true,
            path_format: "path".to_string(),
            supports_variable_type: true,
            supports_run_in_terminal_request: false,
        }
    }
}

/// Launch request arguments (lldb-dap flavour)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    pub program: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    pub stop_on_entry: bool,
}

/// SetBreakpoints request arguments
#[derive(Debug, Clone, Serialize)]
pub struct SetBreakpointsArguments {
    pub source: Source,
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// Arguments shared by continue and the step requests
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadArguments {
    pub thread_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
}

/// StackTrace request arguments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    pub thread_id: i64,
    pub start_frame: i64,
    /// Zero asks for every frame
    pub levels: i64,
}

/// Evaluate request arguments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    pub context: String,
}

/// Disassemble request arguments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisassembleArguments {
    pub memory_reference: String,
    pub instruction_offset: i64,
    pub instruction_count: i64,
    pub resolve_symbols: bool,
}

/// Disconnect request arguments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    pub terminate_debuggee: bool,
}

// === Response Bodies ===

/// Capabilities returned by initialize response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub supports_disassemble_request: bool,
}

/// SetBreakpoints response body
#[derive(Debug, Clone, Deserialize)]
pub struct SetBreakpointsResponseBody {
    pub breakpoints: Vec<Breakpoint>,
}

/// StackTrace response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceResponseBody {
    pub stack_frames: Vec<StackFrame>,
}

/// Threads response body
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadsResponseBody {
    pub threads: Vec<Thread>,
}

/// Evaluate response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponseBody {
    pub result: String,
}

/// Disassemble response body
#[derive(Debug, Clone, Deserialize)]
pub struct DisassembleResponseBody {
    pub instructions: Vec<DisassembledInstruction>,
}

// === Common Types ===

/// Source location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Breakpoint to set at a source line
#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakpoint {
    pub line: u32,
}

/// Breakpoint as resolved by the adapter
#[derive(Debug, Clone, Deserialize)]
pub struct Breakpoint {
    #[serde(default)]
    pub id: Option<u32>,
    pub verified: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

/// Stack frame
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub instruction_pointer_reference: Option<String>,
}

/// Thread
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub name: String,
}

/// One disassembled instruction
#[derive(Debug, Clone, Deserialize)]
pub struct DisassembledInstruction {
    pub address: String,
    pub instruction: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

// === Event Bodies ===

/// Stopped event body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thread_id: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub hit_breakpoint_ids: Vec<u32>,
}

/// Output event body
#[derive(Debug, Clone, Deserialize)]
pub struct OutputEventBody {
    #[serde(default)]
    pub category: Option<String>,
    pub output: String,
}

/// Exited event body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitedEventBody {
    pub exit_code: i32,
}

// === Parsed Events ===

/// Parsed DAP event
#[derive(Debug, Clone)]
pub enum Event {
    Initialized,
    Stopped(StoppedEventBody),
    Continued { thread_id: i64 },
    Exited(ExitedEventBody),
    Terminated,
    Output(OutputEventBody),
    Unknown { event: String, body: Option<Value> },
}

impl Event {
    /// Parse an event from an EventMessage
    pub fn from_message(msg: &EventMessage) -> Self {
        let body = msg.body.clone().unwrap_or(Value::Null);
        let unknown = || Event::Unknown {
            event: msg.event.clone(),
            body: msg.body.clone(),
        };

        match msg.event.as_str() {
            "initialized" => Event::Initialized,
            "stopped" => serde_json::from_value(body)
                .map(Event::Stopped)
                .unwrap_or_else(|_| unknown()),
            "continued" => Event::Continued {
                thread_id: body.get("threadId").and_then(Value::as_i64).unwrap_or(0),
            },
            "exited" => Event::Exited(
                serde_json::from_value(body).unwrap_or(ExitedEventBody { exit_code: 0 }),
            ),
            "terminated" => Event::Terminated,
            "output" => serde_json::from_value(body)
                .map(Event::Output)
                .unwrap_or_else(|_| unknown()),
            _ => unknown(),
        }
    }

    /// Whether this event ends a wait for the process to stop
    pub fn ends_run(&self) -> bool {
        matches!(self, Event::Stopped(_) | Event::Exited(_) | Event::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, body: Value) -> EventMessage {
        EventMessage {
            seq: 1,
            event: name.to_string(),
            body: Some(body),
        }
    }

    #[test]
    fn test_parse_signal_stop() {
        let msg = event(
            "stopped",
            json!({ "reason": "exception", "description": "signal SIGABRT", "threadId": 4242 }),
        );
        match Event::from_message(&msg) {
            Event::Stopped(body) => {
                assert_eq!(body.reason, "exception");
                assert_eq!(body.description.as_deref(), Some("signal SIGABRT"));
                assert_eq!(body.thread_id, Some(4242));
            }
            other => panic!("Expected Stopped, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_stop_is_unknown() {
        let msg = event("stopped", json!({ "threadId": 1 }));
        assert!(matches!(Event::from_message(&msg), Event::Unknown { .. }));
    }

    #[test]
    fn test_exit_without_body_defaults_to_zero() {
        let msg = EventMessage {
            seq: 3,
            event: "exited".to_string(),
            body: None,
        };
        assert!(matches!(
            Event::from_message(&msg),
            Event::Exited(ExitedEventBody { exit_code: 0 })
        ));
        assert!(Event::from_message(&msg).ends_run());
    }

    #[test]
    fn test_parse_continued() {
        let msg = event("continued", json!({ "threadId": 7, "allThreadsContinued": true }));
        assert!(matches!(
            Event::from_message(&msg),
            Event::Continued { thread_id: 7 }
        ));
        assert!(!Event::from_message(&msg).ends_run());
    }

    #[test]
    fn test_capabilities_ignore_unmodelled_fields() {
        let caps: Capabilities = serde_json::from_value(json!({
            "supportsConfigurationDoneRequest": true,
            "supportsDisassembleRequest": true,
            "supportsStepBack": false
        }))
        .unwrap();
        assert!(caps.supports_disassemble_request);

        let caps: Capabilities = serde_json::from_value(json!({})).unwrap();
        assert!(!caps.supports_disassemble_request);
    }

    #[test]
    fn test_launch_arguments_skip_empty_fields() {
        let args = LaunchArguments {
            program: "/tmp/a.out".to_string(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            stop_on_entry: false,
        };
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value, json!({ "program": "/tmp/a.out", "stopOnEntry": false }));
    }
}
