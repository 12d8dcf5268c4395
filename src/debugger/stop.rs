//! Stop reasons and process states

use std::fmt;

use crate::dap::StoppedEventBody;

/// Why the debugger halted a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Breakpoint,
    Step,
    Entry,
    Pause,
    /// Signal name as the debugger reports it, e.g. `SIGABRT`
    Signal(String),
    Exception(String),
    Other(String),
}

impl StopReason {
    /// Classify a DAP stopped event
    ///
    /// lldb-dap reports signals as `reason: "exception"` with a
    /// `"signal SIGABRT"` description; other adapters use `reason: "signal"`.
    pub fn from_event(body: &StoppedEventBody) -> Self {
        let detail = body
            .description
            .as_deref()
            .or(body.text.as_deref())
            .unwrap_or("")
            .trim();

        if let Some(name) = signal_name(detail) {
            return StopReason::Signal(name);
        }

        match body.reason.as_str() {
            "breakpoint" | "function breakpoint" => StopReason::Breakpoint,
            "step" => StopReason::Step,
            "entry" => StopReason::Entry,
            "pause" => StopReason::Pause,
            "signal" => StopReason::Signal(detail.to_string()),
            "exception" => StopReason::Exception(detail.to_string()),
            other => StopReason::Other(other.to_string()),
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, StopReason::Signal(_))
    }

    /// Whether this is the abort raised by a failed assertion
    pub fn is_abort(&self) -> bool {
        matches!(self, StopReason::Signal(name) if name == "SIGABRT")
    }
}

fn signal_name(detail: &str) -> Option<String> {
    let rest = detail.strip_prefix("signal ")?;
    let name = rest.split_whitespace().next()?;
    Some(name.to_string())
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Breakpoint => write!(f, "breakpoint"),
            StopReason::Step => write!(f, "step"),
            StopReason::Entry => write!(f, "entry"),
            StopReason::Pause => write!(f, "pause"),
            StopReason::Signal(name) => write!(f, "signal {}", name),
            StopReason::Exception(desc) => write!(f, "exception {}", desc),
            StopReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Process lifecycle as seen by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    /// `code` is `None` when the adapter terminated without an exit event
    Exited { code: Option<i32> },
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Exited { code: Some(code) } => write!(f, "exited ({})", code),
            Self::Exited { code: None } => write!(f, "exited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped(reason: &str, description: Option<&str>) -> StoppedEventBody {
        StoppedEventBody {
            reason: reason.to_string(),
            description: description.map(String::from),
            thread_id: Some(1),
            text: None,
            hit_breakpoint_ids: Vec::new(),
        }
    }

    #[test]
    fn test_lldb_dap_signal_is_abort() {
        let reason = StopReason::from_event(&stopped("exception", Some("signal SIGABRT")));
        assert!(reason.is_abort());
        assert_eq!(reason.to_string(), "signal SIGABRT");
    }

    #[test]
    fn test_plain_signal_reason() {
        let reason = StopReason::from_event(&stopped("signal", Some("SIGSEGV")));
        assert_eq!(reason, StopReason::Signal("SIGSEGV".to_string()));
        assert!(!reason.is_abort());
    }

    #[test]
    fn test_breakpoint_with_description() {
        let reason = StopReason::from_event(&stopped("breakpoint", Some("breakpoint 1.1")));
        assert_eq!(reason, StopReason::Breakpoint);
    }

    #[test]
    fn test_exception_without_signal() {
        let reason = StopReason::from_event(&stopped("exception", Some("EXC_BAD_ACCESS")));
        assert_eq!(reason, StopReason::Exception("EXC_BAD_ACCESS".to_string()));
    }
}
