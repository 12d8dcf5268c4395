//! Substring and register-value expectations on command output

use crate::common::{Error, Result};
use crate::debugger::{Frame, Process};

/// Stop reason text the debugger prints for a failed assertion
pub const ABORT_STOP_REASON: &str = "stop reason = signal SIGABRT";

/// Stop reason text for a line breakpoint hit
pub const BREAKPOINT_STOP_REASON: &str = "stop reason = breakpoint";

/// Fail unless `output` contains every one of `substrs`
pub fn expect_substrs(command: &str, output: &str, substrs: &[&str]) -> Result<()> {
    if substrs.iter().all(|s| output.contains(s)) {
        Ok(())
    } else {
        Err(Error::mismatch(command, substrs, output))
    }
}

/// Run `command` and check its output contains every one of `substrs`
pub async fn expect_command(
    process: &mut Process,
    command: &str,
    frame: Option<&Frame>,
    substrs: &[&str],
) -> Result<String> {
    let output = process.run_command(command, frame).await?;
    expect_substrs(command, &output, substrs)?;
    Ok(output)
}

/// Whether `output` shows `<name> = 0x<hex-digits>`
pub fn has_register_value(output: &str, name: &str) -> bool {
    let needle = format!("{} = 0x", name);
    output.match_indices(&needle).any(|(at, _)| {
        let preceded_by_word = output[..at]
            .chars()
            .next_back()
            .map(|c| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or(false);
        let digits = output[at + needle.len()..]
            .chars()
            .take_while(char::is_ascii_hexdigit)
            .count();
        !preceded_by_word && digits > 0
    })
}

/// `register read <name>` must print a hex value for that register
pub async fn expect_register(process: &mut Process, name: &str) -> Result<()> {
    let command = format!("register read {}", name);
    let output = process.run_command(&command, None).await?;
    if has_register_value(&output, name) {
        Ok(())
    } else {
        Err(Error::mismatch(&command, &[&format!("{} = 0x", name)], &output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_substrings_required() {
        let expected = ["stopped", ABORT_STOP_REASON];
        let output = "Process 1 stopped ... stop reason = signal SIGABRT";
        assert!(expect_substrs("thread list", output, &expected).is_ok());

        let err = expect_substrs("thread list", "Process 1 stopped", &expected).unwrap_err();
        match err {
            Error::ExpectationMismatch { command, expected, .. } => {
                assert_eq!(command, "thread list");
                assert_eq!(expected.len(), 2);
            }
            other => panic!("Expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_register_value_pattern() {
        assert!(has_register_value("     rax = 0x0000000000000000\n", "rax"));
        assert!(has_register_value("eax = 0x1f", "eax"));
        assert!(!has_register_value("rax = 0x\n", "rax"));
        assert!(!has_register_value("error: Invalid register name 'rax'.", "rax"));
        // `eax` must not match inside `reax`
        assert!(!has_register_value("reax = 0x10", "eax"));
    }
}
