//! End-to-end integration tests for the harness
//!
//! Most tests drive the library against the `mock_adapter` binary, which
//! imitates lldb-dap debugging the asserting helper. The helper source is
//! written next to a placeholder `a.out` so the marker line resolves the same
//! way it does for a real build. Tests against a real lldb-dap and C compiler
//! are ignored by default.

use std::collections::HashMap;
use std::path::PathBuf;

use inferior_assert::common::config::{AdapterConfig, Config, Timeouts};
use inferior_assert::harness::helper::{EXECUTABLE_NAME, HELPER_SOURCE, SOURCE_NAME};
use inferior_assert::harness::{run_suite, HelperProgram, Outcome, RunOptions, RunReport, Suite};
use inferior_assert::{Debugger, Error, ProcessState};

/// Test context: a mock-backed debugger and a placeholder helper
struct TestContext {
    /// Holds a.out and main.c
    _dir: tempfile::TempDir,
    helper: HelperProgram,
    debugger: Debugger,
}

impl TestContext {
    /// Create a new test context; `flags` are passed to the mock adapter
    fn new(flags: &[&str]) -> Self {
        Self::with_timeouts(flags, Timeouts::default())
    }

    fn with_timeouts(flags: &[&str], timeouts: Timeouts) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join(SOURCE_NAME), HELPER_SOURCE)
            .expect("Failed to write main.c");
        std::fs::write(dir.path().join(EXECUTABLE_NAME), b"").expect("Failed to write a.out");

        let helper = HelperProgram::prebuilt(dir.path()).expect("Failed to load helper");
        let config = Config {
            timeouts,
            ..mock_config(flags)
        };
        let debugger = Debugger::new(config, Some("mock")).expect("Failed to create debugger");

        Self {
            _dir: dir,
            helper,
            debugger,
        }
    }

    async fn run(&self, suite: &Suite, options: &RunOptions) -> RunReport {
        run_suite(&self.debugger, &self.helper, suite, options)
            .await
            .expect("Suite run failed")
    }

    async fn run_only(&self, ids: &[&str]) -> RunReport {
        let options = RunOptions {
            only: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        self.run(&Suite::builtin(), &options).await
    }
}

fn mock_config(flags: &[&str]) -> Config {
    let mut adapters = HashMap::new();
    adapters.insert(
        "mock".to_string(),
        AdapterConfig {
            path: PathBuf::from(env!("CARGO_BIN_EXE_mock_adapter")),
            args: flags.iter().map(|s| s.to_string()).collect(),
            command_escape_prefix: "`".to_string(),
        },
    );
    Config {
        adapters,
        ..Default::default()
    }
}

fn outcome<'a>(report: &'a RunReport, id: &str) -> &'a Outcome {
    &report
        .get(id)
        .unwrap_or_else(|| panic!("No report for {}", id))
        .outcome
}

// ============== Scenarios against the mock adapter ==============

#[tokio::test]
async fn test_every_scenario_passes() {
    let ctx = TestContext::new(&[]);
    let report = ctx.run(&Suite::builtin(), &RunOptions::default()).await;

    for scenario in &report.scenarios {
        assert!(
            matches!(scenario.outcome, Outcome::Passed),
            "{} did not pass: {:?}",
            scenario.id,
            scenario.outcome
        );
    }
    assert_eq!(report.passed(), 6);
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_rerun_reproduces_the_same_stop() {
    let ctx = TestContext::new(&[]);

    let mut stops = Vec::new();
    for _ in 0..2 {
        let target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();
        let mut process = target.launch_simple(ctx.helper.dir()).await.unwrap();

        let thread = process.thread_at_index(0).await.unwrap();
        let frames = process.frames(&thread).await.unwrap();
        let main = frames.iter().find(|f| f.function_name() == "main").unwrap();
        stops.push((process.stop_reason().cloned(), main.line()));

        process.kill().await.unwrap();
    }

    assert_eq!(stops[0], stops[1]);
    assert!(stops[0].0.as_ref().unwrap().is_abort());
    assert_eq!(stops[0].1, ctx.helper.assert_line());
}

#[tokio::test]
async fn test_exactly_one_thread_stops_by_signal() {
    let ctx = TestContext::new(&[]);
    let target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();
    let mut process = target.launch_simple(ctx.helper.dir()).await.unwrap();

    assert_eq!(process.state(), ProcessState::Stopped);
    let threads = process.threads().await.unwrap();
    let signalled: Vec<_> = threads
        .iter()
        .filter(|t| t.stop_reason().map(|r| r.is_signal()).unwrap_or(false))
        .collect();
    assert_eq!(signalled.len(), 1);
    assert!(process.output().contains("Hello, assertion!"));

    process.kill().await.unwrap();
}

#[tokio::test]
async fn test_handles_expire_on_step() {
    let ctx = TestContext::new(&[]);
    let mut target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();
    target.breakpoint_set_by_file_and_line(ctx.helper.source(), ctx.helper.assert_line());
    let mut process = target.launch_simple(ctx.helper.dir()).await.unwrap();

    let thread = process.thread_at_index(0).await.unwrap();
    let frames = process.frames(&thread).await.unwrap();
    assert_eq!(frames[0].function_name(), "main");
    assert!(thread.is_valid() && frames[0].is_valid());

    let state = process.step_over(&thread).await.unwrap();
    assert_eq!(state, ProcessState::Stopped);
    assert!(!thread.is_valid());
    assert!(!frames[0].is_valid());
    assert!(matches!(
        process.frames(&thread).await,
        Err(Error::InvalidHandle(_))
    ));
    assert!(matches!(
        process.run_command("frame select 0", Some(&frames[0])).await,
        Err(Error::InvalidHandle(_))
    ));

    let fresh = process.thread_at_index(0).await.unwrap();
    assert!(fresh.is_valid());
    assert!(fresh.stop_reason().unwrap().is_abort());

    // A second resume lets the aborted process die
    let state = process.resume().await.unwrap();
    assert!(matches!(state, ProcessState::Exited { code: Some(134) }));
    assert!(!process.is_valid());
    assert!(!fresh.is_valid());
}

#[tokio::test]
async fn test_breakpoint_off_the_assert_line_fails_launch() {
    let ctx = TestContext::new(&[]);
    let mut target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();
    target.breakpoint_set_by_file_and_line(ctx.helper.source(), 1);

    let err = target.launch_simple(ctx.helper.dir()).await.err().unwrap();
    assert!(matches!(err, Error::BreakpointFailed { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_thread_index_out_of_range() {
    let ctx = TestContext::new(&[]);
    let target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();
    let mut process = target.launch_simple(ctx.helper.dir()).await.unwrap();

    assert!(matches!(
        process.thread_at_index(5).await,
        Err(Error::InvalidHandle(_))
    ));
    process.kill().await.unwrap();
}

// ============== Failure reporting ==============

#[tokio::test]
async fn test_truncated_backtrace_is_reported() {
    let ctx = TestContext::new(&["--truncated-backtrace"]);
    let report = ctx
        .run_only(&["expression-evaluation", "launch-and-catch", "disassemble"])
        .await;

    assert!(matches!(
        outcome(&report, "expression-evaluation"),
        Outcome::Failed(Error::MainFrameNotFound)
    ));
    match outcome(&report, "launch-and-catch") {
        Outcome::Failed(Error::ExpectationMismatch { command, .. }) => {
            assert_eq!(command, "thread backtrace all");
        }
        other => panic!("Expected a backtrace mismatch, got {:?}", other),
    }
    // Every frame that is there still disassembles
    assert!(matches!(outcome(&report, "disassemble"), Outcome::Passed));
    assert!(!report.succeeded());
}

#[tokio::test]
async fn test_process_that_never_asserts() {
    let ctx = TestContext::new(&["--no-abort"]);
    let report = ctx.run_only(&["launch-and-catch", "launch-and-catch-api"]).await;

    for id in ["launch-and-catch", "launch-and-catch-api"] {
        let Outcome::Failed(err) = outcome(&report, id) else {
            panic!("{}: expected a failure", id);
        };
        assert!(!err.is_debugger_failure());
        match err {
            Error::UnexpectedState { actual, .. } => {
                assert!(actual.contains("exited"), "{}: {}", id, actual);
            }
            other => panic!("{}: expected an unexpected-state failure, got {:?}", id, other),
        }
    }
}

#[tokio::test]
async fn test_missing_adapter_is_a_debugger_failure() {
    let mut config = mock_config(&[]);
    if let Some(adapter) = config.adapters.get_mut("mock") {
        adapter.path = PathBuf::from("/definitely/not/an/adapter");
    }
    let ctx = TestContext::new(&[]);
    let debugger = Debugger::new(config, Some("mock")).unwrap();

    let options = RunOptions {
        only: vec!["launch-and-catch".to_string()],
        ..Default::default()
    };
    let report = run_suite(&debugger, &ctx.helper, &Suite::builtin(), &options)
        .await
        .unwrap();

    match outcome(&report, "launch-and-catch") {
        Outcome::Failed(err) => assert!(err.is_debugger_failure(), "got {:?}", err),
        other => panic!("Expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stop_timeout_is_a_debugger_failure() {
    let timeouts = Timeouts {
        stop_secs: Some(1),
        ..Default::default()
    };
    let ctx = TestContext::with_timeouts(&["--hang-after-configuration-done"], timeouts);
    let report = ctx.run_only(&["launch-and-catch"]).await;

    match outcome(&report, "launch-and-catch") {
        Outcome::Failed(err) => {
            assert!(matches!(err, Error::StopTimeout(1)), "got {:?}", err);
            assert!(err.is_debugger_failure());
        }
        other => panic!("Expected a stop timeout, got {:?}", other),
    }
    assert!(!report.succeeded());
}

#[tokio::test]
async fn test_initialize_timeout() {
    let timeouts = Timeouts {
        initialize_secs: Some(1),
        ..Default::default()
    };
    let ctx = TestContext::with_timeouts(&["--hang-on-initialize"], timeouts);
    let target = ctx.debugger.create_target(ctx.helper.executable()).unwrap();

    let err = target.launch_simple(ctx.helper.dir()).await.err().unwrap();
    assert!(matches!(err, Error::InitializeTimeout(1)), "got {:?}", err);
    assert!(err.is_debugger_failure());
}

#[tokio::test]
async fn test_missing_pc_marker_fails_disassemble() {
    let ctx = TestContext::new(&["--no-pc-marker"]);
    let report = ctx.run_only(&["disassemble"]).await;

    let Outcome::Failed(err) = outcome(&report, "disassemble") else {
        panic!("disassemble: expected a failure");
    };
    assert!(!err.is_debugger_failure());
    match err {
        Error::ExpectationMismatch {
            command, expected, ..
        } => {
            assert!(command.starts_with("disassemble -a 0x"), "{}", command);
            assert!(expected.iter().any(|e| e == "->"), "{:?}", expected);
        }
        other => panic!("Expected a disassembly mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disassembly_off_the_pc_fails() {
    let ctx = TestContext::new(&["--misaligned-disassembly"]);
    let report = ctx.run_only(&["disassemble"]).await;

    match outcome(&report, "disassemble") {
        Outcome::Failed(Error::ExpectationMismatch { command, .. }) => {
            assert_eq!(command, "disassemble request");
        }
        other => panic!("Expected a disassemble request mismatch, got {:?}", other),
    }
}

// ============== Suite annotations ==============

const ANNOTATED_SUITE: &str = r#"
name: annotated
scenarios:
  - scenario: launch-and-catch
  - scenario: step-then-assert
    skip:
      reason: backtrace is truncated
      tracking: llvm.org/pr17276
  - scenario: register-read
    only_on: [no-such-os]
  - scenario: expression-evaluation
    expected_failure:
      reason: cannot find main
  - scenario: disassemble
    skip_if_compiler: [gcc]
"#;

#[tokio::test]
async fn test_skip_and_expected_failure_outcomes() {
    let suite = Suite::parse(ANNOTATED_SUITE).unwrap();
    let ctx = TestContext::new(&["--truncated-backtrace"]);
    let report = ctx.run(&suite, &RunOptions::default()).await;

    match outcome(&report, "step-then-assert") {
        Outcome::Skipped(defect) => {
            assert_eq!(defect.tracking.as_deref(), Some("llvm.org/pr17276"));
        }
        other => panic!("Expected skip, got {:?}", other),
    }
    match outcome(&report, "register-read") {
        Outcome::Skipped(defect) => assert_eq!(defect.reason, "requires no-such-os"),
        other => panic!("Expected skip, got {:?}", other),
    }
    assert!(matches!(
        outcome(&report, "expression-evaluation"),
        Outcome::ExpectedFailure {
            error: Error::MainFrameNotFound,
            ..
        }
    ));
    // The compiler of a prebuilt helper is unknown, so the compiler skip does not apply
    assert!(matches!(outcome(&report, "disassemble"), Outcome::Passed));
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.expected_failures(), 1);
}

#[tokio::test]
async fn test_fixed_defect_is_an_unexpected_pass() {
    let suite = Suite::parse(ANNOTATED_SUITE).unwrap();
    let ctx = TestContext::new(&[]);
    let options = RunOptions {
        include_skipped: true,
        ..Default::default()
    };
    let report = ctx.run(&suite, &options).await;

    assert!(matches!(outcome(&report, "step-then-assert"), Outcome::Passed));
    assert!(matches!(outcome(&report, "register-read"), Outcome::Passed));
    assert!(matches!(
        outcome(&report, "expression-evaluation"),
        Outcome::UnexpectedPass(_)
    ));
    assert!(!report.succeeded());
}

#[test]
fn test_known_defects_suite_loads() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("suites/known-defects.yaml");
    let suite = Suite::load(&path).unwrap();

    let step = suite
        .scenarios
        .iter()
        .find(|e| e.scenario == "step-then-assert")
        .unwrap();
    assert_eq!(
        step.skip.as_ref().and_then(|s| s.tracking.as_deref()),
        Some("llvm.org/pr17276")
    );

    let disassemble = suite
        .scenarios
        .iter()
        .find(|e| e.scenario == "disassemble")
        .unwrap();
    assert_eq!(disassemble.skip_if_compiler, vec!["gcc"]);
}

#[test]
fn test_debug_info_suite_has_variants() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("suites/debug-info.yaml");
    let suite = Suite::load(&path).unwrap();

    let names: Vec<_> = suite.variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["dwarf-4", "dwarf-5"]);
    assert!(suite.variants.iter().all(|v| v.cflags.iter().any(|f| f == "-g")));
}

// ============== Real debugger ==============

#[cfg(unix)]
#[tokio::test]
#[ignore = "requires lldb-dap and a C compiler"]
async fn test_lldb_dap_full_suite() {
    let config = Config::default();
    let debugger = Debugger::new(config, None).expect("lldb-dap not found");
    let helper = HelperProgram::build(&debugger.config().helper, false)
        .await
        .expect("Failed to build helper");
    helper.verify_aborts().await.expect("Helper does not abort");

    let report = run_suite(&debugger, &helper, &Suite::builtin(), &RunOptions::default())
        .await
        .unwrap();
    assert!(report.succeeded(), "{:#?}", report);
}
