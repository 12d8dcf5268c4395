//! Suite runner
//!
//! Runs each entry of a suite against a fresh helper process and turns the
//! result into an outcome. A failing scenario never stops the run.

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::common::{Error, Result};
use crate::debugger::Debugger;

use super::helper::HelperProgram;
use super::registry;
use super::scenario::ScenarioContext;
use super::suite::{KnownDefect, Suite, SuiteEntry};

/// How a scenario ended
#[derive(Debug)]
pub enum Outcome {
    Passed,
    Failed(Error),
    Skipped(KnownDefect),
    /// Failed, as its suite entry predicted
    ExpectedFailure { defect: KnownDefect, error: Error },
    /// Passed although its suite entry predicted a failure
    UnexpectedPass(KnownDefect),
}

impl Outcome {
    /// Whether this outcome makes the run fail
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::UnexpectedPass(_))
    }
}

/// Result of one scenario
#[derive(Debug)]
pub struct ScenarioReport {
    pub id: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Result of a suite run
#[derive(Debug)]
pub struct RunReport {
    pub suite: String,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn expected_failures(&self) -> usize {
        self.count(|o| matches!(o, Outcome::ExpectedFailure { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.scenarios.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// No scenario failed or passed unexpectedly
    pub fn succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Report for a scenario id
    pub fn get(&self, id: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|r| r.id == id)
    }
}

/// Options for a suite run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run entries the suite marks as skipped
    pub include_skipped: bool,
    /// Run only these scenario ids, in this order
    pub only: Vec<String>,
    /// Operating system `only_on` entries are matched against
    pub os: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_skipped: false,
            only: Vec::new(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

/// Pick the entries to run
fn select_entries(suite: &Suite, options: &RunOptions) -> Result<Vec<SuiteEntry>> {
    if options.only.is_empty() {
        return Ok(suite.scenarios.clone());
    }

    options
        .only
        .iter()
        .map(|id| {
            if registry::get_scenario(id).is_none() {
                return Err(Error::Config(format!(
                    "Unknown scenario '{}'. Known: {}",
                    id,
                    registry::all_scenario_ids().join(", ")
                )));
            }
            Ok(suite
                .scenarios
                .iter()
                .find(|e| &e.scenario == id)
                .cloned()
                .unwrap_or_else(|| SuiteEntry::plain(id)))
        })
        .collect()
}

/// Run a suite and print one line per scenario
pub async fn run_suite(
    debugger: &Debugger,
    helper: &HelperProgram,
    suite: &Suite,
    options: &RunOptions,
) -> Result<RunReport> {
    let entries = select_entries(suite, options)?;
    let ctx = ScenarioContext { debugger, helper };

    println!(
        "\n{} {} ({} via {})",
        "Running Suite:".blue().bold(),
        suite.name.white().bold(),
        helper.executable().display(),
        debugger.adapter_name()
    );
    if let Some(desc) = &suite.description {
        println!("  {}", desc.dimmed());
    }

    let mut scenarios = Vec::with_capacity(entries.len());
    for entry in &entries {
        let report = run_entry(&ctx, entry, options).await;
        print_outcome(&report);
        scenarios.push(report);
    }

    let report = RunReport {
        suite: suite.name.clone(),
        scenarios,
    };
    print_summary(&report);
    Ok(report)
}

async fn run_entry(
    ctx: &ScenarioContext<'_>,
    entry: &SuiteEntry,
    options: &RunOptions,
) -> ScenarioReport {
    let started = Instant::now();
    let id = entry.scenario.clone();

    if let Some(defect) = entry.skip_reason(&options.os, ctx.helper.compiler()) {
        if !options.include_skipped {
            tracing::info!(scenario = %id, reason = %defect.reason, "Skipping scenario");
            return ScenarioReport {
                id,
                outcome: Outcome::Skipped(defect),
                duration: started.elapsed(),
            };
        }
        tracing::info!(scenario = %id, reason = %defect.reason, "Running skipped scenario");
    }

    let Some(scenario) = registry::get_scenario(&id) else {
        return ScenarioReport {
            outcome: Outcome::Failed(Error::Config(format!("Unknown scenario '{}'", id))),
            id,
            duration: started.elapsed(),
        };
    };

    tracing::info!(scenario = %id, "Running scenario");
    let result = scenario.run(ctx).await;
    if let Err(e) = &result {
        tracing::info!(
            scenario = %id,
            error = %e,
            debugger_failure = e.is_debugger_failure(),
            "Scenario failed"
        );
    }

    let outcome = match (result, entry.expected_failure.clone()) {
        (Ok(()), None) => Outcome::Passed,
        (Err(e), None) => Outcome::Failed(e),
        (Ok(()), Some(defect)) => Outcome::UnexpectedPass(defect),
        (Err(error), Some(defect)) => Outcome::ExpectedFailure { defect, error },
    };

    ScenarioReport {
        id,
        outcome,
        duration: started.elapsed(),
    }
}

fn tracking_suffix(defect: &KnownDefect) -> String {
    defect
        .tracking
        .as_deref()
        .map(|t| format!(" ({})", t))
        .unwrap_or_default()
}

fn print_outcome(report: &ScenarioReport) {
    let elapsed = format!("{:.2}s", report.duration.as_secs_f64()).dimmed();
    match &report.outcome {
        Outcome::Passed => {
            println!("  {} {} {}", "✓".green(), report.id, elapsed);
        }
        Outcome::Failed(e) => {
            let kind = if e.is_debugger_failure() {
                "debugger failure"
            } else {
                "failed"
            };
            println!("  {} {} {} {}", "✗".red(), report.id, kind.red(), elapsed);
            for line in e.to_string().lines() {
                println!("      {}", line);
            }
        }
        Outcome::Skipped(defect) => {
            println!(
                "  {} {} {}{}",
                "-".yellow(),
                report.id,
                format!("skipped: {}", defect.reason).yellow(),
                tracking_suffix(defect).dimmed()
            );
        }
        Outcome::ExpectedFailure { defect, error } => {
            println!(
                "  {} {} {}{} {}",
                "x".yellow(),
                report.id,
                format!("expected failure: {}", defect.reason).yellow(),
                tracking_suffix(defect).dimmed(),
                elapsed
            );
            println!("      {}", error.to_string().dimmed());
        }
        Outcome::UnexpectedPass(defect) => {
            println!(
                "  {} {} {}{} {}",
                "!".red().bold(),
                report.id,
                format!("unexpected pass: {}", defect.reason).red(),
                tracking_suffix(defect).dimmed(),
                elapsed
            );
        }
    }
}

fn print_summary(report: &RunReport) {
    let summary = format!(
        "{} passed, {} failed, {} skipped, {} expected failures",
        report.passed(),
        report.failed(),
        report.skipped(),
        report.expected_failures()
    );
    if report.succeeded() {
        println!("\n{} {}\n", "✓".green().bold(), summary.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }
}
