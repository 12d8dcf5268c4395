//! CLI command handling
//!
//! Dispatches CLI commands to the harness and formats output.

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::{Config, HelperConfig};
use crate::common::Result;
use crate::debugger::Debugger;
use crate::harness::{registry, run_suite, HelperProgram, RunOptions, Suite};

/// Dispatch a CLI command
///
/// Returns whether the command succeeded as a test run: `false` means some
/// scenario failed or passed unexpectedly.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            suite,
            config,
            adapter,
            scenarios,
            include_skipped,
            keep_helper,
            prebuilt,
        } => {
            let config = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            let suite = match suite {
                Some(path) => Suite::load(&path)?,
                None => Suite::builtin(),
            };

            let debugger = Debugger::new(config, adapter.as_deref())?;
            let options = RunOptions {
                include_skipped,
                only: scenarios,
                ..Default::default()
            };

            if let Some(dir) = prebuilt {
                if !suite.variants.is_empty() {
                    tracing::warn!("Ignoring the suite's build variants for a prebuilt helper");
                }
                let helper = HelperProgram::prebuilt(&dir)?;
                return run_with_helper(&debugger, &helper, &suite, &options).await;
            }

            if suite.variants.is_empty() {
                let helper = HelperProgram::build(&debugger.config().helper, keep_helper).await?;
                return run_with_helper(&debugger, &helper, &suite, &options).await;
            }

            let mut succeeded = true;
            for variant in &suite.variants {
                println!(
                    "\n{} {} ({})",
                    "Build variant:".blue().bold(),
                    variant.name.white().bold(),
                    variant.cflags.join(" ").dimmed()
                );
                let config = HelperConfig {
                    compiler: debugger.config().helper.compiler.clone(),
                    cflags: variant.cflags.clone(),
                };
                let helper = HelperProgram::build(&config, keep_helper).await?;
                succeeded &= run_with_helper(&debugger, &helper, &suite, &options).await?;
            }
            Ok(succeeded)
        }

        Commands::List { suite } => {
            let suite = match suite {
                Some(path) => Suite::load(&path)?,
                None => Suite::builtin(),
            };

            println!("{} {}", "Suite:".blue().bold(), suite.name.white().bold());
            for variant in &suite.variants {
                println!(
                    "  {} {} {}",
                    "variant".blue(),
                    variant.name,
                    variant.cflags.join(" ").dimmed()
                );
            }
            let os = std::env::consts::OS;
            for entry in &suite.scenarios {
                let description = registry::get_scenario(&entry.scenario)
                    .map(|s| s.info().description)
                    .unwrap_or("");
                println!("  {:<24} {}", entry.scenario, description.dimmed());

                if let Some(defect) = entry.skip_reason(os, None) {
                    println!(
                        "  {:<24} {} {}",
                        "",
                        format!("skipped: {}", defect.reason).yellow(),
                        defect.tracking.as_deref().unwrap_or("").dimmed()
                    );
                }
                if !entry.skip_if_compiler.is_empty() {
                    println!(
                        "  {:<24} {}",
                        "",
                        format!("skipped with: {}", entry.skip_if_compiler.join(", ")).yellow()
                    );
                }
                if let Some(defect) = &entry.expected_failure {
                    println!(
                        "  {:<24} {} {}",
                        "",
                        format!("expected failure: {}", defect.reason).yellow(),
                        defect.tracking.as_deref().unwrap_or("").dimmed()
                    );
                }
            }
            Ok(true)
        }
    }
}

/// Preflight one helper and run the suite against it
async fn run_with_helper(
    debugger: &Debugger,
    helper: &HelperProgram,
    suite: &Suite,
    options: &RunOptions,
) -> Result<bool> {
    tracing::info!(
        executable = %helper.executable().display(),
        assert_line = helper.assert_line(),
        compiler = ?helper.compiler(),
        "Helper ready"
    );

    #[cfg(unix)]
    helper.verify_aborts().await?;

    let report = run_suite(debugger, helper, suite, options).await?;
    Ok(report.succeeded())
}
