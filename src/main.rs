//! inferior-assert - checks a debugger against an asserting inferior
//!
//! Builds a helper program that fails an assertion, runs it under the
//! debugger, and checks the stop reason, backtrace, registers, disassembly
//! and expression results the debugger reports.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use inferior_assert::common::{logging, paths};
use inferior_assert::{cli, commands};

#[derive(Parser)]
#[command(name = "inferior-assert", about = "Check a debugger against an asserting program")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug level for this crate)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also log to a file, every DAP message included
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = match &cli.log_file {
        Some(path) => {
            let path = path
                .clone()
                .or_else(|| paths::log_dir().map(|d| d.join("inferior-assert.log")))
                .unwrap_or_else(|| PathBuf::from("inferior-assert.log"));
            match logging::init_with_file(cli.verbose, &path) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    eprintln!("Error: cannot open log file {}: {e}", path.display());
                    std::process::exit(2);
                }
            }
        }
        None => {
            logging::init_cli(cli.verbose);
            None
        }
    };

    let code = match cli::dispatch(cli.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e}");
            2
        }
    };

    // Flush the log file before exit skips destructors
    drop(guard);
    std::process::exit(code);
}
