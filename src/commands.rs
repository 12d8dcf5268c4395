//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Build the helper and run a suite against the debugger
    Run {
        /// Suite file (YAML); without one every scenario runs
        #[arg(long, short)]
        suite: Option<PathBuf>,

        /// Config file (default: ~/.config/inferior-assert/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Debug adapter to use (default: lldb-dap)
        #[arg(long)]
        adapter: Option<String>,

        /// Run only this scenario. Can be specified multiple times
        #[arg(long = "scenario")]
        scenarios: Vec<String>,

        /// Also run scenarios the suite marks as skipped
        #[arg(long)]
        include_skipped: bool,

        /// Keep the helper build directory after the run
        #[arg(long)]
        keep_helper: bool,

        /// Use a helper already built in DIR (a.out plus main.c) instead of compiling one
        #[arg(long, value_name = "DIR")]
        prebuilt: Option<PathBuf>,
    },

    /// List scenarios, with a suite's annotations if one is given
    List {
        /// Suite file (YAML)
        #[arg(long, short)]
        suite: Option<PathBuf>,
    },
}
