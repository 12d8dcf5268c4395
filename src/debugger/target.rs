//! Targets: an executable plus the breakpoints to set before it runs

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::config::{AdapterConfig, Timeouts};
use crate::common::{Error, Result};
use crate::dap::{DapClient, LaunchArguments};

use super::Process;

/// How to start the inferior
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// An executable bound to an adapter
#[derive(Debug, Clone)]
pub struct Target {
    executable: PathBuf,
    adapter_name: String,
    adapter: AdapterConfig,
    timeouts: Timeouts,
    /// Source file -> lines
    breakpoints: BTreeMap<PathBuf, Vec<u32>>,
}

impl Target {
    pub(crate) fn new(
        executable: PathBuf,
        adapter_name: String,
        adapter: AdapterConfig,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            executable,
            adapter_name,
            adapter,
            timeouts,
            breakpoints: BTreeMap::new(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// A target is valid while its executable exists
    pub fn is_valid(&self) -> bool {
        self.executable.is_file()
    }

    /// Request a breakpoint at `file:line`
    ///
    /// It is sent to the adapter at launch and must resolve to exactly that
    /// line, or the launch fails.
    pub fn breakpoint_set_by_file_and_line(&mut self, file: &Path, line: u32) {
        let lines = self.breakpoints.entry(file.to_path_buf()).or_default();
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    /// Launch with no arguments, inherited environment, and the given
    /// working directory. Returns once the process first stops or exits.
    pub async fn launch_simple(&self, cwd: &Path) -> Result<Process> {
        self.launch(LaunchOptions {
            cwd: Some(cwd.to_path_buf()),
            ..Default::default()
        })
        .await
    }

    /// Launch the executable and wait for the first stop or exit
    #[tracing::instrument(
        skip(self, options),
        fields(program = %self.executable.display(), adapter = %self.adapter_name)
    )]
    pub async fn launch(&self, options: LaunchOptions) -> Result<Process> {
        if !self.is_valid() {
            return Err(Error::InvalidHandle(format!(
                "target executable {} does not exist",
                self.executable.display()
            )));
        }

        tracing::debug!("Spawning DAP adapter process");
        let mut client = DapClient::spawn(&self.adapter.path, &self.adapter.args).await?;

        let capabilities = match self.timeouts.initialize_secs {
            Some(secs) => tokio::time::timeout(
                Duration::from_secs(secs),
                client.initialize(&self.adapter_name),
            )
            .await
            .map_err(|_| Error::InitializeTimeout(secs))??,
            None => client.initialize(&self.adapter_name).await?,
        };
        tracing::debug!(?capabilities, "DAP adapter initialized");

        let launch_args = LaunchArguments {
            program: self.executable.to_string_lossy().into_owned(),
            args: options.args,
            cwd: options.cwd.map(|p| p.to_string_lossy().into_owned()),
            env: options.env,
            stop_on_entry: false,
        };
        client.launch(launch_args).await?;
        client.wait_initialized().await?;

        for (file, lines) in &self.breakpoints {
            let resolved = client.set_breakpoints(file, lines).await?;
            for (requested, bp) in lines.iter().zip(resolved.iter()) {
                let location = format!("{}:{}", file.display(), requested);
                if !bp.verified {
                    return Err(Error::breakpoint_failed(
                        &location,
                        bp.message.as_deref().unwrap_or("no locations"),
                    ));
                }
                if bp.line != Some(*requested) {
                    return Err(Error::breakpoint_failed(
                        &location,
                        &format!("resolved to line {:?}", bp.line),
                    ));
                }
                tracing::debug!(%location, id = ?bp.id, "Breakpoint resolved");
            }
            if resolved.len() != lines.len() {
                return Err(Error::breakpoint_failed(
                    &file.display().to_string(),
                    &format!(
                        "expected {} breakpoints, adapter returned {}",
                        lines.len(),
                        resolved.len()
                    ),
                ));
            }
        }

        client.configuration_done().await?;
        tracing::debug!("DAP configuration complete, program starting");

        Process::start(
            client,
            self.adapter.command_escape_prefix.clone(),
            self.timeouts.stop_secs.map(Duration::from_secs),
        )
        .await
    }
}
