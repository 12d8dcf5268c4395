//! The debugger session: configuration plus the resolved adapter

use std::path::Path;

use crate::common::config::{AdapterConfig, Config};
use crate::common::{Error, Result};

use super::Target;

/// One debugger instance for the whole harness run
pub struct Debugger {
    config: Config,
    adapter_name: String,
    adapter: AdapterConfig,
}

impl Debugger {
    /// Resolve the adapter named `adapter_name`, or the configured default
    pub fn new(config: Config, adapter_name: Option<&str>) -> Result<Self> {
        let adapter_name = adapter_name
            .map(String::from)
            .unwrap_or_else(|| config.defaults.adapter.clone());

        let adapter = config.get_adapter(&adapter_name).ok_or_else(|| {
            let mut searched: Vec<String> = config.adapters.keys().cloned().collect();
            searched.push(format!("{} on PATH", adapter_name));
            Error::adapter_not_found(&adapter_name, &searched)
        })?;

        tracing::info!(
            adapter = %adapter_name,
            path = %adapter.path.display(),
            "Debugger session created"
        );

        Ok(Self {
            config,
            adapter_name,
            adapter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn adapter(&self) -> &AdapterConfig {
        &self.adapter
    }

    /// Create a target for an executable
    pub fn create_target(&self, executable: &Path) -> Result<Target> {
        let target = Target::new(
            executable.to_path_buf(),
            self.adapter_name.clone(),
            self.adapter.clone(),
            self.config.timeouts,
        );
        if !target.is_valid() {
            return Err(Error::InvalidHandle(format!(
                "no executable at {}",
                executable.display()
            )));
        }
        Ok(target)
    }
}

impl Drop for Debugger {
    fn drop(&mut self) {
        tracing::debug!(adapter = %self.adapter_name, "Debugger session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_with(name: &str, path: &str) -> Config {
        let mut adapters = HashMap::new();
        adapters.insert(
            name.to_string(),
            AdapterConfig {
                path: PathBuf::from(path),
                args: Vec::new(),
                command_escape_prefix: "`".to_string(),
            },
        );
        Config {
            adapters,
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_adapter_is_reported() {
        let config = config_with("mock", "/bin/true");
        let err = Debugger::new(config, Some("no-such-adapter-xyz")).err().unwrap();
        assert!(matches!(err, Error::AdapterNotFound { .. }));
        assert!(err.to_string().contains("no-such-adapter-xyz"));
    }

    #[test]
    fn test_missing_executable_is_invalid_target() {
        let debugger = Debugger::new(config_with("mock", "/bin/true"), Some("mock")).unwrap();
        let err = debugger
            .create_target(Path::new("/definitely/not/here/a.out"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidHandle(_)));
    }
}
