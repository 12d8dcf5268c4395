//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Debug adapter configurations
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Helper program build settings
    #[serde(default)]
    pub helper: HelperConfig,
}

/// Configuration for a debug adapter
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    /// Path to the adapter executable
    pub path: PathBuf,

    /// Additional arguments to pass to the adapter
    #[serde(default)]
    pub args: Vec<String>,

    /// Prefix that makes a repl evaluation run as a debugger command
    #[serde(default = "default_escape_prefix")]
    pub command_escape_prefix: String,
}

fn default_escape_prefix() -> String {
    "`".to_string()
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Default adapter to use
    #[serde(default = "default_adapter")]
    pub adapter: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
        }
    }
}

fn default_adapter() -> String {
    "lldb-dap".to_string()
}

/// Timeout settings in seconds
///
/// Both are unset by default: the harness blocks until the adapter answers.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct Timeouts {
    /// Bound on the DAP initialize handshake
    #[serde(default)]
    pub initialize_secs: Option<u64>,

    /// Bound on waiting for a stop, exit or terminate event
    #[serde(default)]
    pub stop_secs: Option<u64>,
}

/// Helper program build settings
#[derive(Debug, Deserialize, Clone)]
pub struct HelperConfig {
    /// C compiler to use; the first of cc, clang, gcc on PATH when unset
    #[serde(default)]
    pub compiler: Option<PathBuf>,

    /// Compiler flags
    #[serde(default = "default_cflags")]
    pub cflags: Vec<String>,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            compiler: None,
            cflags: default_cflags(),
        }
    }
}

fn default_cflags() -> Vec<String> {
    vec!["-g".to_string(), "-O0".to_string()]
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Get adapter configuration by name
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn get_adapter(&self, name: &str) -> Option<AdapterConfig> {
        if let Some(config) = self.adapters.get(name) {
            return Some(config.clone());
        }

        // lldb-vscode is the name older LLVM releases ship
        let candidates = if name == "lldb-dap" {
            vec!["lldb-dap", "lldb-vscode"]
        } else {
            vec![name]
        };

        candidates
            .iter()
            .find_map(|candidate| which::which(candidate).ok())
            .map(|path| AdapterConfig {
                path,
                args: Vec::new(),
                command_escape_prefix: default_escape_prefix(),
            })
    }
}
