//! Suite files
//!
//! A suite lists scenarios in run order, each optionally annotated with a
//! known external defect or a platform or compiler restriction. A suite may
//! also name build variants; every scenario then runs once per variant.

use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};

use super::registry;

/// An ordered list of scenarios
#[derive(Deserialize, Debug, Clone)]
pub struct Suite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Helper builds to run the suite against; empty means the configured build
    #[serde(default)]
    pub variants: Vec<BuildVariant>,
    /// Entries in run order
    pub scenarios: Vec<SuiteEntry>,
}

/// A helper build, named by its debug-info flavour
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildVariant {
    pub name: String,
    /// Replaces the configured compiler flags
    pub cflags: Vec<String>,
}

/// One scenario in a suite
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SuiteEntry {
    /// Scenario id (e.g., "launch-and-catch")
    pub scenario: String,
    /// Do not run; a known defect makes the result meaningless
    pub skip: Option<KnownDefect>,
    /// Run only on these operating systems (`std::env::consts::OS` names)
    #[serde(default)]
    pub only_on: Vec<String>,
    /// Do not run when the helper was built by one of these compiler families
    #[serde(default)]
    pub skip_if_compiler: Vec<String>,
    /// Run, but a failure is expected
    pub expected_failure: Option<KnownDefect>,
}

/// A defect in the debugger under test
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KnownDefect {
    pub reason: String,
    /// Bug tracker reference (e.g., "llvm.org/pr17276")
    pub tracking: Option<String>,
}

impl SuiteEntry {
    pub(crate) fn plain(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            skip: None,
            only_on: Vec::new(),
            skip_if_compiler: Vec::new(),
            expected_failure: None,
        }
    }

    /// Why this entry does not run on `os` with a helper from `compiler`, if
    /// it doesn't. An unknown compiler never matches `skip_if_compiler`.
    pub fn skip_reason(&self, os: &str, compiler: Option<&str>) -> Option<KnownDefect> {
        if let Some(skip) = &self.skip {
            return Some(skip.clone());
        }
        if !self.only_on.is_empty() && !self.only_on.iter().any(|o| o == os) {
            return Some(KnownDefect {
                reason: format!("requires {}", self.only_on.join(" or ")),
                tracking: None,
            });
        }
        if let Some(compiler) = compiler {
            if self.skip_if_compiler.iter().any(|c| c == compiler) {
                return Some(KnownDefect {
                    reason: format!("not supported with {}", compiler),
                    tracking: None,
                });
            }
        }
        None
    }
}

impl Suite {
    /// Every scenario, nothing skipped
    pub fn builtin() -> Self {
        Self {
            name: "inferior-assert".to_string(),
            description: Some("Every scenario with no known-defect annotations".to_string()),
            variants: Vec::new(),
            scenarios: registry::all_scenario_ids()
                .iter()
                .map(|id| SuiteEntry::plain(id))
                .collect(),
        }
    }

    /// Load a suite from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read suite '{}': {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse a suite and check every scenario id exists
    pub fn parse(content: &str) -> Result<Self> {
        let suite: Suite = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse suite: {}", e)))?;

        if let Some(variant) = suite.variants.iter().find(|v| v.cflags.is_empty()) {
            return Err(Error::Config(format!(
                "Build variant '{}' in suite '{}' has no cflags",
                variant.name, suite.name
            )));
        }

        for entry in &suite.scenarios {
            if registry::get_scenario(&entry.scenario).is_none() {
                return Err(Error::Config(format!(
                    "Unknown scenario '{}' in suite '{}'. Known: {}",
                    entry.scenario,
                    suite.name,
                    registry::all_scenario_ids().join(", ")
                )));
            }
        }
        Ok(suite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_skips_nothing() {
        let suite = Suite::builtin();
        assert_eq!(suite.scenarios.len(), registry::all_scenario_ids().len());
        assert!(suite
            .scenarios
            .iter()
            .all(|e| e.skip_reason("linux", None).is_none() && e.expected_failure.is_none()));
    }

    #[test]
    fn test_parse_annotations() {
        let suite = Suite::parse(
            r#"
name: known-defects
scenarios:
  - scenario: launch-and-catch
  - scenario: step-then-assert
    skip:
      reason: backtrace is truncated
      tracking: llvm.org/pr17276
  - scenario: register-read
    only_on: [macos]
  - scenario: disassemble
    expected_failure:
      reason: fails on FreeBSD
"#,
        )
        .unwrap();

        assert_eq!(suite.scenarios.len(), 4);
        assert!(suite.scenarios[0].skip_reason("linux", None).is_none());

        let skip = suite.scenarios[1].skip_reason("macos", None).unwrap();
        assert_eq!(skip.tracking.as_deref(), Some("llvm.org/pr17276"));

        assert_eq!(
            suite.scenarios[2].skip_reason("linux", None).unwrap().reason,
            "requires macos"
        );
        assert!(suite.scenarios[2].skip_reason("macos", None).is_none());

        assert!(suite.scenarios[3].expected_failure.is_some());
        assert!(suite.variants.is_empty());
    }

    #[test]
    fn test_skip_if_compiler() {
        let suite = Suite::parse(
            "name: s\nscenarios:\n  - scenario: disassemble\n    skip_if_compiler: [gcc]\n",
        )
        .unwrap();
        let entry = &suite.scenarios[0];

        assert_eq!(
            entry.skip_reason("linux", Some("gcc")).unwrap().reason,
            "not supported with gcc"
        );
        assert!(entry.skip_reason("linux", Some("clang")).is_none());
        assert!(entry.skip_reason("linux", None).is_none());
    }

    #[test]
    fn test_parse_variants() {
        let suite = Suite::parse(
            r#"
name: debug-info
variants:
  - name: dwarf-4
    cflags: [-g, -gdwarf-4, -O0]
  - name: dwarf-5
    cflags: [-g, -gdwarf-5, -O0]
scenarios:
  - scenario: launch-and-catch
"#,
        )
        .unwrap();

        assert_eq!(suite.variants.len(), 2);
        assert_eq!(suite.variants[1].name, "dwarf-5");
        assert_eq!(suite.variants[1].cflags, vec!["-g", "-gdwarf-5", "-O0"]);
    }

    #[test]
    fn test_variant_without_cflags_rejected() {
        let result = Suite::parse(
            r#"
name: s
variants:
  - {name: bare, cflags: []}
scenarios:
  - scenario: disassemble
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_scenario_rejected() {
        let err = Suite::parse("name: bad\nscenarios:\n  - scenario: no-such-thing\n").unwrap_err();
        assert!(err.to_string().contains("no-such-thing"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Suite::parse(
            r#"
name: bad
scenarios:
  - scenario: disassemble
    skipp: {reason: x}
"#,
        );
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }
}
