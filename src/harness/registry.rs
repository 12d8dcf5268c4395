//! Scenario registry
//!
//! Lists every scenario in default run order and maps ids to runners.

use std::sync::Arc;

use super::scenario::{Scenario, ScenarioInfo};
use super::scenarios;

/// Scenario ids in default run order
static SCENARIO_IDS: &[&str] = &[
    "launch-and-catch",
    "launch-and-catch-api",
    "register-read",
    "disassemble",
    "expression-evaluation",
    "step-then-assert",
];

/// Get all scenario ids in default run order
pub fn all_scenario_ids() -> &'static [&'static str] {
    SCENARIO_IDS
}

/// Get a runner for a scenario
pub fn get_scenario(id: &str) -> Option<Arc<dyn Scenario>> {
    use scenarios::*;

    match id {
        "launch-and-catch" => Some(Arc::new(catch::LaunchAndCatch)),
        "launch-and-catch-api" => Some(Arc::new(catch::LaunchAndCatchApi)),
        "register-read" => Some(Arc::new(registers::RegisterRead)),
        "disassemble" => Some(Arc::new(disassemble::Disassemble)),
        "expression-evaluation" => Some(Arc::new(expression::ExpressionEvaluation)),
        "step-then-assert" => Some(Arc::new(step::StepThenAssert)),
        _ => None,
    }
}

/// Metadata for every scenario, in default run order
pub fn all_scenarios() -> Vec<ScenarioInfo> {
    SCENARIO_IDS
        .iter()
        .filter_map(|id| get_scenario(id))
        .map(|s| s.info().clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_has_a_runner() {
        for id in all_scenario_ids() {
            let scenario = get_scenario(id).unwrap();
            assert_eq!(scenario.info().id, *id);
        }
        assert_eq!(all_scenarios().len(), all_scenario_ids().len());
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(get_scenario("nonexistent").is_none());
    }
}
