//! Coverage and reproducibility checks over a batch of case results.

use ddrgate_core::{Finding, ReasonCode, SimulationCaseResult, next_action};
use std::collections::{BTreeMap, HashMap};

/// At least one asserted case passed with a non-refusal output.
pub fn has_asserted_valid_case(results: &[SimulationCaseResult]) -> bool {
    results
        .iter()
        .any(|r| r.assertion_passed == Some(true) && !r.trace.refusal)
}

/// At least one asserted case passed with the refusal output.
pub fn has_asserted_refusal_case(results: &[SimulationCaseResult]) -> bool {
    results
        .iter()
        .any(|r| r.assertion_passed == Some(true) && r.trace.refusal)
}

/// Every case that carried an expectation met it. Exploratory cases are ignored.
pub fn all_asserted_cases_passed(results: &[SimulationCaseResult]) -> bool {
    results
        .iter()
        .filter_map(|r| r.assertion_passed)
        .all(|passed| passed)
}

/// Flag every case whose output differs from an earlier case with identical inputs.
///
/// `input_keys` maps case id to the canonical form of that case's inputs.
pub fn detect_non_reproducible_outputs(
    results: &[SimulationCaseResult],
    input_keys: &BTreeMap<String, String>,
) -> Vec<Finding> {
    let mut first_output: HashMap<&str, &str> = HashMap::new();
    let mut findings = Vec::new();

    for result in results {
        let Some(key) = input_keys.get(&result.case_id) else {
            continue;
        };
        match first_output.get(key.as_str()) {
            None => {
                first_output.insert(key.as_str(), result.output.as_str());
            }
            Some(prior) if *prior != result.output => findings.push(
                Finding::new(
                    ReasonCode::SimulationViolationNonReproducibleTrace,
                    "Identical inputs must yield the same output.",
                    next_action::REMOVE_NONDETERMINISM,
                )
                .at(format!("cases[case_id={}]", result.case_id))
                .target(result.case_id.as_str()),
            ),
            Some(_) => {}
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddrgate_core::Trace;

    fn result(case_id: &str, output: &str, refusal: bool, passed: Option<bool>) -> SimulationCaseResult {
        SimulationCaseResult {
            case_id: case_id.into(),
            output: output.into(),
            trace: Trace {
                contract_version: "1.0.0".into(),
                policy_checks: vec![],
                rule_path: vec![],
                refusal,
                matched_rule: None,
            },
            assertion_passed: passed,
        }
    }

    #[test]
    fn coverage_requires_passing_assertions() {
        let results = vec![
            result("a", "ALLOW", false, Some(false)),
            result("b", "REFUSE", true, None),
        ];
        assert!(!has_asserted_valid_case(&results));
        assert!(!has_asserted_refusal_case(&results));
        assert!(!all_asserted_cases_passed(&results));

        let results = vec![
            result("a", "ALLOW", false, Some(true)),
            result("b", "REFUSE", true, Some(true)),
            result("c", "REFUSE", true, None),
        ];
        assert!(has_asserted_valid_case(&results));
        assert!(has_asserted_refusal_case(&results));
        assert!(all_asserted_cases_passed(&results));
    }

    #[test]
    fn no_assertions_vacuously_pass() {
        assert!(all_asserted_cases_passed(&[]));
    }

    #[test]
    fn differing_outputs_for_same_inputs_are_flagged() {
        let results = vec![
            result("a", "ALLOW", false, None),
            result("b", "ALLOW", false, None),
            result("c", "REFUSE", true, None),
            result("d", "REFUSE", true, None),
        ];
        let keys: BTreeMap<String, String> = [("a", "k"), ("b", "k"), ("c", "k"), ("d", "other")]
            .into_iter()
            .map(|(id, k)| (id.to_string(), k.to_string()))
            .collect();
        let findings = detect_non_reproducible_outputs(&results, &keys);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field_path.as_deref(), Some("cases[case_id=c]"));
        assert_eq!(findings[0].action_target.as_deref(), Some("c"));
    }
}
