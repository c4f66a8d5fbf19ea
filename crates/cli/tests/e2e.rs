//! End-to-end harness runs against a scratch golden directory.

use ddrgate::harness::{self, GoldenStatus, GoldenStore, HarnessError, Scenario};
use ddrgate_engine::{CanonicalInput, compute_hash, verify_contract_hash};

#[test]
fn first_run_records_then_second_run_matches() {
    let dir = tempfile::tempdir().unwrap();
    let store = GoldenStore::new(dir.path(), false);

    for scenario in Scenario::ALL {
        let run = harness::run(scenario, &store).unwrap_or_else(|e| panic!("{scenario}: {e}"));
        assert!(!run.golden.is_empty(), "{scenario}");
        assert!(
            run.golden.values().all(|s| *s == GoldenStatus::Written),
            "{scenario}"
        );
    }

    for scenario in Scenario::ALL {
        let run = harness::run(scenario, &store).unwrap_or_else(|e| panic!("{scenario}: {e}"));
        assert!(
            run.golden.values().all(|s| *s == GoldenStatus::Matched),
            "{scenario}"
        );
    }
}

#[test]
fn corrupted_golden_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = GoldenStore::new(dir.path(), false);
    harness::run(Scenario::HappyPath, &store).unwrap();

    let hash_file = store.scenario_dir(Scenario::HappyPath).join("contract.hash");
    std::fs::write(&hash_file, "sha256:0000").unwrap();

    let err = harness::run(Scenario::HappyPath, &store).unwrap_err();
    assert!(matches!(err, HarnessError::GoldenMismatch { path } if path == hash_file));

    let updated = GoldenStore::new(dir.path(), true);
    harness::run(Scenario::HappyPath, &updated).unwrap();
    harness::run(Scenario::HappyPath, &store).unwrap();
}

#[test]
fn happy_path_golden_hash_covers_the_contract_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = GoldenStore::new(dir.path(), false);
    let run = harness::run(Scenario::HappyPath, &store).unwrap();

    let scenario_dir = store.scenario_dir(Scenario::HappyPath);
    let contract = std::fs::read_to_string(scenario_dir.join("contract.json")).unwrap();
    let hash = std::fs::read_to_string(scenario_dir.join("contract.hash")).unwrap();

    assert!(contract.ends_with('\n'));
    assert_eq!(compute_hash(&contract), hash);
    assert_eq!(run.report.contract_hash.as_deref(), Some(hash.as_str()));
    assert!(verify_contract_hash(CanonicalInput::Text(&contract), &hash).valid);
}

#[test]
fn refusal_only_produces_no_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = GoldenStore::new(dir.path(), false);
    let run = harness::run(Scenario::RefusalOnly, &store).unwrap();

    assert!(run.report.contract_hash.is_none());
    assert!(!run.golden.contains_key("contract.json"));
}
