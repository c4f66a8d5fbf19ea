//! `ddrgate harness`: Run a scenario against frozen fixtures and golden files.

use ddrgate::harness::{self, GoldenStatus, GoldenStore, Scenario};
use ddrgate_config::AppConfig;
use std::path::PathBuf;

pub async fn run(
    scenario: Scenario,
    golden_dir: Option<PathBuf>,
    update: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let golden_dir = match golden_dir {
        Some(dir) => dir,
        None => AppConfig::load()?.harness.golden_dir,
    };
    let store = GoldenStore::new(golden_dir, update);

    println!("ddrgate harness: {scenario}");
    println!("   Golden dir: {}", store.scenario_dir(scenario).display());

    let run = harness::run(scenario, &store)?;

    for (file, status) in &run.golden {
        let label = match status {
            GoldenStatus::Written => "written",
            GoldenStatus::Matched => "matched",
        };
        println!("   {label:>8}  {file}");
    }
    if let (Some(id), Some(hash)) = (&run.report.contract_id, &run.report.contract_hash) {
        println!("\n   Contract: {id}");
        println!("   Hash:     {hash}");
    }
    println!("\n   ✓ {scenario} passed, determinism verified\n");

    Ok(())
}
