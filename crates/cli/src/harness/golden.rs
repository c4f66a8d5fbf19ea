//! Golden files: the recorded outputs every later harness run must reproduce.

use super::{HarnessError, Scenario};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What happened to one golden file during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenStatus {
    /// Written fresh (first run, or `--update`).
    Written,
    /// Present and byte-identical to this run's output.
    Matched,
}

/// A directory of golden files, one subdirectory per scenario.
#[derive(Debug, Clone)]
pub struct GoldenStore {
    root: PathBuf,
    update: bool,
}

impl GoldenStore {
    pub fn new(root: impl Into<PathBuf>, update: bool) -> Self {
        Self {
            root: root.into(),
            update,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scenario_dir(&self, scenario: Scenario) -> PathBuf {
        self.root.join(scenario.as_str())
    }

    /// Compare `outputs` against the stored files, writing any that are
    /// missing (or all of them when updating).
    pub fn sync(
        &self,
        scenario: Scenario,
        outputs: &BTreeMap<String, Vec<u8>>,
    ) -> Result<BTreeMap<String, GoldenStatus>, HarnessError> {
        let dir = self.scenario_dir(scenario);
        let mut statuses = BTreeMap::new();

        for (name, contents) in outputs {
            let path = dir.join(name);
            let status = if self.update || !path.exists() {
                std::fs::create_dir_all(&dir).map_err(|source| HarnessError::Io {
                    path: dir.clone(),
                    source,
                })?;
                std::fs::write(&path, contents).map_err(|source| HarnessError::Io {
                    path: path.clone(),
                    source,
                })?;
                info!(file = %path.display(), "Golden file written");
                GoldenStatus::Written
            } else {
                let stored = std::fs::read(&path).map_err(|source| HarnessError::Io {
                    path: path.clone(),
                    source,
                })?;
                if &stored != contents {
                    return Err(HarnessError::GoldenMismatch { path });
                }
                debug!(file = %path.display(), "Golden file matched");
                GoldenStatus::Matched
            };
            statuses.insert(name.clone(), status);
        }

        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(contents: &str) -> BTreeMap<String, Vec<u8>> {
        [("contract.hash".to_string(), contents.as_bytes().to_vec())].into()
    }

    #[test]
    fn writes_when_absent_then_matches() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(dir.path(), false);

        let first = store.sync(Scenario::HappyPath, &outputs("sha256:aa")).unwrap();
        assert_eq!(first["contract.hash"], GoldenStatus::Written);
        assert!(dir.path().join("happy-path").join("contract.hash").exists());

        let second = store.sync(Scenario::HappyPath, &outputs("sha256:aa")).unwrap();
        assert_eq!(second["contract.hash"], GoldenStatus::Matched);
    }

    #[test]
    fn drift_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(dir.path(), false);
        store.sync(Scenario::HappyPath, &outputs("sha256:aa")).unwrap();

        let err = store
            .sync(Scenario::HappyPath, &outputs("sha256:bb"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::GoldenMismatch { .. }));
    }

    #[test]
    fn update_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        GoldenStore::new(dir.path(), false)
            .sync(Scenario::BlockedPath, &outputs("old"))
            .unwrap();

        let store = GoldenStore::new(dir.path(), true);
        let statuses = store.sync(Scenario::BlockedPath, &outputs("new")).unwrap();
        assert_eq!(statuses["contract.hash"], GoldenStatus::Written);
        let stored =
            std::fs::read_to_string(dir.path().join("blocked-path").join("contract.hash")).unwrap();
        assert_eq!(stored, "new");
    }
}
