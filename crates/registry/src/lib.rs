//! Contract registry: finalized contracts keyed by hash.
//!
//! Holds lineage metadata alongside each contract: an optional parent and
//! an optional contract it supersedes. Lineage lives outside the hashed
//! record, so registering it never changes a contract's identity.
//!
//! Queries are one hop only; the registry never walks lineage chains.

use chrono::{DateTime, Utc};
use ddrgate_core::ContractArtifact;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::{info, warn};

/// Lineage references supplied at finalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRefs {
    #[serde(default)]
    pub parent_hash: Option<String>,
    #[serde(default)]
    pub supersedes: Option<String>,
}

impl LineageRefs {
    /// Blank references count as absent.
    pub fn normalized(&self) -> Self {
        let clean = |r: &Option<String>| {
            r.as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
        };
        Self {
            parent_hash: clean(&self.parent_hash),
            supersedes: clean(&self.supersedes),
        }
    }
}

/// A finalized contract as stored by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContract {
    pub contract_id: String,
    pub contract_hash: String,
    pub finalized_at: DateTime<Utc>,
    pub engine_version: String,
    pub lineage: LineageRefs,
    pub canonical_json: Value,
}

impl StoredContract {
    pub fn from_artifact(
        artifact: &ContractArtifact,
        finalized_at: DateTime<Utc>,
        engine_version: impl Into<String>,
        lineage: LineageRefs,
    ) -> Self {
        Self {
            contract_id: artifact.contract_id.clone(),
            contract_hash: artifact.hash.clone(),
            finalized_at,
            engine_version: engine_version.into(),
            lineage: lineage.normalized(),
            canonical_json: artifact.canonical_json.clone(),
        }
    }
}

/// One-hop lineage view of a stored contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub contract_hash: String,
    pub contract_id: String,
    pub parent_hash: Option<String>,
    pub supersedes: Option<String>,
    pub superseded_by: Option<String>,
    pub finalized_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{field} cannot reference self")]
    SelfReference { field: &'static str },

    #[error("parent_hash references unknown contract: {0}")]
    UnknownParent(String),

    #[error("supersedes references unknown contract: {0}")]
    UnknownSuperseded(String),

    #[error("contract already registered: {0}")]
    AlreadyRegistered(String),
}

#[derive(Debug, Default)]
struct Inner {
    contracts: HashMap<String, StoredContract>,
    /// superseded hash -> superseding hash
    superseded_by: HashMap<String, String>,
}

/// Thread-safe in-memory registry.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    inner: RwLock<Inner>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check lineage references for a contract about to be registered.
    ///
    /// Superseding a contract that is already superseded is allowed.
    pub fn validate_lineage(
        &self,
        parent_hash: Option<&str>,
        supersedes: Option<&str>,
        new_hash: &str,
    ) -> Result<(), RegistryError> {
        if parent_hash == Some(new_hash) {
            return Err(RegistryError::SelfReference {
                field: "parent_hash",
            });
        }
        if supersedes == Some(new_hash) {
            return Err(RegistryError::SelfReference {
                field: "supersedes",
            });
        }

        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = parent_hash
            && !inner.contracts.contains_key(parent)
        {
            return Err(RegistryError::UnknownParent(parent.to_string()));
        }

        if let Some(target) = supersedes {
            if !inner.contracts.contains_key(target) {
                return Err(RegistryError::UnknownSuperseded(target.to_string()));
            }
            if let Some(existing) = inner.superseded_by.get(target) {
                warn!(
                    contract = %target,
                    superseded_by = %existing,
                    "Contract is already superseded"
                );
            }
        }

        Ok(())
    }

    /// Store a contract. Lineage should be validated first.
    pub fn register(&self, contract: StoredContract) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.contracts.contains_key(&contract.contract_hash) {
            return Err(RegistryError::AlreadyRegistered(contract.contract_hash));
        }

        if let Some(target) = &contract.lineage.supersedes {
            inner
                .superseded_by
                .insert(target.clone(), contract.contract_hash.clone());
        }

        info!(
            contract = %contract.contract_id,
            hash = %contract.contract_hash,
            "Registered contract"
        );
        inner
            .contracts
            .insert(contract.contract_hash.clone(), contract);
        Ok(())
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.read().contracts.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<StoredContract> {
        self.read().contracts.get(hash).cloned()
    }

    pub fn is_superseded(&self, hash: &str) -> bool {
        self.read().superseded_by.contains_key(hash)
    }

    pub fn superseding_hash(&self, hash: &str) -> Option<String> {
        self.read().superseded_by.get(hash).cloned()
    }

    pub fn lineage(&self, hash: &str) -> Option<Lineage> {
        let inner = self.read();
        let contract = inner.contracts.get(hash)?;
        Some(Lineage {
            contract_hash: contract.contract_hash.clone(),
            contract_id: contract.contract_id.clone(),
            parent_hash: contract.lineage.parent_hash.clone(),
            supersedes: contract.lineage.supersedes.clone(),
            superseded_by: inner.superseded_by.get(hash).cloned(),
            finalized_at: contract.finalized_at,
        })
    }

    pub fn count(&self) -> usize {
        self.read().contracts.len()
    }

    /// All contracts, oldest first.
    pub fn all(&self) -> Vec<StoredContract> {
        let mut contracts: Vec<StoredContract> = self.read().contracts.values().cloned().collect();
        contracts.sort_by(|a, b| {
            a.finalized_at
                .cmp(&b.finalized_at)
                .then_with(|| a.contract_hash.cmp(&b.contract_hash))
        });
        contracts
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}
