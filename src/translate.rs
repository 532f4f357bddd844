use sha2::{Digest, Sha256};
use thiserror::Error;

/// Longest object name accepted by the host API for the mirrored kinds
/// (DNS-1123 label limit).
const MAX_NAME_LENGTH: usize = 63;

/// Hex characters of the identity digest kept in every translated name.
const DIGEST_LENGTH: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("virtual cluster name is not set")]
    MissingVClusterName,

    #[error("target namespace is not set")]
    MissingTargetNamespace,
}

/// Deterministic mapping from virtual object identity to host object names.
///
/// One instance serves exactly one virtual cluster and is shared read-only
/// between all syncer tasks. A process serving several virtual clusters
/// constructs one translator per identity.
#[derive(Clone, Debug)]
pub struct Translator {
    vcluster_name: String,
    target_namespace: String,
}

impl Translator {
    pub fn new(vcluster_name: &str, target_namespace: &str) -> Result<Self, ConfigError> {
        if vcluster_name.is_empty() {
            return Err(ConfigError::MissingVClusterName);
        }
        if target_namespace.is_empty() {
            return Err(ConfigError::MissingTargetNamespace);
        }

        Ok(Self {
            vcluster_name: vcluster_name.to_string(),
            target_namespace: target_namespace.to_string(),
        })
    }

    pub fn vcluster_name(&self) -> &str {
        &self.vcluster_name
    }

    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// Host name for a namespaced virtual object.
    pub fn physical_name(&self, name: &str, namespace: &str) -> String {
        safe_concat(&[name, "x", namespace, "x", &self.vcluster_name])
    }

    /// Host name for a cluster-scoped virtual object.
    pub fn physical_name_cluster_scoped(&self, name: &str) -> String {
        safe_concat(&[
            "vcluster",
            name,
            "x",
            &self.target_namespace,
            "x",
            &self.vcluster_name,
        ])
    }
}

/// Joined readable prefix plus a digest of the length-prefixed parts.
///
/// The digest is always appended: distinct identity tuples stay distinct
/// even when the readable prefix truncates, or when the plain join would be
/// ambiguous (`["a-x-b", "c"]` vs `["a", "b-x-c"]`). Two tuples map to the
/// same name only on a collision of the truncated digest (40 bits).
fn safe_concat(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    let digest: String = hasher
        .finalize()
        .iter()
        .take(DIGEST_LENGTH / 2)
        .map(|b| format!("{b:02x}"))
        .collect();

    let mut readable = parts.join("-");
    readable.truncate(MAX_NAME_LENGTH - DIGEST_LENGTH - 1);
    while readable.ends_with('-') {
        readable.pop();
    }

    format!("{readable}-{digest}")
}
