use std::sync::Arc;

use kube::Client;
use thiserror::Error;

use crate::translate::Translator;

use self::engine::{KubeStore, SyncEngine, SyncedResource};

/// Typed failures of a single sync attempt.
///
/// The engine performs no retries of its own; `is_retryable` tells the
/// reconcile loop which failures are worth requeueing without operator
/// intervention.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("virtual object has no name")]
    MissingName,

    #[error("host object {name} already exists and is not managed by this virtual cluster")]
    NamingCollision { name: String },

    #[error("host object {name} is not managed by this virtual cluster")]
    ForeignObject { name: String },

    #[error("host lookup error: {0}")]
    Lookup(#[source] kube::Error),

    #[error("host create error: {0}")]
    Create(#[source] kube::Error),

    #[error("host update error: {0}")]
    Update(#[source] kube::Error),

    #[error("host delete error: {0}")]
    Delete(#[source] kube::Error),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Lookup(_) | Self::Create(_) | Self::Update(_) | Self::Delete(_)
        )
    }
}

/// Dependencies handed to each per-kind syncer constructor.
#[derive(Clone)]
pub struct RegisterContext {
    pub host: Client,
    pub translator: Arc<Translator>,
}

impl RegisterContext {
    /// Construct the engine for a registered kind.
    pub fn syncer<K: SyncedResource>(&self) -> SyncEngine<K> {
        let api = K::host_api(self.host.clone(), self.translator.target_namespace());
        SyncEngine::new(self.translator.clone(), KubeStore::new(api))
    }
}

pub mod engine;

pub mod config_map;
pub mod priority_class;
pub mod storage_class;

#[cfg(test)]
pub mod testing;
