use syncers::SyncError;
use thiserror::Error;
use translate::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Sync Error: {0}")]
    SyncError(#[from] SyncError),

    #[error("Finalizer Error: {0}")]
    // NB: awkward type because finalizer::Error embeds the reconciler error (which is this)
    // so boxing this error to break cycles
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }

    /// Whether requeueing can resolve this failure without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::KubeError(_) => true,
            Error::ConfigError(_) => false,
            Error::SyncError(e) => e.is_retryable(),
            Error::FinalizerError(e) => match e.as_ref() {
                kube::runtime::finalizer::Error::ApplyFailed(e)
                | kube::runtime::finalizer::Error::CleanupFailed(e) => e.is_retryable(),
                _ => true,
            },
        }
    }
}

/// Expose all controller components used by main
pub mod controller;
pub use crate::controller::*;
pub mod provenance;
pub mod syncers;
pub mod translate;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;
