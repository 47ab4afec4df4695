//! Error types for scriptweave
//!
//! Split by concern:
//! - Scan operations (document → references)
//! - Host calls and the integration protocol
//! - Document rewriting (references → output document)
//! - Configuration loading

use crate::phase::{HostOperation, HostPhase, IntegrationState};
use crate::record::UnitId;
use std::path::PathBuf;
use std::sync::Arc;

/// Errors while discovering references
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Document could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reference points at a file outside the script extension set
    #[error("'{reference}' does not name a script ({path})")]
    DisallowedExtension { reference: String, path: PathBuf },
}

/// Errors reported by a host pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Operation called outside the phases that permit it
    #[error("{operation} is not permitted during the {phase} phase")]
    IllegalPhase {
        operation: HostOperation,
        phase: HostPhase,
    },

    /// Handle was never issued by this host
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// Unit produced no output
    #[error("unit {0} produced no output")]
    UnitFailed(UnitId),

    /// Host-specific failure
    #[error("host error: {0}")]
    Other(String),
}

/// Misuse of a [`ReferenceRecord`](crate::record::ReferenceRecord)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Final location read before the host finalized the unit
    #[error("final location of '{0}' read before the host finalized it")]
    NotFinalized(String),
}

/// Failure of a caller-supplied transform
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("transform failed: {0}")]
    Failed(String),

    #[error("transform io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Create failure from any message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors in the registration/resolution protocol
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    /// Host call attempted in a phase that forbids it
    #[error("{operation} attempted during host phase {phase}")]
    PhaseViolation {
        operation: HostOperation,
        phase: HostPhase,
    },

    /// Protocol step taken out of order
    #[error("illegal integration transition: {from} -> {to}")]
    IllegalTransition {
        from: IntegrationState,
        to: IntegrationState,
    },

    /// A hook ran without a preceding `build_start`
    #[error("{0} called before build_start")]
    NotStarted(&'static str),

    /// Host rejected a call for one record
    #[error("host rejected '{reference}': {source}")]
    Host {
        reference: String,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl IntegrationError {
    /// Ordering violations mean host results cannot be trusted; the whole
    /// build step must abort.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::PhaseViolation { .. }
            | Self::IllegalTransition { .. }
            | Self::NotStarted(_)
            | Self::Record(_) => true,
            Self::Host { source, .. } => matches!(source, HostError::IllegalPhase { .. }),
        }
    }

    pub(crate) fn host(reference: impl Into<String>, source: HostError) -> Self {
        match source {
            HostError::IllegalPhase { operation, phase } => {
                Self::PhaseViolation { operation, phase }
            }
            source => Self::Host {
                reference: reference.into(),
                source,
            },
        }
    }
}

/// Errors while rewriting the output document
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Output document could not be read
    #[error("io error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output document could not be replaced
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Combined scriptweave error
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for scriptweave operations
pub type WeaveResult<T> = Result<T, WeaveError>;
