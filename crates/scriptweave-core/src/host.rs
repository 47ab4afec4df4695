//! Host pipeline boundary
//!
//! The host owns transformation, hashing and output placement. This crate
//! only talks to it through [`HostPipeline`], and the host calls back through
//! [`BuildPlugin`](crate::plugin::BuildPlugin).

use crate::error::HostError;
use crate::phase::HostPhase;
use crate::record::UnitId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host configuration as resolved for the current build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Project root; root-relative references resolve against it
    pub root: PathBuf,
    /// Directory outputs are written to
    pub out_dir: PathBuf,
    /// Subdirectory of `out_dir` holding hashed assets
    pub assets_dir: String,
    /// Whether the host minifies its outputs
    pub minify: bool,
}

impl ResolvedConfig {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            assets_dir: "assets".to_string(),
            minify: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }
}

/// Operations a staged build host exposes to plugins.
///
/// Registration and path queries are synchronous request/response calls that
/// are only legal in particular [`HostPhase`]s. Implementations must reject
/// illegal calls with [`HostError::IllegalPhase`].
pub trait HostPipeline: Send + Sync {
    /// Current lifecycle phase
    fn phase(&self) -> HostPhase;

    /// Host configuration for this build
    fn resolved_config(&self) -> &ResolvedConfig;

    /// Declare `source_id` as a compiled unit named `name`.
    ///
    /// The host appends the extension and a content hash to `name`.
    fn register_compiled_unit(&self, source_id: &str, name: &str) -> Result<UnitId, HostError>;

    /// Final output path of a unit or emitted artifact, relative to the
    /// output root.
    fn final_output_path_of(&self, id: &UnitId) -> Result<String, HostError>;

    /// Add `content` to the output as-is under a host-chosen name derived
    /// from `name`.
    fn emit_final_artifact(&self, name: &str, content: &[u8]) -> Result<UnitId, HostError>;

    /// Non-fatal diagnostic
    fn warn(&self, message: &str) {
        tracing::warn!(target: "scriptweave", "{message}");
    }

    /// Non-fatal error diagnostic
    fn error(&self, message: &str) {
        tracing::error!(target: "scriptweave", "{message}");
    }
}
