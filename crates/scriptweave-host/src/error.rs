//! Error types for the reference host

use scriptweave_core::{HostPhase, WeaveError};
use std::path::PathBuf;

/// Errors that stop a host build
#[derive(Debug, thiserror::Error)]
pub enum HostBuildError {
    /// Lifecycle stepped backwards or skipped past the end
    #[error("illegal lifecycle step: {from} -> {to}")]
    Lifecycle { from: HostPhase, to: HostPhase },

    /// A plugin hook returned an error
    #[error("plugin hook {hook} failed: {source}")]
    Plugin {
        hook: &'static str,
        #[source]
        source: WeaveError,
    },

    /// Output could not be written
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HostBuildError {
    pub(crate) fn plugin(hook: &'static str) -> impl FnOnce(WeaveError) -> Self {
        move |source| Self::Plugin { hook, source }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
