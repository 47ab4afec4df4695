//! Virtual compiled units
//!
//! A script on disk is registered with the host under a sentinel-prefixed
//! identifier. The host hands that identifier back to [`VirtualUnitProvider`]
//! through its resolve and load hooks, which recover the filesystem path and
//! supply the file content as the unit's source.

use crate::host::HostPipeline;
use std::path::{Path, PathBuf};

/// Prefix marking identifiers this provider owns.
///
/// NUL cannot appear in a real path, so the prefix never collides with a
/// filesystem-backed module. Hosts also treat NUL-prefixed ids as internal.
pub const SENTINEL: &str = "\0scriptweave:";

/// Resolve/load hooks for sentinel-prefixed units
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualUnitProvider;

impl VirtualUnitProvider {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Identifier under which `path` is registered with the host
    #[must_use]
    pub fn identifier_for(path: &Path) -> String {
        format!("{SENTINEL}{}", path.display())
    }

    #[inline]
    #[must_use]
    pub fn is_virtual(id: &str) -> bool {
        id.starts_with(SENTINEL)
    }

    /// Filesystem path behind a virtual identifier
    #[must_use]
    pub fn source_path(id: &str) -> Option<PathBuf> {
        id.strip_prefix(SENTINEL)
            .filter(|rest| !rest.is_empty())
            .map(PathBuf::from)
    }

    /// Claim identifiers carrying the sentinel; decline everything else so
    /// the host's normal resolution continues.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<String> {
        Self::is_virtual(id).then(|| id.to_string())
    }

    /// Supply the content of a virtual unit.
    ///
    /// Read failures are reported through the host and yield `None`; the
    /// host then treats the unit as failed without affecting others.
    pub async fn load(&self, id: &str, host: &dyn HostPipeline) -> Option<String> {
        let path = Self::source_path(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::debug!(path = %path.display(), bytes = content.len(), "loaded virtual unit");
                Some(content)
            }
            Err(e) => {
                host.error(&format!("failed to load script {}: {e}", path.display()));
                None
            }
        }
    }
}
