//! Reference records
//!
//! One [`ReferenceRecord`] per distinct script reference found in a document.
//! A record starts with only its paths known; the integrator later attaches a
//! host [`UnitId`] and, once the host has finalized output names, the final
//! content-addressed location.

use crate::error::RecordError;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Opaque handle issued by a host for a compiled unit or emitted artifact
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Wrap a host-issued handle
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A script reference discovered in a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    original_path: String,
    resolved_path: PathBuf,
    unit_id: Option<UnitId>,
    final_location: Option<String>,
}

impl ReferenceRecord {
    /// Create an unregistered record
    #[must_use]
    pub fn new(original_path: impl Into<String>, resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            resolved_path: resolved_path.into(),
            unit_id: None,
            final_location: None,
        }
    }

    /// Reference text exactly as written in the document
    #[inline]
    #[must_use]
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    /// Absolute filesystem location
    #[inline]
    #[must_use]
    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    #[inline]
    #[must_use]
    pub fn unit_id(&self) -> Option<&UnitId> {
        self.unit_id.as_ref()
    }

    /// Whether the host has assigned a final location
    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.final_location.is_some()
    }

    /// Host-assigned output location, relative to the output root.
    ///
    /// # Errors
    /// [`RecordError::NotFinalized`] before the host finalized the record.
    /// Under `strict-debug` this panics instead.
    pub fn final_location(&self) -> Result<&str, RecordError> {
        match &self.final_location {
            Some(location) => Ok(location),
            None => {
                #[cfg(feature = "strict-debug")]
                panic!("final location of '{}' read before finalization", self.original_path);

                #[cfg(not(feature = "strict-debug"))]
                Err(RecordError::NotFinalized(self.original_path.clone()))
            }
        }
    }

    /// Logical unit name: file stem without extension
    #[must_use]
    pub fn logical_name(&self) -> String {
        self.resolved_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string())
    }

    /// File name including extension
    #[must_use]
    pub fn file_name(&self) -> String {
        self.resolved_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script.js".to_string())
    }

    pub(crate) fn assign_unit(&mut self, id: UnitId) {
        self.unit_id = Some(id);
    }

    /// Passthrough records finalize without ever holding a unit id.
    pub(crate) fn assign_final_location(&mut self, location: impl Into<String>) {
        debug_assert!(self.final_location.is_none(), "record finalized twice");
        self.final_location = Some(location.into());
    }
}
