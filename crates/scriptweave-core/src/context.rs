//! Per-invocation build state
//!
//! Everything one build touches lives here: the scanner with its document
//! cache and the integrator with its records. A new context is created for
//! every `build_start`, so nothing leaks between invocations.

use crate::error::IntegrationError;
use crate::host::HostPipeline;
use crate::integrator::PipelineIntegrator;
use crate::mode::ProcessingMode;
use crate::phase::IntegrationState;
use crate::record::ReferenceRecord;
use crate::scanner::ReferenceScanner;
use std::path::{Path, PathBuf};

/// State for a single build invocation
#[derive(Debug)]
pub struct BuildContext {
    scanner: ReferenceScanner,
    integrator: PipelineIntegrator,
    document: PathBuf,
}

impl BuildContext {
    /// Context for `document` (relative to the scanner's root)
    #[must_use]
    pub fn new(scanner: ReferenceScanner, document: impl AsRef<Path>, mode: ProcessingMode) -> Self {
        let document = scanner.root().join(document);
        Self {
            scanner,
            integrator: PipelineIntegrator::new(mode),
            document,
        }
    }

    /// Absolute path of the source document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Path {
        &self.document
    }

    #[inline]
    #[must_use]
    pub fn scanner(&self) -> &ReferenceScanner {
        &self.scanner
    }

    #[inline]
    #[must_use]
    pub fn integrator(&self) -> &PipelineIntegrator {
        &self.integrator
    }

    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ReferenceRecord] {
        self.integrator.records()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> IntegrationState {
        self.integrator.state()
    }

    /// Scan the source document and register what was found
    ///
    /// # Errors
    /// Fatal integration errors from registration.
    pub async fn discover_and_register(
        &mut self,
        host: &dyn HostPipeline,
    ) -> Result<usize, IntegrationError> {
        let records = self.scanner.scan(&self.document).await;
        self.integrator.register(records, host)
    }

    /// Resolve every record's final location
    ///
    /// # Errors
    /// Fatal integration errors from resolution or passthrough processing.
    pub async fn finalize(&mut self, host: &dyn HostPipeline) -> Result<usize, IntegrationError> {
        self.integrator.finalize(host).await
    }
}
