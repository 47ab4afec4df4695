//! Pipeline integration protocol
//!
//! Drives one build invocation through
//! `Scanning → Registering → AwaitingHostCompletion → Resolving →
//! PassthroughProcessing? → Done`.
//!
//! # Critical Invariant
//!
//! Registration happens only in host phases that accept it, resolution only
//! once the host has finalized its units, and every registration completes
//! before any resolution. Breaking either rule is fatal for the build step.
//! Failures tied to a single record are logged and isolated.

use crate::error::IntegrationError;
use crate::host::HostPipeline;
use crate::mode::ProcessingMode;
use crate::phase::{ensure_phase, validate_transition, HostOperation, IntegrationState};
use crate::record::ReferenceRecord;
use crate::virtual_unit::VirtualUnitProvider;

/// Per-invocation integration state machine
#[derive(Debug)]
pub struct PipelineIntegrator {
    mode: ProcessingMode,
    state: IntegrationState,
    records: Vec<ReferenceRecord>,
}

impl PipelineIntegrator {
    #[must_use]
    pub fn new(mode: ProcessingMode) -> Self {
        Self {
            mode,
            state: IntegrationState::Scanning,
            records: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> IntegrationState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> &ProcessingMode {
        &self.mode
    }

    #[inline]
    #[must_use]
    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    /// Records with a final location
    pub fn finalized(&self) -> impl Iterator<Item = &ReferenceRecord> {
        self.records.iter().filter(|r| r.is_finalized())
    }

    /// Register every discovered record with the host.
    ///
    /// Delegated mode registers each script as a compiled unit named after
    /// its file stem; caller-transform mode defers all records to
    /// passthrough processing.
    ///
    /// # Errors
    /// - [`IntegrationError::IllegalTransition`] if called twice
    /// - [`IntegrationError::PhaseViolation`] outside a registration phase
    pub fn register(
        &mut self,
        records: Vec<ReferenceRecord>,
        host: &dyn HostPipeline,
    ) -> Result<usize, IntegrationError> {
        validate_transition(self.state, IntegrationState::Registering)?;
        ensure_phase(host.phase(), HostOperation::RegisterUnit)?;
        self.state = IntegrationState::Registering;
        self.records = records;

        let mut registered = 0;
        if self.mode.is_delegated() {
            for record in &mut self.records {
                let id = VirtualUnitProvider::identifier_for(record.resolved_path());
                let name = record.logical_name();
                match host.register_compiled_unit(&id, &name) {
                    Ok(unit) => {
                        tracing::debug!(reference = record.original_path(), %unit, "registered compiled unit");
                        record.assign_unit(unit);
                        registered += 1;
                    }
                    Err(e) => {
                        let err = IntegrationError::host(record.original_path(), e);
                        if err.is_fatal() {
                            return Err(err);
                        }
                        host.error(&err.to_string());
                    }
                }
            }
        }

        self.transition(IntegrationState::AwaitingHostCompletion)?;
        tracing::info!(
            discovered = self.records.len(),
            registered,
            mode = ?self.mode,
            "registration complete"
        );
        Ok(registered)
    }

    /// Fetch final output paths for registered units.
    ///
    /// Records that already have a final location are skipped, so repeated
    /// calls are harmless.
    ///
    /// # Errors
    /// - [`IntegrationError::IllegalTransition`] before registration
    /// - [`IntegrationError::PhaseViolation`] before the host finalized units
    pub fn resolve(&mut self, host: &dyn HostPipeline) -> Result<usize, IntegrationError> {
        validate_transition(self.state, IntegrationState::Resolving)?;
        ensure_phase(host.phase(), HostOperation::QueryFinalPath)?;
        self.state = IntegrationState::Resolving;

        let mut resolved = 0;
        for record in &mut self.records {
            if record.is_finalized() {
                continue;
            }
            let Some(unit) = record.unit_id().cloned() else {
                continue;
            };
            match host.final_output_path_of(&unit) {
                Ok(location) => {
                    tracing::debug!(reference = record.original_path(), %location, "resolved compiled unit");
                    record.assign_final_location(location);
                    resolved += 1;
                }
                Err(e) => {
                    let err = IntegrationError::host(record.original_path(), e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    host.error(&err.to_string());
                }
            }
        }
        Ok(resolved)
    }

    /// Run caller-supplied transforms for records still lacking a final
    /// location and emit the results as final artifacts.
    ///
    /// A failing transform falls back to the raw content with a warning.
    /// No-op in delegated mode, and once every record is finalized.
    ///
    /// # Errors
    /// - [`IntegrationError::IllegalTransition`] unless called after
    ///   [`resolve`](Self::resolve)
    /// - [`IntegrationError::PhaseViolation`] if the host no longer accepts
    ///   emissions
    pub async fn process_passthrough(
        &mut self,
        host: &dyn HostPipeline,
    ) -> Result<usize, IntegrationError> {
        let ProcessingMode::CallerTransform(transform) = self.mode.clone() else {
            return Ok(0);
        };
        if self.records.iter().all(ReferenceRecord::is_finalized) {
            self.transition(IntegrationState::PassthroughProcessing)?;
            return Ok(0);
        }
        validate_transition(self.state, IntegrationState::PassthroughProcessing)?;
        ensure_phase(host.phase(), HostOperation::EmitArtifact)?;
        ensure_phase(host.phase(), HostOperation::QueryFinalPath)?;
        self.state = IntegrationState::PassthroughProcessing;

        let config = host.resolved_config();
        let mut emitted = 0;
        for record in self.records.iter_mut().filter(|r| !r.is_finalized()) {
            let raw = match tokio::fs::read_to_string(record.resolved_path()).await {
                Ok(raw) => raw,
                Err(e) => {
                    host.error(&format!(
                        "failed to read script {}: {e}",
                        record.resolved_path().display()
                    ));
                    continue;
                }
            };

            let content = match transform.transform(&raw, config).await {
                Ok(content) => content,
                Err(e) => {
                    host.warn(&format!(
                        "transform failed for {}, emitting untransformed content: {e}",
                        record.original_path()
                    ));
                    raw
                }
            };

            let location = host
                .emit_final_artifact(&record.file_name(), content.as_bytes())
                .and_then(|artifact| host.final_output_path_of(&artifact));
            match location {
                Ok(location) => {
                    tracing::debug!(reference = record.original_path(), %location, "emitted passthrough artifact");
                    record.assign_final_location(location);
                    emitted += 1;
                }
                Err(e) => {
                    let err = IntegrationError::host(record.original_path(), e);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    host.error(&err.to_string());
                }
            }
        }
        Ok(emitted)
    }

    /// Resolve, run passthrough processing when applicable, and finish.
    ///
    /// # Errors
    /// Any fatal error from [`resolve`](Self::resolve) or
    /// [`process_passthrough`](Self::process_passthrough).
    pub async fn finalize(&mut self, host: &dyn HostPipeline) -> Result<usize, IntegrationError> {
        let mut finalized = self.resolve(host)?;
        finalized += self.process_passthrough(host).await?;
        self.transition(IntegrationState::Done)?;
        tracing::info!(
            finalized,
            total = self.records.len(),
            "integration finished"
        );
        Ok(finalized)
    }

    fn transition(&mut self, to: IntegrationState) -> Result<(), IntegrationError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}
