//! Host lifecycle phases and the integrator's own state machine
//!
//! Two clocks run during a build:
//! - [`HostPhase`]: where the host pipeline is in its hook lifecycle
//! - [`IntegrationState`]: where this crate is in its own protocol
//!
//! Registration and resolution are legal only in specific host phases, and
//! the integrator only moves between states listed in
//! [`allowed_transitions`].

use crate::error::IntegrationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Lifecycle stage of the host pipeline.
///
/// Phases are strictly ordered; a host only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPhase {
    /// Options resolved, no build running yet
    Setup,
    /// Build started; plugins may declare new compiled units
    BuildStart,
    /// Units are being resolved, loaded and transformed
    Transform,
    /// All units loaded
    BuildEnd,
    /// Output generation begins, file names are being assigned
    RenderStart,
    /// Output names are final and the bundle may be inspected
    GenerateBundle,
    /// Outputs are being written to disk
    WriteBundle,
    /// Build finished
    CloseBundle,
}

impl HostPhase {
    /// Every phase, in lifecycle order
    pub const ALL: [HostPhase; 8] = [
        HostPhase::Setup,
        HostPhase::BuildStart,
        HostPhase::Transform,
        HostPhase::BuildEnd,
        HostPhase::RenderStart,
        HostPhase::GenerateBundle,
        HostPhase::WriteBundle,
        HostPhase::CloseBundle,
    ];

    /// New compiled units may be declared
    #[inline]
    #[must_use]
    pub const fn accepts_registration(self) -> bool {
        matches!(self, HostPhase::BuildStart | HostPhase::Transform)
    }

    /// Compiled units have final output names
    #[inline]
    #[must_use]
    pub fn units_finalized(self) -> bool {
        self >= HostPhase::GenerateBundle
    }

    /// Final (non-processed) artifacts may still be added to the output
    #[inline]
    #[must_use]
    pub fn accepts_emission(self) -> bool {
        (HostPhase::BuildStart..=HostPhase::GenerateBundle).contains(&self)
    }

    /// Whether `operation` is legal in this phase
    #[must_use]
    pub fn permits(self, operation: HostOperation) -> bool {
        match operation {
            HostOperation::RegisterUnit => self.accepts_registration(),
            HostOperation::QueryFinalPath => self.units_finalized(),
            HostOperation::EmitArtifact => self.accepts_emission(),
        }
    }

    /// The phase that follows this one
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let index = Self::ALL.iter().position(|p| *p == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Hook-style name of the phase
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HostPhase::Setup => "setup",
            HostPhase::BuildStart => "build_start",
            HostPhase::Transform => "transform",
            HostPhase::BuildEnd => "build_end",
            HostPhase::RenderStart => "render_start",
            HostPhase::GenerateBundle => "generate_bundle",
            HostPhase::WriteBundle => "write_bundle",
            HostPhase::CloseBundle => "close_bundle",
        }
    }
}

impl Display for HostPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host calls whose legality depends on the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    /// `register_compiled_unit`
    RegisterUnit,
    /// `final_output_path_of`
    QueryFinalPath,
    /// `emit_final_artifact`
    EmitArtifact,
}

impl Display for HostOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HostOperation::RegisterUnit => "compiled unit registration",
            HostOperation::QueryFinalPath => "final output path query",
            HostOperation::EmitArtifact => "final artifact emission",
        })
    }
}

/// Protocol state of a single build invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationState {
    Scanning,
    Registering,
    AwaitingHostCompletion,
    Resolving,
    PassthroughProcessing,
    Done,
}

impl Display for IntegrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Validates an integrator state transition.
///
/// Illegal transitions are programming errors. They are returned as
/// [`IntegrationError::IllegalTransition`] so callers can test for them; the
/// `strict-debug` feature turns them into panics.
pub fn validate_transition(
    from: IntegrationState,
    to: IntegrationState,
) -> Result<(), IntegrationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal integration transition attempted: {from:?} -> {to:?}");

        #[cfg(not(feature = "strict-debug"))]
        Err(IntegrationError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: IntegrationState) -> Vec<IntegrationState> {
    use IntegrationState::*;
    match from {
        Scanning => vec![Registering],
        Registering => vec![AwaitingHostCompletion],
        AwaitingHostCompletion => vec![Resolving],
        Resolving => vec![Resolving, PassthroughProcessing, Done],
        PassthroughProcessing => vec![Done],
        Done => vec![Resolving],
    }
}

/// Fails with [`IntegrationError::PhaseViolation`] unless `phase` permits `operation`.
pub fn ensure_phase(phase: HostPhase, operation: HostOperation) -> Result<(), IntegrationError> {
    if phase.permits(operation) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("{operation} attempted during host phase {phase}");

        #[cfg(not(feature = "strict-debug"))]
        Err(IntegrationError::PhaseViolation { operation, phase })
    }
}
