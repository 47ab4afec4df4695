//! Processing mode for one build invocation

use crate::error::TransformError;
use crate::host::ResolvedConfig;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied script transform.
///
/// Receives raw script content and the host's resolved configuration and
/// returns the content to emit. Output is never processed further by the
/// host.
#[async_trait::async_trait]
pub trait ScriptTransform: Send + Sync {
    async fn transform(&self, source: &str, config: &ResolvedConfig)
        -> Result<String, TransformError>;
}

#[async_trait::async_trait]
impl<F> ScriptTransform for F
where
    F: Fn(&str, &ResolvedConfig) -> Result<String, TransformError> + Send + Sync,
{
    async fn transform(
        &self,
        source: &str,
        config: &ResolvedConfig,
    ) -> Result<String, TransformError> {
        self(source, config)
    }
}

/// Emits scripts unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

#[async_trait::async_trait]
impl ScriptTransform for IdentityTransform {
    async fn transform(
        &self,
        source: &str,
        _config: &ResolvedConfig,
    ) -> Result<String, TransformError> {
        Ok(source.to_string())
    }
}

/// How discovered scripts are processed. Fixed for a whole invocation.
#[derive(Clone, Default)]
pub enum ProcessingMode {
    /// Scripts become compiled units; the host transforms and hashes them
    #[default]
    Delegated,
    /// Scripts go through the caller's transform and are emitted as final
    /// artifacts
    CallerTransform(Arc<dyn ScriptTransform>),
}

impl ProcessingMode {
    /// Wrap a transform
    #[must_use]
    pub fn caller_transform(transform: impl ScriptTransform + 'static) -> Self {
        Self::CallerTransform(Arc::new(transform))
    }

    #[inline]
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated)
    }
}

impl fmt::Debug for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegated => f.write_str("Delegated"),
            Self::CallerTransform(_) => f.write_str("CallerTransform(..)"),
        }
    }
}
