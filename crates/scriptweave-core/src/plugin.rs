//! Build plugin entry point
//!
//! A staged host drives [`BuildPlugin`] hooks in lifecycle order.
//! [`ScriptWeave`] wires the scanner, integrator and rewriter to those hooks:
//!
//! | Hook              | Work                                              |
//! |-------------------|---------------------------------------------------|
//! | `build_start`     | fresh [`BuildContext`], scan, register units      |
//! | `resolve_id`/`load` | serve sentinel-prefixed units                   |
//! | `generate_bundle` | resolve final locations, passthrough processing  |
//! | `close_bundle`    | rewrite the emitted document                      |

use crate::config::WeaveConfig;
use crate::context::BuildContext;
use crate::error::{IntegrationError, WeaveError};
use crate::host::HostPipeline;
use crate::mode::{ProcessingMode, ScriptTransform};
use crate::record::ReferenceRecord;
use crate::rewriter::{DocumentRewriter, RewriteOutcome};
use crate::scanner::ReferenceScanner;
use crate::virtual_unit::VirtualUnitProvider;

/// Hooks a staged build host calls back into.
///
/// Every hook has a no-op default so plugins implement only what they need.
#[async_trait::async_trait]
pub trait BuildPlugin: Send + Sync {
    /// Plugin name for diagnostics
    fn name(&self) -> &str;

    /// Start of a build invocation
    async fn build_start(&mut self, _host: &dyn HostPipeline) -> Result<(), WeaveError> {
        Ok(())
    }

    /// Claim a module identifier; `None` lets the host continue resolution
    fn resolve_id(&self, _id: &str) -> Option<String> {
        None
    }

    /// Supply content for a claimed identifier
    async fn load(&self, _id: &str, _host: &dyn HostPipeline) -> Option<String> {
        None
    }

    /// Output names are final; last chance to emit artifacts
    async fn generate_bundle(&mut self, _host: &dyn HostPipeline) -> Result<(), WeaveError> {
        Ok(())
    }

    /// Everything has been written to the output directory
    async fn close_bundle(&mut self, _host: &dyn HostPipeline) -> Result<(), WeaveError> {
        Ok(())
    }
}

/// Pulls classic script references into the host pipeline
#[derive(Debug)]
pub struct ScriptWeave {
    config: WeaveConfig,
    mode: ProcessingMode,
    units: VirtualUnitProvider,
    rewriter: DocumentRewriter,
    context: Option<BuildContext>,
    last_rewrite: Option<RewriteOutcome>,
}

impl ScriptWeave {
    /// Plugin with the mode named in `config`
    #[must_use]
    pub fn new(config: WeaveConfig) -> Self {
        let mode = config.processing_mode();
        Self {
            config,
            mode,
            units: VirtualUnitProvider::new(),
            rewriter: DocumentRewriter::new(),
            context: None,
            last_rewrite: None,
        }
    }

    /// Process scripts with `transform` instead of delegating to the host
    #[must_use]
    pub fn with_transform(mut self, transform: impl ScriptTransform + 'static) -> Self {
        self.mode = ProcessingMode::caller_transform(transform);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WeaveConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> &ProcessingMode {
        &self.mode
    }

    /// Context of the current or most recent invocation
    #[inline]
    #[must_use]
    pub fn context(&self) -> Option<&BuildContext> {
        self.context.as_ref()
    }

    /// Records of the current or most recent invocation
    #[must_use]
    pub fn records(&self) -> &[ReferenceRecord] {
        self.context.as_ref().map_or(&[], BuildContext::records)
    }

    /// Outcome of the most recent rewrite
    #[inline]
    #[must_use]
    pub fn last_rewrite(&self) -> Option<RewriteOutcome> {
        self.last_rewrite
    }

    fn context_mut(&mut self, hook: &'static str) -> Result<&mut BuildContext, IntegrationError> {
        self.context.as_mut().ok_or(IntegrationError::NotStarted(hook))
    }
}

#[async_trait::async_trait]
impl BuildPlugin for ScriptWeave {
    fn name(&self) -> &str {
        "scriptweave"
    }

    async fn build_start(&mut self, host: &dyn HostPipeline) -> Result<(), WeaveError> {
        let scanner = ReferenceScanner::new(&host.resolved_config().root)
            .with_extensions(&self.config.extensions);
        let context = self
            .context
            .insert(BuildContext::new(scanner, &self.config.document, self.mode.clone()));
        self.last_rewrite = None;

        context.discover_and_register(host).await?;
        Ok(())
    }

    fn resolve_id(&self, id: &str) -> Option<String> {
        self.units.resolve(id)
    }

    async fn load(&self, id: &str, host: &dyn HostPipeline) -> Option<String> {
        self.units.load(id, host).await
    }

    async fn generate_bundle(&mut self, host: &dyn HostPipeline) -> Result<(), WeaveError> {
        self.context_mut("generate_bundle")?.finalize(host).await?;
        Ok(())
    }

    async fn close_bundle(&mut self, host: &dyn HostPipeline) -> Result<(), WeaveError> {
        let output = host.resolved_config().out_dir.join(&self.config.document);
        let context = self
            .context
            .as_ref()
            .ok_or(IntegrationError::NotStarted("close_bundle"))?;
        let outcome = self.rewriter.rewrite(&output, context.records()).await?;
        self.last_rewrite = Some(outcome);
        Ok(())
    }
}
