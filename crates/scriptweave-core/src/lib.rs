//! scriptweave core
//!
//! Pulls classic `<script src>` references that a staged build host would
//! otherwise copy verbatim into the host's full processing path, then points
//! the emitted document at the processed, content-addressed outputs.
//!
//! # Architecture
//!
//! ```text
//! source document → ReferenceScanner → PipelineIntegrator ──register──→ host
//!                        ↑                    │  ↑                        │
//!                  DocumentCache              │  └──final paths──────────┘
//!                                             ↓
//!                output document ← DocumentRewriter
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptweave_core::{BuildPlugin, ScriptWeave, WeaveConfig};
//!
//! # async fn example(host: &impl scriptweave_core::HostPipeline) -> Result<(), Box<dyn std::error::Error>> {
//! let mut plugin = ScriptWeave::new(WeaveConfig::new().with_document("index.html"));
//!
//! plugin.build_start(host).await?;
//! // ... host transforms and names units ...
//! plugin.generate_bundle(host).await?;
//! // ... host writes the bundle ...
//! plugin.close_bundle(host).await?;
//!
//! for record in plugin.records() {
//!     println!("{} -> {}", record.original_path(), record.final_location()?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod integrator;
pub mod mode;
pub mod phase;
pub mod plugin;
pub mod record;
pub mod rewriter;
pub mod scanner;
pub mod virtual_unit;

// Re-exports for convenience
pub use cache::{CacheStats, DocumentCache};
pub use config::{ModeSetting, WeaveConfig};
pub use context::BuildContext;
pub use error::{
    ConfigError, HostError, IntegrationError, RecordError, RewriteError, ScanError,
    TransformError, WeaveError, WeaveResult,
};
pub use host::{HostPipeline, ResolvedConfig};
pub use integrator::PipelineIntegrator;
pub use mode::{IdentityTransform, ProcessingMode, ScriptTransform};
pub use phase::{HostOperation, HostPhase, IntegrationState};
pub use plugin::{BuildPlugin, ScriptWeave};
pub use record::{ReferenceRecord, UnitId};
pub use rewriter::{DocumentRewriter, RewriteOutcome};
pub use scanner::{is_external, ReferenceScanner, DEFAULT_EXTENSIONS};
pub use virtual_unit::{VirtualUnitProvider, SENTINEL};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing hosts and driving the plugin
    pub use crate::{
        BuildPlugin, HostError, HostOperation, HostPhase, HostPipeline, ProcessingMode,
        ReferenceRecord, ResolvedConfig, ScriptWeave, UnitId, WeaveConfig, WeaveError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
