//! scriptweave reference host
//!
//! A small staged build host that honours the same phase rules as a real
//! bundler: units are declared early, loaded through plugin hooks, named
//! after a hash of their final content, and only then exposed to path
//! queries. It exists to drive [`scriptweave_core::ScriptWeave`] end to end
//! from tests and the `scriptweave` binary; it does not bundle.
//!
//! # Example
//!
//! ```rust,ignore
//! use scriptweave_core::{ScriptWeave, WeaveConfig};
//! use scriptweave_host::ReferenceHost;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WeaveConfig::load("scriptweave.toml".as_ref())?;
//! let host = ReferenceHost::from_config(&config);
//! let mut plugin = ScriptWeave::new(config);
//!
//! let report = host.run(&mut plugin).await?;
//! println!("wrote {} outputs", report.outputs.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod hash;
pub mod pipeline;

pub use error::HostBuildError;
pub use hash::{hashed_file_name, hashed_unit_name, ContentHash, FINGERPRINT_LEN};
pub use pipeline::{BuildReport, Diagnostic, OutputFile, OutputKind, ReferenceHost, Severity};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
