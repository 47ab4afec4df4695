//! In-memory staged host
//!
//! [`ReferenceHost`] walks the full hook lifecycle for one build, loads
//! compiled units through plugin hooks, names every output after its content
//! and writes the bundle to disk.
//!
//! # Lifecycle
//!
//! ```text
//! Setup → BuildStart → Transform → BuildEnd → RenderStart → GenerateBundle → WriteBundle → CloseBundle
//!           │            │                                     │                            │
//!      build_start   resolve_id/load                    generate_bundle               close_bundle
//! ```

use crate::error::HostBuildError;
use crate::hash::{hashed_file_name, hashed_unit_name, ContentHash};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use scriptweave_core::{
    BuildPlugin, HostError, HostOperation, HostPhase, HostPipeline, ResolvedConfig, UnitId,
    WeaveConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Extension given to compiled units
const UNIT_EXTENSION: &str = "js";

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Message a plugin reported through the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Where an output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Loaded and processed by the host
    Compiled,
    /// Emitted as-is by a plugin
    Artifact,
}

/// One file written to the output directory
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub id: UnitId,
    pub kind: OutputKind,
    /// Path relative to the output directory
    pub file_name: String,
    pub hash: ContentHash,
    pub bytes: usize,
}

/// Summary of a finished build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub outputs: Vec<OutputFile>,
    /// Units that produced no output
    pub failed: Vec<UnitId>,
    /// Entry document copied into the output directory
    pub document: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    #[must_use]
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

#[derive(Debug)]
struct Unit {
    kind: OutputKind,
    name: String,
    source_id: Option<String>,
    output: Option<Output>,
    failed: bool,
}

#[derive(Debug)]
struct Output {
    file_name: String,
    content: Vec<u8>,
}

/// Staged build host for a single invocation
#[derive(Debug)]
pub struct ReferenceHost {
    config: ResolvedConfig,
    entry_document: Option<String>,
    phase: RwLock<HostPhase>,
    units: Mutex<IndexMap<UnitId, Unit>>,
    next_id: AtomicU64,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ReferenceHost {
    #[must_use]
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            entry_document: None,
            phase: RwLock::new(HostPhase::Setup),
            units: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Host configured from a plugin configuration, copying its document
    #[must_use]
    pub fn from_config(config: &WeaveConfig) -> Self {
        let resolved = ResolvedConfig::new(config.root.clone(), config.output_dir())
            .with_assets_dir(config.assets_dir.clone())
            .with_minify(config.minify);
        Self::new(resolved).with_entry_document(config.document.clone())
    }

    /// Copy `document` (relative to root) into the output directory
    #[must_use]
    pub fn with_entry_document(mut self, document: impl Into<String>) -> Self {
        self.entry_document = Some(document.into());
        self
    }

    /// Reported warnings and errors so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Move the lifecycle forward to `to`.
    ///
    /// # Errors
    /// [`HostBuildError::Lifecycle`] unless `to` lies after the current phase.
    pub fn advance_to(&self, to: HostPhase) -> Result<(), HostBuildError> {
        let mut phase = self.phase.write();
        if to <= *phase {
            return Err(HostBuildError::Lifecycle { from: *phase, to });
        }
        tracing::debug!(from = %*phase, %to, "host phase");
        *phase = to;
        Ok(())
    }

    /// Run a full build with `plugin`.
    ///
    /// # Errors
    /// - [`HostBuildError::Lifecycle`] if this host already ran
    /// - [`HostBuildError::Plugin`] if a hook fails
    /// - [`HostBuildError::Io`] if outputs cannot be written
    pub async fn run<P>(&self, plugin: &mut P) -> Result<BuildReport, HostBuildError>
    where
        P: BuildPlugin + ?Sized,
    {
        tracing::info!(plugin = plugin.name(), root = %self.config.root.display(), "build started");

        self.advance_to(HostPhase::BuildStart)?;
        plugin
            .build_start(self)
            .await
            .map_err(HostBuildError::plugin("build_start"))?;

        self.advance_to(HostPhase::Transform)?;
        self.load_units(&*plugin).await;

        self.advance_to(HostPhase::BuildEnd)?;
        self.advance_to(HostPhase::RenderStart)?;
        self.advance_to(HostPhase::GenerateBundle)?;
        plugin
            .generate_bundle(self)
            .await
            .map_err(HostBuildError::plugin("generate_bundle"))?;

        self.advance_to(HostPhase::WriteBundle)?;
        let outputs = self.write_outputs().await?;
        let document = self.copy_entry_document().await?;

        self.advance_to(HostPhase::CloseBundle)?;
        plugin
            .close_bundle(self)
            .await
            .map_err(HostBuildError::plugin("close_bundle"))?;

        let failed = self
            .units
            .lock()
            .iter()
            .filter(|(_, u)| u.failed)
            .map(|(id, _)| id.clone())
            .collect();
        let report = BuildReport {
            outputs,
            failed,
            document,
            diagnostics: self.diagnostics(),
        };
        tracing::info!(
            outputs = report.outputs.len(),
            failed = report.failed.len(),
            warnings = report.warnings(),
            errors = report.errors(),
            "build finished"
        );
        Ok(report)
    }

    /// Load every pending compiled unit through the plugin's hooks.
    ///
    /// Units registered while loading are picked up in later rounds.
    async fn load_units<P>(&self, plugin: &P)
    where
        P: BuildPlugin + ?Sized,
    {
        loop {
            let pending: Vec<(UnitId, String)> = self
                .units
                .lock()
                .iter()
                .filter(|(_, u)| u.output.is_none() && !u.failed)
                .filter_map(|(id, u)| Some((id.clone(), u.source_id.clone()?)))
                .collect();
            if pending.is_empty() {
                break;
            }

            for (id, source_id) in pending {
                let content = match plugin.resolve_id(&source_id) {
                    Some(resolved) => plugin.load(&resolved, self).await,
                    None => {
                        self.error(&format!("no plugin resolved compiled unit {source_id:?}"));
                        None
                    }
                };

                let mut units = self.units.lock();
                let Some(unit) = units.get_mut(&id) else {
                    continue;
                };
                match content {
                    Some(code) => {
                        let code = self.process(&code);
                        let file_name = hashed_unit_name(
                            &self.config.assets_dir,
                            &unit.name,
                            UNIT_EXTENSION,
                            code.as_bytes(),
                        );
                        tracing::debug!(%id, %file_name, "unit transformed");
                        unit.output = Some(Output {
                            file_name,
                            content: code.into_bytes(),
                        });
                    }
                    None => {
                        tracing::warn!(%id, "unit produced no output");
                        unit.failed = true;
                    }
                }
            }
        }
    }

    /// Host-side processing of compiled unit content
    fn process(&self, code: &str) -> String {
        if !self.config.minify {
            return code.to_string();
        }
        code.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn write_outputs(&self) -> Result<Vec<OutputFile>, HostBuildError> {
        let files: Vec<(OutputFile, Vec<u8>)> = self
            .units
            .lock()
            .iter()
            .filter_map(|(id, unit)| {
                let output = unit.output.as_ref()?;
                let file = OutputFile {
                    id: id.clone(),
                    kind: unit.kind,
                    file_name: output.file_name.clone(),
                    hash: ContentHash::compute(&output.content),
                    bytes: output.content.len(),
                };
                Some((file, output.content.clone()))
            })
            .collect();

        let mut written = Vec::with_capacity(files.len());
        for (file, content) in files {
            let path = self.config.out_dir.join(&file.file_name);
            write_file(&path, &content).await?;
            written.push(file);
        }
        Ok(written)
    }

    async fn copy_entry_document(&self) -> Result<Option<PathBuf>, HostBuildError> {
        let Some(document) = &self.entry_document else {
            return Ok(None);
        };
        let source = self.config.root.join(document);
        let content = match tokio::fs::read(&source).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %source.display(), "no entry document to copy");
                return Ok(None);
            }
            Err(e) => return Err(HostBuildError::io(source)(e)),
        };
        let target = self.config.out_dir.join(document);
        write_file(&target, &content).await?;
        Ok(Some(target))
    }

    fn check(&self, operation: HostOperation) -> Result<(), HostError> {
        let phase = self.phase();
        if phase.permits(operation) {
            Ok(())
        } else {
            Err(HostError::IllegalPhase { operation, phase })
        }
    }

    fn issue_id(&self, prefix: &str) -> UnitId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        UnitId::new(format!("{prefix}-{n}"))
    }

    fn report(&self, severity: Severity, message: &str) {
        self.diagnostics.lock().push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}

impl HostPipeline for ReferenceHost {
    fn phase(&self) -> HostPhase {
        *self.phase.read()
    }

    fn resolved_config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn register_compiled_unit(&self, source_id: &str, name: &str) -> Result<UnitId, HostError> {
        self.check(HostOperation::RegisterUnit)?;
        let id = self.issue_id("unit");
        self.units.lock().insert(
            id.clone(),
            Unit {
                kind: OutputKind::Compiled,
                name: name.to_string(),
                source_id: Some(source_id.to_string()),
                output: None,
                failed: false,
            },
        );
        Ok(id)
    }

    fn final_output_path_of(&self, id: &UnitId) -> Result<String, HostError> {
        self.check(HostOperation::QueryFinalPath)?;
        let units = self.units.lock();
        let unit = units
            .get(id)
            .ok_or_else(|| HostError::UnknownUnit(id.clone()))?;
        unit.output
            .as_ref()
            .map(|o| o.file_name.clone())
            .ok_or_else(|| HostError::UnitFailed(id.clone()))
    }

    fn emit_final_artifact(&self, name: &str, content: &[u8]) -> Result<UnitId, HostError> {
        self.check(HostOperation::EmitArtifact)?;
        let id = self.issue_id("artifact");
        let file_name = hashed_file_name(&self.config.assets_dir, name, UNIT_EXTENSION, content);
        tracing::debug!(%id, %file_name, "artifact emitted");
        self.units.lock().insert(
            id.clone(),
            Unit {
                kind: OutputKind::Artifact,
                name: name.to_string(),
                source_id: None,
                output: Some(Output {
                    file_name,
                    content: content.to_vec(),
                }),
                failed: false,
            },
        );
        Ok(id)
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "scriptweave", "{message}");
        self.report(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "scriptweave", "{message}");
        self.report(Severity::Error, message);
    }
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), HostBuildError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(HostBuildError::io(parent))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(HostBuildError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn host() -> ReferenceHost {
        ReferenceHost::new(ResolvedConfig::new("/site", "/site/dist"))
    }

    #[test]
    fn registration_only_in_early_phases() {
        let host = host();
        assert!(matches!(
            host.register_compiled_unit("\0scriptweave:/site/a.js", "a"),
            Err(HostError::IllegalPhase {
                operation: HostOperation::RegisterUnit,
                phase: HostPhase::Setup
            })
        ));

        host.advance_to(HostPhase::BuildStart).unwrap();
        assert!(host.register_compiled_unit("\0scriptweave:/site/a.js", "a").is_ok());

        host.advance_to(HostPhase::BuildEnd).unwrap();
        assert!(host.register_compiled_unit("\0scriptweave:/site/b.js", "b").is_err());
    }

    #[test]
    fn final_paths_only_once_finalized() {
        let host = host();
        host.advance_to(HostPhase::BuildStart).unwrap();
        let id = host.emit_final_artifact("a.js", b"a()").unwrap();

        assert!(matches!(
            host.final_output_path_of(&id),
            Err(HostError::IllegalPhase { .. })
        ));

        host.advance_to(HostPhase::GenerateBundle).unwrap();
        let path = host.final_output_path_of(&id).unwrap();
        assert!(path.starts_with("assets/a-"));
        assert!(path.ends_with(".js"));
    }

    #[test]
    fn unloaded_and_unknown_units() {
        let host = host();
        host.advance_to(HostPhase::BuildStart).unwrap();
        let id = host.register_compiled_unit("\0scriptweave:/site/a.js", "a").unwrap();
        host.advance_to(HostPhase::GenerateBundle).unwrap();

        assert_eq!(host.final_output_path_of(&id), Err(HostError::UnitFailed(id)));
        assert_eq!(
            host.final_output_path_of(&UnitId::new("nope")),
            Err(HostError::UnknownUnit(UnitId::new("nope")))
        );
    }

    #[test]
    fn emission_closes_after_generate_bundle() {
        let host = host();
        host.advance_to(HostPhase::WriteBundle).unwrap();
        assert!(matches!(
            host.emit_final_artifact("a.js", b"a()"),
            Err(HostError::IllegalPhase {
                operation: HostOperation::EmitArtifact,
                ..
            })
        ));
    }

    #[test]
    fn lifecycle_only_moves_forward() {
        let host = host();
        host.advance_to(HostPhase::Transform).unwrap();
        assert!(matches!(
            host.advance_to(HostPhase::BuildStart),
            Err(HostBuildError::Lifecycle {
                from: HostPhase::Transform,
                to: HostPhase::BuildStart
            })
        ));
        assert!(host.advance_to(HostPhase::Transform).is_err());
    }

    #[test]
    fn minify_trims_lines() {
        let host = ReferenceHost::new(ResolvedConfig::new("/site", "/site/dist").with_minify(true));
        assert_eq!(host.process("  a();\n\n    b();  \n"), "a();\nb();");
        assert_eq!(self::host().process("  a();\n"), "  a();\n");
    }

    #[test]
    fn diagnostics_are_recorded() {
        let host = host();
        host.warn("careful");
        host.error("broken");
        assert_eq!(
            host.diagnostics(),
            vec![
                Diagnostic {
                    severity: Severity::Warning,
                    message: "careful".into()
                },
                Diagnostic {
                    severity: Severity::Error,
                    message: "broken".into()
                },
            ]
        );
    }

    #[test]
    fn from_config_resolves_output_dir() {
        let config = WeaveConfig::new().with_root("/site").with_assets_dir("static");
        let host = ReferenceHost::from_config(&config);
        assert_eq!(host.resolved_config().out_dir, PathBuf::from("/site/dist"));
        assert_eq!(host.resolved_config().assets_dir, "static");
        assert_eq!(host.entry_document.as_deref(), Some("index.html"));
    }
}
