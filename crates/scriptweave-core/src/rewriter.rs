//! Output document rewriting
//!
//! Points every `src` attribute that still names an original script
//! reference at its final, content-addressed location. References are matched
//! as escaped literals, never as patterns, and all substitutions happen in a
//! single pass so a replacement can never be matched again.

use crate::error::RewriteError;
use crate::record::ReferenceRecord;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of rewriting one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Attribute values replaced
    pub replacements: usize,
    /// Whether the document was written
    pub written: bool,
}

/// Rewrites reference attributes in an emitted document
#[derive(Debug, Clone)]
pub struct DocumentRewriter {
    attribute: String,
}

impl DocumentRewriter {
    /// Rewriter for `src` attributes
    #[must_use]
    pub fn new() -> Self {
        Self::for_attribute("src")
    }

    #[must_use]
    pub fn for_attribute(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }

    /// Rewrite the document at `output` in place.
    ///
    /// Does nothing when no record has a final location. Otherwise reads the
    /// document, applies every substitution in memory and, if anything
    /// changed, replaces the file atomically.
    ///
    /// # Errors
    /// - [`RewriteError::Read`] if the document cannot be read
    /// - [`RewriteError::Write`] if it cannot be replaced; the original file
    ///   is left as it was
    pub async fn rewrite(
        &self,
        output: &Path,
        records: &[ReferenceRecord],
    ) -> Result<RewriteOutcome, RewriteError> {
        if !records.iter().any(ReferenceRecord::is_finalized) {
            tracing::debug!("no finalized references, skipping rewrite");
            return Ok(RewriteOutcome::default());
        }

        let document = tokio::fs::read_to_string(output)
            .await
            .map_err(|source| RewriteError::Read {
                path: output.to_path_buf(),
                source,
            })?;

        let (rewritten, replacements) = self.apply(&document, records);
        if rewritten == document {
            return Ok(RewriteOutcome {
                replacements,
                written: false,
            });
        }

        write_atomic(output.to_path_buf(), rewritten).await?;
        tracing::info!(path = %output.display(), replacements, "rewrote document");
        Ok(RewriteOutcome {
            replacements,
            written: true,
        })
    }

    /// Apply substitutions to `document`, returning the new text and the
    /// number of attribute values replaced.
    #[must_use]
    pub fn apply(&self, document: &str, records: &[ReferenceRecord]) -> (String, usize) {
        let (targets, mut alternatives) = collect_targets(records);
        if alternatives.is_empty() {
            return (document.to_string(), 0);
        }

        // Longest literal first so a reference that prefixes another never shadows it.
        alternatives.sort_by_key(|a| std::cmp::Reverse(a.len()));
        match Regex::new(&self.pattern(&alternatives.join("|"))) {
            Ok(combined) => substitute(document, std::slice::from_ref(&combined), &targets),
            Err(e) => {
                tracing::warn!(error = %e, references = alternatives.len(), "cannot build combined substitution, matching references one by one");
                self.apply_each(document, &alternatives, &targets)
            }
        }
    }

    /// One pattern per reference, still matched against the original text
    /// so replacements are never matched again.
    fn apply_each(
        &self,
        document: &str,
        alternatives: &[String],
        targets: &HashMap<&str, &str>,
    ) -> (String, usize) {
        let patterns: Vec<Regex> = alternatives
            .iter()
            .filter_map(|alternative| match Regex::new(&self.pattern(alternative)) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(error = %e, "cannot build substitution");
                    None
                }
            })
            .collect();
        substitute(document, &patterns, targets)
    }

    /// `attribute = value` preceded by whitespace, with the value double
    /// quoted, single quoted or bare. A bare value must end the tag or be
    /// followed by whitespace.
    fn pattern(&self, choice: &str) -> String {
        format!(
            r#"(?P<lead>\s)(?P<attr>(?i:{attr})\s*=\s*)(?:"(?P<dq>{choice})"|'(?P<sq>{choice})'|(?P<uq>{choice})(?P<tail>[\s>]|$))"#,
            attr = regex::escape(&self.attribute),
        )
    }
}

/// Final locations keyed by the attribute text they replace, plus the
/// escaped literal for each key.
fn collect_targets(records: &[ReferenceRecord]) -> (HashMap<&str, &str>, Vec<String>) {
    let mut targets: HashMap<&str, &str> = HashMap::new();
    let mut alternatives = Vec::new();

    for record in records.iter().filter(|r| r.is_finalized()) {
        let Ok(location) = record.final_location() else {
            continue;
        };
        if location.is_empty() || targets.contains_key(record.original_path()) {
            continue;
        }
        let escaped = regex::escape(record.original_path());
        if let Err(e) = Regex::new(&escaped) {
            tracing::error!(reference = record.original_path(), error = %e, "cannot build substitution");
            continue;
        }
        targets.insert(record.original_path(), location);
        alternatives.push(escaped);
    }
    (targets, alternatives)
}

/// Splice every match of `patterns` in `document` in one pass. Matches that
/// overlap an earlier one are dropped.
fn substitute(
    document: &str,
    patterns: &[Regex],
    targets: &HashMap<&str, &str>,
) -> (String, usize) {
    let mut edits: Vec<(usize, usize, String)> = patterns
        .iter()
        .flat_map(|re| re.captures_iter(document))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), replacement(&caps, targets)?))
        })
        .collect();
    edits.sort_by_key(|(start, ..)| *start);

    let mut rewritten = String::with_capacity(document.len());
    let mut cursor = 0;
    let mut replacements = 0;
    for (start, end, text) in edits {
        if start < cursor {
            continue;
        }
        rewritten.push_str(&document[cursor..start]);
        rewritten.push_str(&text);
        cursor = end;
        replacements += 1;
    }
    rewritten.push_str(&document[cursor..]);
    (rewritten, replacements)
}

fn replacement(caps: &Captures<'_>, targets: &HashMap<&str, &str>) -> Option<String> {
    let (original, open, close) = if let Some(m) = caps.name("dq") {
        (m.as_str(), "\"", "\"")
    } else if let Some(m) = caps.name("sq") {
        (m.as_str(), "'", "'")
    } else {
        let tail = caps.name("tail").map_or("", |t| t.as_str());
        (caps.name("uq")?.as_str(), "", tail)
    };
    let location = targets.get(original)?;
    Some(format!(
        "{}{}{open}/{}{close}",
        &caps["lead"],
        &caps["attr"],
        location.trim_start_matches('/')
    ))
}

impl Default for DocumentRewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `path` with `contents` via a sibling temp file and rename.
async fn write_atomic(path: PathBuf, contents: String) -> Result<(), RewriteError> {
    let target = path.clone();
    tokio::task::spawn_blocking(move || persist(&target, contents.as_bytes()))
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| RewriteError::Write { path, source })
}

fn persist(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    if let Ok(meta) = std::fs::metadata(target) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}
