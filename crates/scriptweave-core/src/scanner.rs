//! Script reference discovery
//!
//! Finds classic `<script src>` references in a source document. Module
//! scripts are left to the host, which bundles them natively; external
//! locators are left untouched.

use crate::cache::DocumentCache;
use crate::error::ScanError;
use crate::record::ReferenceRecord;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>").expect("script tag pattern"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern")
});

/// Scheme-qualified (`https:`, `data:`) or protocol-relative (`//`)
static EXTERNAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.\-]*:|//)").expect("external pattern"));

/// Default recognised script extensions
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["js", "mjs", "cjs"];

/// Locates script references in documents under a project root
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    root: PathBuf,
    extensions: Vec<String>,
    cache: DocumentCache,
}

impl ReferenceScanner {
    /// Scanner for an absolute project `root` with default extensions
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            cache: DocumentCache::new(),
        }
    }

    /// Replace the recognised extension set (without dots)
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Share an existing cache
    #[must_use]
    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Discover script references in the document at `document`.
    ///
    /// An unreadable document yields no references.
    pub async fn scan(&self, document: &Path) -> Vec<ReferenceRecord> {
        match self.cache.get_or_read(document).await {
            Ok(source) => self.extract(document, &source),
            Err(e) => {
                tracing::debug!(error = %e, "document unreadable, nothing to scan");
                Vec::new()
            }
        }
    }

    /// Discover script references in already-loaded `source`.
    ///
    /// Duplicate references collapse to the first occurrence.
    #[must_use]
    pub fn extract(&self, document: &Path, source: &str) -> Vec<ReferenceRecord> {
        let base = document
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for tag in SCRIPT_TAG.captures_iter(source) {
            let Some(src) = script_source(&tag[1]) else {
                continue;
            };
            if !seen.insert(src.clone()) {
                continue;
            }
            match self.candidate(&base, &src) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping script reference: {e}"),
            }
        }

        tracing::debug!(document = %document.display(), found = records.len(), "scanned document");
        records
    }

    /// `src` is kept exactly as written so the rewriter can find it again;
    /// only resolution sees the trimmed value.
    fn candidate(&self, base: &Path, src: &str) -> Result<Option<ReferenceRecord>, ScanError> {
        let value = src.trim();
        if value.is_empty() || is_external(value) {
            return Ok(None);
        }

        let path_part = value.split(['?', '#']).next().unwrap_or(value);
        let resolved = match path_part.strip_prefix('/') {
            Some(root_relative) => normalize(&self.root.join(root_relative)),
            None => normalize(&base.join(path_part)),
        };

        if !self.has_script_extension(&resolved) {
            return Err(ScanError::DisallowedExtension {
                reference: src.to_string(),
                path: resolved,
            });
        }

        Ok(Some(ReferenceRecord::new(src, resolved)))
    }

    fn has_script_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

/// Whether `value` points outside the project
#[must_use]
pub fn is_external(value: &str) -> bool {
    EXTERNAL.is_match(value)
}

/// `src` of a classic script tag, given the text between `<script` and `>`
fn script_source(attributes: &str) -> Option<String> {
    let mut src = None;
    for attr in ATTRIBUTE.captures_iter(attributes) {
        let name = attr[1].to_ascii_lowercase();
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .or_else(|| attr.get(4))
            .map_or("", |m| m.as_str());
        match name.as_str() {
            "type" if value.trim().eq_ignore_ascii_case("module") => return None,
            "src" if src.is_none() => src = Some(value.to_string()),
            _ => {}
        }
    }
    src
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
