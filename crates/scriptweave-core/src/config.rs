//! Caller-facing configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! root = "site"
//! document = "index.html"
//! out_dir = "dist"
//! assets_dir = "assets"
//! extensions = ["js", "mjs"]
//! mode = "passthrough"
//! ```

use crate::error::ConfigError;
use crate::mode::{IdentityTransform, ProcessingMode};
use crate::scanner::DEFAULT_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// How scripts are processed, as written in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    /// Host transforms and hashes every script
    #[default]
    Delegated,
    /// Scripts are emitted unchanged as final artifacts
    Passthrough,
}

/// scriptweave configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeaveConfig {
    /// Project root; relative roots resolve against the config file
    pub root: PathBuf,
    /// Entry document, relative to `root`
    pub document: String,
    /// Output directory; relative paths resolve against `root`
    pub out_dir: PathBuf,
    /// Asset subdirectory inside the output directory
    pub assets_dir: String,
    /// Recognised script extensions, without dots
    pub extensions: Vec<String>,
    /// Processing mode
    pub mode: ModeSetting,
    /// Ask the host to minify delegated units
    pub minify: bool,
}

impl WeaveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    /// With recognised extensions
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: ModeSetting) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Load and validate a TOML file.
    ///
    /// A relative `root` is taken relative to the file's directory.
    ///
    /// # Errors
    /// [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.root = base.join(&config.root);
        }
        tracing::debug!(path = %path.display(), root = %config.root.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] on bad values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.document.trim().is_empty() {
            return Err(ConfigError::Invalid("document must not be empty".into()));
        }
        if Path::new(&self.document).is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "document '{}' must be relative to root",
                self.document
            )));
        }
        if self.extensions.iter().all(|e| e.trim_start_matches('.').is_empty()) {
            return Err(ConfigError::Invalid("extensions must not be empty".into()));
        }
        let assets = Path::new(&self.assets_dir);
        if self.assets_dir.is_empty()
            || assets.is_absolute()
            || assets.components().any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::Invalid(format!(
                "assets_dir '{}' must be a relative path inside the output directory",
                self.assets_dir
            )));
        }
        Ok(())
    }

    /// Absolute path of the entry document
    #[must_use]
    pub fn document_path(&self) -> PathBuf {
        self.root.join(&self.document)
    }

    /// Output directory with relative paths resolved against `root`
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            self.root.join(&self.out_dir)
        }
    }

    /// Resolve the processing mode for one invocation
    #[must_use]
    pub fn processing_mode(&self) -> ProcessingMode {
        match self.mode {
            ModeSetting::Delegated => ProcessingMode::Delegated,
            ModeSetting::Passthrough => ProcessingMode::caller_transform(IdentityTransform),
        }
    }
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            document: "index.html".to_string(),
            out_dir: PathBuf::from("dist"),
            assets_dir: "assets".to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            mode: ModeSetting::Delegated,
            minify: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = WeaveConfig::from_toml_str("").unwrap();
        assert_eq!(config, WeaveConfig::default());
        assert_eq!(config.document, "index.html");
        assert!(config.processing_mode().is_delegated());
    }

    #[test]
    fn parses_all_fields() {
        let config = WeaveConfig::from_toml_str(
            r#"
            root = "/srv/site"
            document = "pages/home.html"
            out_dir = "build"
            assets_dir = "static/js"
            extensions = ["js"]
            mode = "passthrough"
            minify = true
            "#,
        )
        .unwrap();

        assert_eq!(config.document_path(), PathBuf::from("/srv/site/pages/home.html"));
        assert_eq!(config.output_dir(), PathBuf::from("/srv/site/build"));
        assert_eq!(config.assets_dir, "static/js");
        assert_eq!(config.extensions, vec!["js".to_string()]);
        assert_eq!(config.mode, ModeSetting::Passthrough);
        assert!(!config.processing_mode().is_delegated());
        assert!(config.minify);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = WeaveConfig::from_toml_str("documnet = \"a.html\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "document = \"\"",
            "document = \"/abs/index.html\"",
            "extensions = []",
            "assets_dir = \"../escape\"",
            "assets_dir = \"\"",
        ] {
            let err = WeaveConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{text}");
        }
    }

    #[test]
    fn absolute_out_dir_is_kept() {
        let config = WeaveConfig::new().with_root("/site").with_out_dir("/tmp/out");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn load_resolves_root_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scriptweave.toml");
        std::fs::write(&path, "root = \"site\"\n").unwrap();

        let config = WeaveConfig::load(&path).unwrap();

        assert_eq!(config.root, dir.path().join("site"));
    }

    #[test]
    fn load_missing_file() {
        let err = WeaveConfig::load(Path::new("/nonexistent/scriptweave.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
