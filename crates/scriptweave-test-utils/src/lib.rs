//! Testing utilities for scriptweave workspace
//!
//! Fixture projects on disk and small markup builders.

#![allow(missing_docs)]

use scriptweave_core::{ModeSetting, WeaveConfig};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway project directory
#[derive(Debug)]
pub struct FixtureProject {
    dir: TempDir,
}

impl FixtureProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Add a file, creating parent directories
    pub fn with_file(self, relative: &str, contents: &str) -> Self {
        self.write(relative, contents);
        self
    }

    /// Add the entry document listing `sources` as classic scripts
    pub fn with_page(self, sources: &[&str]) -> Self {
        self.with_file("index.html", &page(sources))
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative.trim_start_matches('/'))
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path("dist")
    }

    pub fn read_output(&self, relative: &str) -> String {
        std::fs::read_to_string(self.out_dir().join(relative.trim_start_matches('/'))).unwrap()
    }

    pub fn output_exists(&self, relative: &str) -> bool {
        self.out_dir().join(relative.trim_start_matches('/')).exists()
    }

    /// Delegated-mode config rooted at this project
    pub fn config(&self) -> WeaveConfig {
        WeaveConfig::new()
            .with_root(self.root())
            .with_out_dir(self.out_dir())
    }

    pub fn passthrough_config(&self) -> WeaveConfig {
        self.config().with_mode(ModeSetting::Passthrough)
    }
}

impl Default for FixtureProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal HTML page with one classic script tag per source
pub fn page(sources: &[&str]) -> String {
    let mut html = String::from("<!doctype html>\n<html>\n<head>\n");
    for src in sources {
        let _ = writeln!(html, "  {}", script(src));
    }
    html.push_str("</head>\n<body></body>\n</html>\n");
    html
}

pub fn script(src: &str) -> String {
    format!(r#"<script src="{src}"></script>"#)
}

pub fn module_script(src: &str) -> String {
    format!(r#"<script type="module" src="{src}"></script>"#)
}

/// Project with one local script, one CDN script and one module entry
pub fn mixed_project() -> FixtureProject {
    let html = format!(
        "<!doctype html>\n<html>\n<head>\n  {}\n  {}\n  {}\n</head>\n<body></body>\n</html>\n",
        script("/js/init.js"),
        script("https://cdn.example.com/lib.js"),
        module_script("/src/main.js"),
    );
    FixtureProject::new()
        .with_file("index.html", &html)
        .with_file("js/init.js", "window.ready = true;\n")
        .with_file("src/main.js", "import './init';\n")
}
