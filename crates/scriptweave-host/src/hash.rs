//! Content-addressed output naming
//!
//! Provides [`ContentHash`], a 32-byte Blake3 hash whose leading bytes
//! become the fingerprint in output file names.

use std::fmt::{self, Display, Formatter};

/// Hex characters of the hash that appear in output names
pub const FINGERPRINT_LEN: usize = 8;

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash final output content
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Fingerprint used in file names (first 8 hex chars)
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..FINGERPRINT_LEN / 2])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Output file name for an emitted artifact.
///
/// `name` may carry its own extension, which wins over `default_ext`.
#[must_use]
pub fn hashed_file_name(dir: &str, name: &str, default_ext: &str, content: &[u8]) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            hashed_unit_name(dir, stem, ext, content)
        }
        _ => hashed_unit_name(dir, name, default_ext, content),
    }
}

/// Output file name `<dir>/<stem>-<fingerprint>.<ext>` for `content`.
///
/// `stem` is used as given, dots included; `ext` is always appended.
#[must_use]
pub fn hashed_unit_name(dir: &str, stem: &str, ext: &str, content: &[u8]) -> String {
    let fingerprint = ContentHash::compute(content).fingerprint();
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        format!("{stem}-{fingerprint}.{ext}")
    } else {
        format!("{dir}/{stem}-{fingerprint}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(ContentHash::compute(b"a"), ContentHash::compute(b"a"));
        assert_ne!(ContentHash::compute(b"a"), ContentHash::compute(b"b"));
    }

    #[test]
    fn display_is_full_hex() {
        let hash = ContentHash::compute(b"test");
        assert_eq!(hash.to_string(), blake3::hash(b"test").to_hex().as_str());
    }

    #[test]
    fn fingerprint_prefixes_full_hash() {
        let hash = ContentHash::compute(b"window.ready = true;");
        let fingerprint = hash.fingerprint();
        assert_eq!(fingerprint.len(), FINGERPRINT_LEN);
        assert!(hash.to_string().starts_with(&fingerprint));
    }

    #[test]
    fn file_name_uses_stem_and_extension() {
        let fingerprint = ContentHash::compute(b"x").fingerprint();
        assert_eq!(
            hashed_file_name("assets", "init", "js", b"x"),
            format!("assets/init-{fingerprint}.js")
        );
        assert_eq!(
            hashed_file_name("/assets/", "legacy.min.mjs", "js", b"x"),
            format!("assets/legacy.min-{fingerprint}.mjs")
        );
        assert_eq!(hashed_file_name("", ".hidden", "js", b"x"), format!(".hidden-{fingerprint}.js"));
    }

    #[test]
    fn unit_name_keeps_dotted_stem() {
        let fingerprint = ContentHash::compute(b"x").fingerprint();
        assert_eq!(
            hashed_unit_name("assets", "jquery.min", "js", b"x"),
            format!("assets/jquery.min-{fingerprint}.js")
        );
        assert_eq!(
            hashed_unit_name("", "init", "js", b"x"),
            format!("init-{fingerprint}.js")
        );
    }

    proptest! {
        #[test]
        fn file_name_changes_with_content(a in ".*", b in ".*") {
            prop_assume!(a != b);
            prop_assert_ne!(
                hashed_file_name("assets", "init", "js", a.as_bytes()),
                hashed_file_name("assets", "init", "js", b.as_bytes())
            );
        }
    }
}
