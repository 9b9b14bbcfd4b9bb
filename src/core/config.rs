//! Editor configuration.
//!
//! Options are plain structs with builder methods and serde defaults, so a
//! config file only needs to mention what it changes:
//!
//! ```toml
//! [stack]
//! cache_reorders = false
//!
//! [load]
//! grayscale = false
//! ```

use crate::core::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling how a filter stack recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackOptions {
    /// Whether results are memoized by stack fingerprint.
    pub use_cache: bool,
    /// Whether reordering looks the new order up in the cache before replaying.
    /// When false, every move forces an uncached replay.
    pub cache_reorders: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_reorders: true,
        }
    }
}

impl StackOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable caching.
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Enable/disable cache lookups on reorder.
    pub fn with_cached_reorders(mut self, cache_reorders: bool) -> Self {
        self.cache_reorders = cache_reorders;
        self
    }
}

/// Options for loading a document's base image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Convert to 8-bit grayscale on load.
    pub grayscale: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { grayscale: true }
    }
}

impl LoadOptions {
    /// Keep or drop color on load.
    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }
}

/// Complete editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Stack recomputation options
    pub stack: StackOptions,
    /// Image loading options
    pub load: LoadOptions,
}

impl EditorConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        log::debug!("loaded config from {}: {:?}", path.as_ref().display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EngineError;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert!(config.stack.use_cache);
        assert!(config.stack.cache_reorders);
        assert!(config.load.grayscale);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EditorConfig::from_toml_str("[stack]\ncache_reorders = false\n").unwrap();
        assert!(config.stack.use_cache);
        assert!(!config.stack.cache_reorders);
        assert!(config.load.grayscale);
    }

    #[test]
    fn test_empty_toml() {
        assert_eq!(EditorConfig::from_toml_str("").unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let result = EditorConfig::from_toml_str("[stack]\nuse_cache = \"sometimes\"\n");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[load]\ngrayscale = false").unwrap();

        let config = EditorConfig::from_path(file.path()).unwrap();
        assert!(!config.load.grayscale);
    }

    #[test]
    fn test_builders() {
        let options = StackOptions::new().with_cache(false).with_cached_reorders(false);
        assert!(!options.use_cache);
        assert!(!options.cache_reorders);
        assert!(!LoadOptions::default().with_grayscale(false).grayscale);
    }
}
