//! Error types for filterstack.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Name the offending filter or parameter so the editor can point at it
//! - Stay cheap to clone, since a failed preview is reported on every slider tick
//! - Chain into a single top-level [`EngineError`]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of one filter in a stack.
///
/// Identity survives parameter edits and visibility toggles; the editor hands
/// the same identifier back with every preview and commit of that filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(String);

impl FilterId {
    /// Create a new random filter ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an identifier produced elsewhere (typically by a dialog).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "{}", short)
    }
}

impl From<&str> for FilterId {
    fn from(id: &str) -> Self {
        Self::from_string(id)
    }
}

/// Unique identifier for an open document (editor tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Create a new random document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type for filterstack.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Errors raised while resolving or running a single filter stage.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterError {
    #[error("Unknown filter type: {name} (library '{library}')")]
    UnknownFilter { library: String, name: String },

    #[error("Unknown filter library: {0}")]
    UnknownLibrary(String),

    #[error("Invalid value for parameter '{parameter}' of filter '{filter}': {reason}")]
    InvalidParameter {
        filter: String,
        parameter: String,
        reason: String,
    },

    #[error("Filter '{filter}' failed: {reason}")]
    Processing { filter: String, reason: String },
}

impl FilterError {
    /// Name of the filter this error is about.
    pub fn filter_name(&self) -> Option<&str> {
        match self {
            FilterError::UnknownFilter { name, .. } => Some(name),
            FilterError::InvalidParameter { filter, .. } | FilterError::Processing { filter, .. } => {
                Some(filter)
            }
            FilterError::UnknownLibrary(_) => None,
        }
    }

    /// Whether the failure comes from the stack configuration rather than the pixels.
    ///
    /// Lookup misses never go away by retrying; processing failures might
    /// once the parameter or input changes.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            FilterError::UnknownFilter { .. } | FilterError::UnknownLibrary(_)
        )
    }
}

/// Result type alias for filterstack operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_id_display_is_short() {
        let id = FilterId::new();
        assert_eq!(format!("{}", id).len(), 8);

        let short = FilterId::from("abc");
        assert_eq!(format!("{}", short), "abc");
    }

    #[test]
    fn test_filter_id_serializes_as_plain_string() {
        let id = FilterId::from("f-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"f-1\"");
    }

    #[test]
    fn test_unknown_filter_names_the_filter() {
        let error = FilterError::UnknownFilter {
            library: "opencv".to_string(),
            name: "warp".to_string(),
        };
        assert_eq!(error.filter_name(), Some("warp"));
        assert!(error.is_lookup_failure());
        assert!(error.to_string().contains("warp"));
    }

    #[test]
    fn test_engine_error_from_filter_error() {
        let error: EngineError = FilterError::UnknownLibrary("matlab".to_string()).into();
        assert!(matches!(error, EngineError::Filter(FilterError::UnknownLibrary(_))));
    }
}
