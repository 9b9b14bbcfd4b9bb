//! Filter stack entries and the request shape dialogs produce.

use crate::core::error::{FilterError, FilterId};
use crate::core::types::{Library, Parameters};
use serde::{Deserialize, Serialize};

/// A parameter snapshot emitted by a dialog.
///
/// This is the wire shape every dialog collaborator produces, for previews
/// and commits alike. `signal` names the dialog kind so the editor can
/// reopen the right dialog later; the engine only carries it around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    /// Identity of the filter being edited (generated when absent)
    #[serde(default)]
    pub identifier: FilterId,
    /// Provider library name
    pub library: String,
    /// Filter name within the library
    pub name: String,
    /// Parameter bag
    #[serde(default)]
    pub parameter: Parameters,
    /// Dialog kind, e.g. `opencv_gaussian`
    #[serde(default)]
    pub signal: String,
}

impl FilterRequest {
    /// Create a request for a brand new filter instance.
    pub fn new(library: Library, name: impl Into<String>, parameter: Parameters) -> Self {
        let name = name.into();
        Self {
            identifier: FilterId::new(),
            signal: format!("{}_{}", library.as_str(), name),
            library: library.as_str().to_string(),
            name,
            parameter,
        }
    }

    /// Use an explicit identifier (edits of an existing filter).
    pub fn with_identifier(mut self, identifier: impl Into<FilterId>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Replace the parameter bag.
    pub fn with_parameter(mut self, parameter: Parameters) -> Self {
        self.parameter = parameter;
        self
    }
}

/// One stage of a filter stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Stable identity across edits
    pub identifier: FilterId,
    /// Provider library
    pub library: Library,
    /// Lowercase filter name within the library
    pub name: String,
    /// Opaque parameter bag, passed to the filter untouched
    pub parameter: Parameters,
    /// Invisible stages are skipped during replay
    pub visible: bool,
    /// Dialog kind used to reopen the editor for this stage
    pub signal: String,
}

impl FilterSpec {
    /// Create a visible stage.
    pub fn new(library: Library, name: impl Into<String>, parameter: Parameters) -> Self {
        let name = name.into().to_lowercase();
        Self {
            identifier: FilterId::new(),
            signal: format!("{}_{}", library.as_str(), name),
            library,
            name,
            parameter,
            visible: true,
        }
    }

    /// Human-readable label for list widgets.
    pub fn display_name(&self) -> String {
        self.name
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TryFrom<FilterRequest> for FilterSpec {
    type Error = FilterError;

    fn try_from(request: FilterRequest) -> Result<Self, Self::Error> {
        let library: Library = request.library.parse()?;
        Ok(Self {
            identifier: request.identifier,
            library,
            name: request.name.to_lowercase(),
            parameter: request.parameter,
            visible: true,
            signal: request.signal,
        })
    }
}

impl TryFrom<&FilterRequest> for FilterSpec {
    type Error = FilterError;

    fn try_from(request: &FilterRequest) -> Result<Self, Self::Error> {
        Self::try_from(request.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "identifier": "a1b2c3d4-0000",
            "library": "opencv",
            "name": "Gaussian",
            "parameter": {"kernel_size": 5},
            "signal": "opencv_gaussian"
        }"#;
        let request: FilterRequest = serde_json::from_str(json).unwrap();
        let spec = FilterSpec::try_from(request).unwrap();

        assert_eq!(spec.identifier.as_str(), "a1b2c3d4-0000");
        assert_eq!(spec.library, Library::OpenCv);
        assert_eq!(spec.name, "gaussian");
        assert!(spec.visible);
        assert_eq!(spec.signal, "opencv_gaussian");
    }

    #[test]
    fn test_request_without_identifier_gets_one() {
        let json = r#"{"library": "scikit", "name": "sobel"}"#;
        let request: FilterRequest = serde_json::from_str(json).unwrap();

        assert!(!request.identifier.as_str().is_empty());
        assert!(request.parameter.is_empty());
    }

    #[test]
    fn test_unknown_library_is_rejected() {
        let request = FilterRequest {
            identifier: FilterId::from("x"),
            library: "matlab".to_string(),
            name: "blur".to_string(),
            parameter: Parameters::new(),
            signal: String::new(),
        };
        assert_eq!(
            FilterSpec::try_from(&request),
            Err(FilterError::UnknownLibrary("matlab".to_string()))
        );
    }

    #[test]
    fn test_display_name() {
        let spec = FilterSpec::new(Library::OpenCv, "difference_of_gaussians", Parameters::new());
        assert_eq!(spec.display_name(), "Difference Of Gaussians");
        assert_eq!(spec.signal, "opencv_difference_of_gaussians");
    }
}
