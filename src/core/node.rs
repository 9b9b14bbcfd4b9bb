//! Filter trait and filter metadata.
//!
//! A filter is an opaque, pure function from an image to an image, bound to
//! its own parameter bag at construction time. Everything the editor needs to
//! know about a filter without running it lives in [`FilterMetadata`].

use crate::core::error::FilterResult;
use crate::core::types::{Library, ParamValue};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Category for organizing filters in menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Brightness, contrast, histogram operations
    Adjust,
    /// Smoothing and sharpening
    Blur,
    /// Edge and gradient detection
    Edge,
    /// Morphological operations
    Morphology,
    /// Binarization
    Threshold,
    /// Region segmentation
    Segmentation,
    /// Anything else
    Utility,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Adjust => "Adjust",
            Category::Blur => "Blur",
            Category::Edge => "Edge",
            Category::Morphology => "Morphology",
            Category::Threshold => "Threshold",
            Category::Segmentation => "Segmentation",
            Category::Utility => "Utility",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Utility
    }
}

/// Definition of a filter parameter, used to build dialogs and document defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Key in the parameter bag
    pub name: String,
    /// Value used when the key is missing
    pub default_value: ParamValue,
    /// Description for tooltips
    pub description: String,
}

impl ParameterDefinition {
    /// Create a parameter definition.
    pub fn new(name: impl Into<String>, default_value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            description: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Metadata describing a filter kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterMetadata {
    /// Provider library
    pub library: Library,
    /// Name within the library (e.g. "gaussian")
    pub name: String,
    /// Human-readable name (e.g. "Gaussian Blur")
    pub display_name: String,
    /// Category for menu organization
    pub category: Category,
    /// Detailed description
    pub description: String,
    /// Known parameters and their defaults
    pub parameters: Vec<ParameterDefinition>,
}

impl FilterMetadata {
    /// Create a new metadata builder.
    pub fn builder(library: Library, name: impl Into<String>, display_name: impl Into<String>) -> FilterMetadataBuilder {
        FilterMetadataBuilder::new(library, name, display_name)
    }

    /// Find a parameter definition by name.
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Dialog signal conventionally used for this filter kind.
    pub fn signal(&self) -> String {
        format!("{}_{}", self.library.as_str(), self.name)
    }
}

/// Builder for FilterMetadata.
pub struct FilterMetadataBuilder {
    metadata: FilterMetadata,
}

impl FilterMetadataBuilder {
    /// Create a new builder with required fields.
    pub fn new(library: Library, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            metadata: FilterMetadata {
                library,
                name: name.into(),
                display_name: display_name.into(),
                category: Category::default(),
                description: String::new(),
                parameters: Vec::new(),
            },
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: Category) -> Self {
        self.metadata.category = category;
        self
    }

    /// Add a parameter definition.
    pub fn parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.metadata.parameters.push(parameter);
        self
    }

    /// Build the metadata.
    pub fn build(self) -> FilterMetadata {
        self.metadata
    }
}

/// A filter instance bound to its parameters.
///
/// Implementations must be pure: the same image and parameters always give
/// byte-identical output, since cached results stand in for replays.
/// Missing parameters fall back to defaults; values that cannot be used must
/// produce an error rather than a quietly wrong image.
pub trait Filter: Send + Sync {
    /// Describe the filter kind.
    fn metadata(&self) -> FilterMetadata;

    /// Apply the filter to one image.
    fn apply(&self, image: &DynamicImage) -> FilterResult<DynamicImage>;
}

/// A filter that returns its input unchanged.
#[derive(Debug, Clone, Default)]
pub struct IdentityFilter;

impl Filter for IdentityFilter {
    fn metadata(&self) -> FilterMetadata {
        FilterMetadata::builder(Library::Composite, "identity", "Identity")
            .description("Pass the image through unchanged")
            .category(Category::Utility)
            .build()
    }

    fn apply(&self, image: &DynamicImage) -> FilterResult<DynamicImage> {
        Ok(image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = FilterMetadata::builder(Library::OpenCv, "gaussian", "Gaussian Blur")
            .description("Blur")
            .category(Category::Blur)
            .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Odd kernel size"))
            .build();

        assert_eq!(metadata.category, Category::Blur);
        assert_eq!(metadata.signal(), "opencv_gaussian");
        assert_eq!(
            metadata.get_parameter("kernel_size").map(|p| &p.default_value),
            Some(&ParamValue::Integer(1))
        );
        assert!(metadata.get_parameter("sigma").is_none());
    }

    #[test]
    fn test_identity_filter() {
        let image = DynamicImage::new_luma8(3, 3);
        let output = IdentityFilter.apply(&image).unwrap();
        assert_eq!(output.as_bytes(), image.as_bytes());
    }
}
