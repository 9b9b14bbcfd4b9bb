//! Built-in filter implementations.
//!
//! Three provider libraries ship with the crate: `composite`, `opencv` and
//! `scikit`. A fourth, `pil`, is declared but carries no filters, so every
//! lookup in it misses.

mod blur;
mod color;
mod composite;
mod edge;
mod morphology;
mod opencv;
mod pixels;
mod scikit;
mod segmentation;
mod threshold;

use crate::core::context::ParameterContext;
use crate::core::error::FilterResult;
use crate::core::node::{Filter, FilterMetadata};
use crate::core::types::{Library, Parameters};
use crate::filters::registry::FilterRegistry;
use image::DynamicImage;
use std::sync::Arc;

/// Signature of a built-in filter body.
pub(crate) type ApplyFn = fn(&DynamicImage, &ParameterContext<'_>) -> FilterResult<DynamicImage>;

/// Register all built-in filters.
pub fn register_all(registry: &mut FilterRegistry) {
    composite::register(registry);
    opencv::register(registry);
    scikit::register(registry);
    registry.declare_library(Library::Pil);
}

/// A built-in filter kind bound to one parameter bag.
#[derive(Clone)]
pub struct BuiltinFilter {
    metadata: Arc<FilterMetadata>,
    parameters: Parameters,
    apply: ApplyFn,
}

impl BuiltinFilter {
    /// Parameters this instance was created with.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl std::fmt::Debug for BuiltinFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinFilter")
            .field("library", &self.metadata.library)
            .field("name", &self.metadata.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl Filter for BuiltinFilter {
    fn metadata(&self) -> FilterMetadata {
        (*self.metadata).clone()
    }

    fn apply(&self, image: &DynamicImage) -> FilterResult<DynamicImage> {
        let ctx = ParameterContext::new(&self.metadata.name, &self.parameters);
        (self.apply)(image, &ctx)
    }
}

/// Register one built-in kind.
pub(crate) fn register_builtin(registry: &mut FilterRegistry, metadata: FilterMetadata, apply: ApplyFn) {
    let metadata = Arc::new(metadata);
    registry.register(move |parameters| {
        Box::new(BuiltinFilter {
            metadata: Arc::clone(&metadata),
            parameters,
            apply,
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FilterError;
    use image::{GrayImage, Luma};

    fn sample() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(12, 12, |x, y| Luma([((x * 17 + y * 29) % 256) as u8])))
    }

    #[test]
    fn test_every_builtin_runs_with_defaults() {
        let registry = FilterRegistry::with_builtins();
        let image = sample();

        for entry in registry.entries() {
            let metadata = &entry.metadata;
            let filter = registry
                .create(metadata.library, &metadata.name, Parameters::new())
                .unwrap();
            let output = filter
                .apply(&image)
                .unwrap_or_else(|e| panic!("{}/{} failed: {}", metadata.library, metadata.name, e));
            assert_eq!(output.width(), image.width(), "{}/{}", metadata.library, metadata.name);
            assert_eq!(output.height(), image.height(), "{}/{}", metadata.library, metadata.name);
        }
    }

    #[test]
    fn test_every_builtin_survives_tiny_images() {
        let registry = FilterRegistry::with_builtins();

        for (w, h) in [(0, 0), (1, 1), (2, 1)] {
            for level in [90, 255] {
                let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([level])));
                for entry in registry.entries() {
                    let metadata = &entry.metadata;
                    let filter = registry
                        .create(metadata.library, &metadata.name, Parameters::new())
                        .unwrap();
                    if let Ok(output) = filter.apply(&image) {
                        let size = (output.width(), output.height());
                        assert_eq!(size, (w, h), "{}x{} {}/{}", w, h, metadata.library, metadata.name);
                    }
                }
            }
        }
    }

    #[test]
    fn test_every_builtin_is_deterministic() {
        let registry = FilterRegistry::with_builtins();
        let image = sample();

        for entry in registry.entries() {
            let metadata = &entry.metadata;
            let filter = registry
                .create(metadata.library, &metadata.name, Parameters::new())
                .unwrap();
            let first = filter.apply(&image).unwrap();
            let second = filter.apply(&image).unwrap();
            assert_eq!(first.as_bytes(), second.as_bytes(), "{}/{}", metadata.library, metadata.name);
        }
    }

    #[test]
    fn test_documented_defaults_match_behaviour() {
        let registry = FilterRegistry::with_builtins();
        let image = sample();

        for entry in registry.entries() {
            let metadata = &entry.metadata;
            let explicit: Parameters = metadata
                .parameters
                .iter()
                .map(|p| (p.name.clone(), p.default_value.clone()))
                .collect();

            let implicit = registry
                .create(metadata.library, &metadata.name, Parameters::new())
                .unwrap()
                .apply(&image)
                .unwrap();
            let spelled_out = registry
                .create(metadata.library, &metadata.name, explicit)
                .unwrap()
                .apply(&image)
                .unwrap();
            assert_eq!(implicit.as_bytes(), spelled_out.as_bytes(), "{}/{}", metadata.library, metadata.name);
        }
    }

    #[test]
    fn test_invalid_parameter_names_the_filter() {
        let registry = FilterRegistry::with_builtins();
        let filter = registry
            .create(Library::Scikit, "gaussian", Parameters::new().with("sigma", -1.0))
            .unwrap();

        match filter.apply(&sample()) {
            Err(FilterError::InvalidParameter { filter, parameter, .. }) => {
                assert_eq!(filter, "gaussian");
                assert_eq!(parameter, "sigma");
            }
            other => panic!("expected InvalidParameter, got {:?}", other.map(|_| ())),
        }
    }
}
