//! Filters of the `composite` provider: multi-step pipelines built from the
//! other primitives.

use super::morphology::Operation;
use super::register_builtin;
use super::segmentation::{self, Settings};
use super::threshold::ThresholdType;
use crate::core::context::ParameterContext;
use crate::core::error::FilterResult;
use crate::core::node::{Category, FilterMetadata, ParameterDefinition};
use crate::core::types::Library;
use crate::filters::registry::FilterRegistry;
use image::DynamicImage;
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::Connectivity;

/// Register the composite provider.
pub fn register(registry: &mut FilterRegistry) {
    register_builtin(registry, segmentation_metadata(), segmentation);
}

fn segmentation_metadata() -> FilterMetadata {
    FilterMetadata::builder(Library::Composite, "segmentation", "Segmentation")
        .description("Threshold, clean up, find region cores and outline the regions grown from them")
        .category(Category::Segmentation)
        .parameter(ParameterDefinition::new("threshold", 1).with_description("Foreground level"))
        .parameter(ParameterDefinition::new("threshold_type", 0).with_description("Threshold type code"))
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Clean-up element size"))
        .parameter(
            ParameterDefinition::new("morphology_operation", 1)
                .with_description("0 erode, 1 dilate, 2 open, 3 close, 4 gradient, 5 top hat, 6 black hat"),
        )
        .parameter(ParameterDefinition::new("distance_type", 1).with_description("1 city block, 3 chessboard"))
        .parameter(ParameterDefinition::new("distance_transform", 1).with_description("Minimum core distance"))
        .parameter(ParameterDefinition::new("connectivity", 4).with_description("Marker connectivity, 4 or 8"))
        .build()
}

fn settings(ctx: &ParameterContext<'_>) -> FilterResult<Settings> {
    let code = ctx.get_integer("threshold_type", 0)?;
    let threshold_type = ThresholdType::from_code(code)
        .ok_or_else(|| ctx.invalid("threshold_type", format!("unknown threshold type {}", code)))?;

    let operation = match ctx.get_integer("morphology_operation", 1)? {
        0 => Operation::Erode,
        1 => Operation::Dilate,
        2 => Operation::Open,
        3 => Operation::Close,
        4 => Operation::Gradient,
        5 => Operation::TopHat,
        6 => Operation::BlackHat,
        other => return Err(ctx.invalid("morphology_operation", format!("unknown operation {}", other))),
    };

    let distance_norm = match ctx.get_integer("distance_type", 1)? {
        1 => Norm::L1,
        3 => Norm::LInf,
        other => return Err(ctx.invalid("distance_type", format!("unsupported distance type {}", other))),
    };

    let connectivity = match ctx.get_integer("connectivity", 4)? {
        1 | 4 => Connectivity::Four,
        2 | 8 => Connectivity::Eight,
        other => return Err(ctx.invalid("connectivity", format!("must be 4 or 8, got {}", other))),
    };

    Ok(Settings {
        threshold: ctx.get_float("threshold", 1.0)?,
        threshold_type,
        kernel_size: ctx.get_integer_in("kernel_size", 1, 1, 255)? as u32,
        operation,
        distance_norm,
        core_distance: ctx.get_float("distance_transform", 1.0)?,
        connectivity,
    })
}

fn segmentation(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(segmentation::segment(image, &settings(ctx)?))
}
