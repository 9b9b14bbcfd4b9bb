//! Filters of the `scikit` provider.
//!
//! These follow scikit-image's parameter names. Intensities that scikit-image
//! expresses as fractions of the full range (`sigma_color`, Canny thresholds)
//! are given as fractions here too. The morphology kinds work on a binary
//! mask taken at mid-gray.

use super::morphology::{Element, Operation};
use super::pixels::{gray, saturating_sub};
use super::threshold;
use super::{blur, color, edge, morphology, register_builtin};
use crate::core::context::ParameterContext;
use crate::core::error::FilterResult;
use crate::core::node::{Category, FilterMetadata, FilterMetadataBuilder, ParameterDefinition};
use crate::core::types::Library;
use crate::filters::registry::FilterRegistry;
use image::{DynamicImage, GrayImage, Luma};

/// Full intensity range used to scale fractional parameters.
const FULL_RANGE: f64 = 255.0;

/// Sobel gradient magnitude of a maximal step, used to scale Canny thresholds.
const CANNY_RANGE: f64 = 4.0 * FULL_RANGE;

/// Mask level for the binary morphology kinds.
const MASK_LEVEL: u8 = 128;

/// Register the scikit-image provider.
pub fn register(registry: &mut FilterRegistry) {
    register_builtin(registry, bilateral_metadata(), bilateral);
    register_builtin(registry, binary_metadata("black_hat", "Black Hat"), black_hat);
    register_builtin(registry, brightness_metadata(), brightness);
    register_builtin(registry, canny_metadata(), canny);
    register_builtin(registry, binary_metadata("closing", "Closing"), closing);
    register_builtin(registry, contrast_metadata(), contrast);
    register_builtin(registry, dog_metadata(), difference_of_gaussians);
    register_builtin(registry, footprint_metadata("dilation", "Dilation"), dilation);
    register_builtin(registry, footprint_metadata("erosion", "Erosion"), erosion);
    register_builtin(registry, gaussian_metadata(), gaussian);
    register_builtin(registry, plain_metadata("histogram_equalization", "Histogram Equalization", Category::Adjust), histogram_equalization);
    register_builtin(registry, plain_metadata("laplacian", "Laplacian Edge Detection", Category::Edge), laplacian);
    register_builtin(registry, median_metadata(), median);
    register_builtin(
        registry,
        plain_metadata("morphological_gradient", "Morphological Gradient", Category::Morphology),
        morphological_gradient,
    );
    register_builtin(registry, binary_metadata("opening", "Opening"), opening);
    register_builtin(registry, plain_metadata("scharr", "Scharr Operator", Category::Edge), scharr);
    register_builtin(registry, sharpen_metadata(), sharpen);
    register_builtin(registry, plain_metadata("sobel", "Sobel Edge Detection", Category::Edge), sobel);
    register_builtin(registry, threshold_metadata(), threshold);
    register_builtin(registry, binary_metadata("top_hat", "Top Hat"), top_hat);
}

fn builder(name: &str, display_name: &str, category: Category) -> FilterMetadataBuilder {
    FilterMetadata::builder(Library::Scikit, name, display_name).category(category)
}

fn plain_metadata(name: &str, display_name: &str, category: Category) -> FilterMetadata {
    builder(name, display_name, category).description(display_name).build()
}

fn luma(image: GrayImage) -> DynamicImage {
    DynamicImage::ImageLuma8(image)
}

// ============================================================================
// Adjust
// ============================================================================

fn brightness_metadata() -> FilterMetadata {
    builder("brightness", "Brightness", Category::Adjust)
        .description("Gamma correction")
        .parameter(ParameterDefinition::new("gamma", 1.0).with_description("Exponent; below 1 brightens"))
        .build()
}

fn brightness(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::gamma(image, ctx.get_positive_float("gamma", 1.0)?))
}

fn contrast_metadata() -> FilterMetadata {
    builder("contrast", "Contrast", Category::Adjust)
        .description("Stretch intensities to the full range, then scale")
        .parameter(ParameterDefinition::new("contrast", 1.0).with_description("Multiplier after stretching"))
        .build()
}

fn contrast(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::rescale(image, ctx.get_float("contrast", 1.0)?))
}

fn histogram_equalization(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::equalize(image))
}

// ============================================================================
// Blur
// ============================================================================

fn bilateral_metadata() -> FilterMetadata {
    builder("bilateral", "Bilateral Filter", Category::Blur)
        .description("Edge-preserving denoising")
        .parameter(ParameterDefinition::new("sigma_color", 1.0).with_description("Intensity falloff as a fraction of the range"))
        .parameter(ParameterDefinition::new("sigma_spatial", 1.0).with_description("Spatial falloff in pixels"))
        .build()
}

fn bilateral(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let sigma_color = ctx.get_positive_float("sigma_color", 1.0)? * FULL_RANGE;
    let sigma_spatial = ctx.get_positive_float("sigma_spatial", 1.0)?;
    let window = (2.0 * (3.0 * sigma_spatial).ceil() + 1.0).max(5.0);
    Ok(blur::bilateral(image, (window / 2.0) as u32, sigma_color, sigma_spatial))
}

fn dog_metadata() -> FilterMetadata {
    builder("difference_of_gaussians", "Difference of Gaussians", Category::Blur)
        .description("Band-pass filter: the difference of two Gaussian blurs")
        .parameter(ParameterDefinition::new("sigma1", 1.0).with_description("Narrow blur sigma"))
        .parameter(ParameterDefinition::new("sigma2", 2.0).with_description("Wide blur sigma"))
        .build()
}

fn difference_of_gaussians(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let sigma1 = ctx.get_positive_float("sigma1", 1.0)? as f32;
    let sigma2 = ctx.get_positive_float("sigma2", 2.0)? as f32;
    Ok(blur::difference_of_gaussians(image, sigma1, sigma2))
}

fn gaussian_metadata() -> FilterMetadata {
    builder("gaussian", "Gaussian Blur", Category::Blur)
        .description("Gaussian blur")
        .parameter(ParameterDefinition::new("sigma", 1.0).with_description("Standard deviation in pixels"))
        .build()
}

fn gaussian(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(blur::gaussian(image, ctx.get_positive_float("sigma", 1.0)? as f32))
}

fn median_metadata() -> FilterMetadata {
    builder("median", "Median Blur", Category::Blur)
        .description("Median over a square footprint")
        .parameter(ParameterDefinition::new("kernel_size", 3).with_description("Footprint side length"))
        .build()
}

fn median(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let size = ctx.get_integer_in("kernel_size", 3, 1, 255)? as u32;
    Ok(blur::median(image, size / 2))
}

fn sharpen_metadata() -> FilterMetadata {
    builder("sharpen", "Sharpen", Category::Blur)
        .description("Unsharp masking")
        .parameter(ParameterDefinition::new("alpha", 1.5).with_description("Blur radius of the mask"))
        .parameter(ParameterDefinition::new("amount", 1.0).with_description("Strength of the detail boost"))
        .build()
}

fn sharpen(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let radius = ctx.get_positive_float("alpha", 1.5)? as f32;
    let amount = ctx.get_float("amount", 1.0)?;
    Ok(blur::unsharp_mask(image, radius, amount))
}

// ============================================================================
// Edge
// ============================================================================

fn canny_metadata() -> FilterMetadata {
    builder("canny", "Canny Edge Detection", Category::Edge)
        .description("Canny edge detector; thresholds are fractions of the maximal gradient")
        .parameter(ParameterDefinition::new("sigma", 1.0).with_description("Pre-smoothing sigma"))
        .parameter(ParameterDefinition::new("low_threshold", 0.1).with_description("Weak edge threshold"))
        .parameter(ParameterDefinition::new("high_threshold", 0.2).with_description("Strong edge threshold"))
        .build()
}

fn canny(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let sigma = ctx.get_positive_float("sigma", 1.0)? as f32;
    let low = ctx.get_float("low_threshold", 0.1)?;
    let high = ctx.get_float("high_threshold", 0.2)?;
    if low < 0.0 {
        return Err(ctx.invalid("low_threshold", "must not be negative"));
    }
    if high < low {
        return Err(ctx.invalid("high_threshold", format!("must be at least low_threshold ({})", low)));
    }

    let smoothed = blur::gaussian(&luma(gray(image)), sigma);
    Ok(edge::canny(&smoothed, (low * CANNY_RANGE) as f32, (high * CANNY_RANGE) as f32))
}

fn laplacian(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(edge::laplacian(image))
}

fn scharr(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    // Normalised kernels (1/16) and the RMS of both directions.
    let scale = 1.0 / (16.0 * std::f32::consts::SQRT_2);
    Ok(edge::magnitude(image, &edge::scharr_kernel(1), &edge::scharr_kernel(0), scale))
}

fn sobel(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let scale = 1.0 / (4.0 * std::f32::consts::SQRT_2);
    Ok(edge::magnitude(
        image,
        &edge::sobel_kernel(1, 0, true),
        &edge::sobel_kernel(0, 1, true),
        scale,
    ))
}

// ============================================================================
// Morphology
// ============================================================================

fn binary_metadata(name: &str, display_name: &str) -> FilterMetadata {
    builder(name, display_name, Category::Morphology)
        .description(format!("Binary {} with a cross-shaped footprint", display_name.to_lowercase()))
        .parameter(ParameterDefinition::new("iterations", 1).with_description("Passes of each elementary step"))
        .build()
}

fn footprint_metadata(name: &str, display_name: &str) -> FilterMetadata {
    builder(name, display_name, Category::Morphology)
        .description(format!("Binary {} with a 3x3 square footprint", display_name.to_lowercase()))
        .build()
}

/// Binary mask of the pixels brighter than mid-gray.
fn mask(image: &DynamicImage) -> GrayImage {
    let src = gray(image);
    GrayImage::from_fn(src.width(), src.height(), |x, y| {
        Luma([if src.get_pixel(x, y)[0] > MASK_LEVEL { 255 } else { 0 }])
    })
}

/// Symmetric difference of two binary masks.
fn xor(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| Luma([a.get_pixel(x, y)[0] ^ b.get_pixel(x, y)[0]]))
}

fn iterations(ctx: &ParameterContext<'_>) -> FilterResult<u32> {
    Ok(ctx.get_integer_in("iterations", 1, 0, 100)? as u32)
}

/// Open (`erode` first) or close (`dilate` first) with `n` passes of each step.
fn binary_pair(binary: &GrayImage, first: Operation, second: Operation, n: u32) -> GrayImage {
    let element = Element::diamond();
    let stepped = morphology::apply_luma(binary, first, element, n);
    morphology::apply_luma(&stepped, second, element, n)
}

fn opening(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let n = iterations(ctx)?;
    Ok(luma(binary_pair(&mask(image), Operation::Erode, Operation::Dilate, n)))
}

fn closing(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let n = iterations(ctx)?;
    Ok(luma(binary_pair(&mask(image), Operation::Dilate, Operation::Erode, n)))
}

fn top_hat(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let n = iterations(ctx)?;
    let binary = mask(image);
    let opened = binary_pair(&binary, Operation::Erode, Operation::Dilate, n);
    Ok(luma(xor(&binary, &opened)))
}

fn black_hat(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let n = iterations(ctx)?;
    let binary = mask(image);
    let closed = binary_pair(&binary, Operation::Dilate, Operation::Erode, n);
    Ok(luma(xor(&binary, &closed)))
}

fn dilation(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(luma(morphology::apply_luma(&mask(image), Operation::Dilate, Element::rect(3), 1)))
}

fn erosion(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(luma(morphology::apply_luma(&mask(image), Operation::Erode, Element::rect(3), 1)))
}

fn morphological_gradient(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let binary = mask(image);
    let element = Element::diamond();
    let dilated = morphology::apply_luma(&binary, Operation::Dilate, element, 1);
    let eroded = morphology::apply_luma(&binary, Operation::Erode, element, 1);
    Ok(luma(saturating_sub(&dilated, &eroded)))
}

// ============================================================================
// Threshold
// ============================================================================

fn threshold_metadata() -> FilterMetadata {
    builder("threshold", "Threshold", Category::Threshold)
        .description("Otsu, local or fixed thresholding")
        .parameter(ParameterDefinition::new("method", "otsu").with_description("otsu, local or binary"))
        .parameter(ParameterDefinition::new("block_size", 35).with_description("Local neighbourhood size (odd)"))
        .parameter(ParameterDefinition::new("offset", 0).with_description("Subtracted from the local level"))
        .parameter(ParameterDefinition::new("threshold", 128).with_description("Level for the binary method"))
        .build()
}

fn threshold(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let src = gray(image);
    let result = match ctx.get_string("method", "otsu")? {
        "otsu" => threshold::fixed(&src, threshold::otsu_level(&src) as f64, threshold::ThresholdType::Binary),
        "binary" => threshold::fixed(&src, ctx.get_float("threshold", 128.0)?, threshold::ThresholdType::Binary),
        "local" => {
            let block = ctx.get_integer_in("block_size", 35, 3, 255)?;
            if block % 2 == 0 {
                return Err(ctx.invalid("block_size", format!("must be odd, got {}", block)));
            }
            threshold::local_levels(&src, block as u32, ctx.get_float("offset", 0.0)?)
        }
        other => return Err(ctx.invalid("method", format!("unknown method '{}'", other))),
    };
    Ok(luma(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FilterError;
    use crate::core::types::Parameters;

    fn run(name: &str, parameters: Parameters, image: &DynamicImage) -> FilterResult<DynamicImage> {
        let registry = FilterRegistry::with_builtins();
        registry.create(Library::Scikit, name, parameters)?.apply(image)
    }

    /// A bright 5x5 square with a one-pixel hole in the middle.
    fn square_with_hole() -> DynamicImage {
        luma(GrayImage::from_fn(9, 9, |x, y| {
            let inside = (2..7).contains(&x) && (2..7).contains(&y);
            Luma([if inside && (x, y) != (4, 4) { 250 } else { 0 }])
        }))
    }

    #[test]
    fn test_register_covers_all_kinds() {
        let mut registry = FilterRegistry::new();
        register(&mut registry);
        assert_eq!(registry.filters_in(Library::Scikit).len(), 20);
    }

    #[test]
    fn test_gamma_one_is_identity() {
        let image = square_with_hole();
        let output = run("brightness", Parameters::new(), &image).unwrap();
        assert_eq!(output.as_bytes(), image.as_bytes());
    }

    #[test]
    fn test_closing_fills_hole_and_black_hat_finds_it() {
        let image = square_with_hole();
        let closed = run("closing", Parameters::new(), &image).unwrap().to_luma8();
        assert_eq!(closed.get_pixel(4, 4)[0], 255);

        let hat = run("black_hat", Parameters::new(), &image).unwrap().to_luma8();
        assert_eq!(hat.get_pixel(4, 4)[0], 255);
        assert_eq!(hat.get_pixel(3, 3)[0], 0);
    }

    #[test]
    fn test_threshold_output_is_binary_for_otsu() {
        let output = run("threshold", Parameters::new(), &square_with_hole()).unwrap();
        assert!(output.as_bytes().iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn test_threshold_rejects_unknown_method() {
        let error = run("threshold", Parameters::new().with("method", "triangle"), &square_with_hole()).unwrap_err();
        assert_eq!(
            error,
            FilterError::InvalidParameter {
                filter: "threshold".to_string(),
                parameter: "method".to_string(),
                reason: "unknown method 'triangle'".to_string(),
            }
        );
    }

    #[test]
    fn test_canny_threshold_order_is_checked() {
        let params = Parameters::new().with("low_threshold", 0.5).with("high_threshold", 0.1);
        assert!(run("canny", params, &square_with_hole()).is_err());
    }
}
