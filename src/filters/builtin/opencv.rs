//! Filters of the `opencv` provider.
//!
//! Parameter names and defaults follow OpenCV's conventions: odd aperture
//! sizes, rectangular structuring elements, integer threshold type codes.

use super::morphology::{Element, Operation};
use super::threshold::ThresholdType;
use super::{blur, color, edge, morphology, register_builtin, threshold};
use crate::core::context::ParameterContext;
use crate::core::error::FilterResult;
use crate::core::node::{Category, FilterMetadata, FilterMetadataBuilder, ParameterDefinition};
use crate::core::types::Library;
use crate::filters::registry::FilterRegistry;
use image::DynamicImage;

/// Register the OpenCV provider.
pub fn register(registry: &mut FilterRegistry) {
    register_builtin(registry, bilateral_metadata(), bilateral);
    register_builtin(registry, morphology_metadata("black_hat", "Black Hat", 3), black_hat);
    register_builtin(registry, brightness_metadata(), brightness);
    register_builtin(registry, canny_metadata(), canny);
    register_builtin(registry, morphology_metadata("closing", "Closing", 1), closing);
    register_builtin(registry, contrast_metadata(), contrast);
    register_builtin(registry, dog_metadata(), difference_of_gaussians);
    register_builtin(registry, iterated_metadata("dilation", "Dilation"), dilation);
    register_builtin(registry, iterated_metadata("erosion", "Erosion"), erosion);
    register_builtin(registry, gaussian_metadata(), gaussian);
    register_builtin(registry, equalization_metadata(), histogram_equalization);
    register_builtin(registry, laplacian_metadata(), laplacian);
    register_builtin(registry, median_metadata(), median);
    register_builtin(
        registry,
        morphology_metadata("morphological_gradient", "Morphological Gradient", 3),
        morphological_gradient,
    );
    register_builtin(registry, morphology_metadata("opening", "Opening", 1), opening);
    register_builtin(registry, scharr_metadata(), scharr);
    register_builtin(registry, sharpen_metadata(), sharpen);
    register_builtin(registry, sobel_metadata(), sobel);
    register_builtin(registry, threshold_metadata(), threshold);
    register_builtin(registry, morphology_metadata("top_hat", "Top Hat", 3), top_hat);
}

fn builder(name: &str, display_name: &str, category: Category) -> FilterMetadataBuilder {
    FilterMetadata::builder(Library::OpenCv, name, display_name).category(category)
}

// ============================================================================
// Parameter helpers
// ============================================================================

/// Kernel size rounded up to the next odd value.
fn rounded_kernel(ctx: &ParameterContext<'_>, default: i64) -> FilterResult<u32> {
    let size = ctx.get_integer_in("kernel_size", default, 1, 255)? as u32;
    Ok(if size % 2 == 0 { size + 1 } else { size })
}

fn structuring_element(ctx: &ParameterContext<'_>, default: i64) -> FilterResult<Element> {
    Ok(Element::rect(ctx.get_integer_in("kernel_size", default, 1, 255)? as u32))
}

/// Derivative orders with negative values clamped and an all-zero pair turned into `dy = 1`.
fn derivative_orders(ctx: &ParameterContext<'_>) -> FilterResult<(u32, u32)> {
    let dx = ctx.get_integer("dx", 1)?.max(0);
    let dy = ctx.get_integer("dy", 0)?.max(0);
    if dx > 2 {
        return Err(ctx.invalid("dx", format!("derivative order must be at most 2, got {}", dx)));
    }
    if dy > 2 {
        return Err(ctx.invalid("dy", format!("derivative order must be at most 2, got {}", dy)));
    }
    if dx + dy == 0 {
        return Ok((0, 1));
    }
    Ok((dx as u32, dy as u32))
}

/// Smooth the image for apertures wider than the 3x3 kernels.
fn widen(image: &DynamicImage, aperture: u32) -> DynamicImage {
    if aperture > 3 {
        blur::gaussian(image, blur::sigma_for_kernel(aperture))
    } else {
        image.clone()
    }
}

// ============================================================================
// Adjust
// ============================================================================

fn brightness_metadata() -> FilterMetadata {
    builder("brightness", "Brightness", Category::Adjust)
        .description("Add a constant to every pixel, saturating at the ends of the range")
        .parameter(ParameterDefinition::new("amount", 0).with_description("Offset added to every channel"))
        .build()
}

fn brightness(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::shift(image, ctx.get_float("amount", 0.0)?))
}

fn contrast_metadata() -> FilterMetadata {
    builder("contrast", "Contrast", Category::Adjust)
        .description("Scale pixel values about the image mean")
        .parameter(ParameterDefinition::new("amount", 1.0).with_description("Gain; 1 leaves the image unchanged"))
        .build()
}

fn contrast(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::scale_about_mean(image, ctx.get_float("amount", 1.0)?))
}

fn equalization_metadata() -> FilterMetadata {
    builder("histogram_equalization", "Histogram Equalization", Category::Adjust)
        .description("Spread the grayscale histogram over the full range")
        .build()
}

fn histogram_equalization(image: &DynamicImage, _ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(color::equalize(image))
}

// ============================================================================
// Blur
// ============================================================================

fn bilateral_metadata() -> FilterMetadata {
    builder("bilateral", "Bilateral Filter", Category::Blur)
        .description("Edge-preserving smoothing")
        .parameter(ParameterDefinition::new("diameter", 1).with_description("Neighbourhood diameter; 0 derives it from sigma_space"))
        .parameter(ParameterDefinition::new("sigma_color", 1).with_description("Intensity falloff"))
        .parameter(ParameterDefinition::new("sigma_space", 1).with_description("Spatial falloff in pixels"))
        .build()
}

fn bilateral(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let diameter = ctx.get_integer_in("diameter", 1, 0, 255)?;
    let sigma_color = ctx.get_positive_float("sigma_color", 1.0)?;
    let sigma_space = ctx.get_positive_float("sigma_space", 1.0)?;

    let radius = if diameter == 0 {
        (sigma_space * 1.5).round() as u32
    } else {
        diameter as u32 / 2
    };
    Ok(blur::bilateral(image, radius, sigma_color, sigma_space))
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
        .description("Gaussian blur with the sigma derived from the kernel size")
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Aperture; even sizes are rounded up"))
        .build()
}

fn gaussian(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let size = rounded_kernel(ctx, 1)?;
    if size == 1 {
        return Ok(image.clone());
    }
    Ok(blur::gaussian(image, blur::sigma_for_kernel(size)))
}

fn median_metadata() -> FilterMetadata {
    builder("median", "Median Blur", Category::Blur)
        .description("Replace each pixel by the median of its neighbourhood")
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Aperture; even sizes are rounded up"))
        .build()
}

fn median(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let size = rounded_kernel(ctx, 1)?;
    Ok(blur::median(image, size / 2))
}

fn sharpen_metadata() -> FilterMetadata {
    builder("sharpen", "Sharpen", Category::Blur)
        .description("Blend with a high-boost kernel")
        .parameter(ParameterDefinition::new("amount", 0).with_description("Strength in percent"))
        .build()
}

fn sharpen(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    Ok(blur::sharpen_kernel(image, ctx.get_float("amount", 0.0)?))
}

// ============================================================================
// Edge
// ============================================================================

fn canny_metadata() -> FilterMetadata {
    builder("canny", "Canny Edge Detection", Category::Edge)
        .description("Canny edge detector with hysteresis")
        .parameter(ParameterDefinition::new("lower_threshold", 1).with_description("Weak edge threshold"))
        .parameter(ParameterDefinition::new("upper_threshold", 10).with_description("Strong edge threshold"))
        .build()
}

fn canny(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let lower = ctx.get_float("lower_threshold", 1.0)?;
    let upper = ctx.get_float("upper_threshold", 10.0)?;
    if lower < 0.0 {
        return Err(ctx.invalid("lower_threshold", "must not be negative"));
    }
    let (low, high) = if lower <= upper { (lower, upper) } else { (upper, lower) };
    Ok(edge::canny(image, low as f32, high as f32))
}

fn laplacian_metadata() -> FilterMetadata {
    builder("laplacian", "Laplacian Edge Detection", Category::Edge)
        .description("Second-derivative edge response")
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Odd aperture size"))
        .build()
}

fn laplacian(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let size = ctx.get_odd_kernel("kernel_size", 1)?;
    if size == 1 {
        return Ok(edge::laplacian(image));
    }
    Ok(edge::kernel_response(&widen(image, size), &edge::LAPLACIAN_WIDE, 1.0, 0.0))
}

fn scharr_metadata() -> FilterMetadata {
    builder("scharr", "Scharr Operator", Category::Edge)
        .description("First derivative with the Scharr kernel")
        .parameter(ParameterDefinition::new("dx", 1).with_description("Horizontal derivative order"))
        .parameter(ParameterDefinition::new("dy", 0).with_description("Vertical derivative order"))
        .parameter(ParameterDefinition::new("scale", 1.0).with_description("Response multiplier"))
        .parameter(ParameterDefinition::new("delta", 0).with_description("Offset added to the response"))
        .build()
}

fn scharr(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let (dx, dy) = derivative_orders(ctx)?;
    if dx + dy != 1 {
        return Err(ctx.invalid("dx", format!("exactly one derivative of order 1 is supported, got dx={} dy={}", dx, dy)));
    }
    let scale = ctx.get_float("scale", 1.0)? as f32;
    let delta = ctx.get_float("delta", 0.0)? as f32;
    Ok(edge::kernel_response(image, &edge::scharr_kernel(dx), scale, delta))
}

fn sobel_metadata() -> FilterMetadata {
    builder("sobel", "Sobel Edge Detection", Category::Edge)
        .description("Image derivative with the Sobel operator")
        .parameter(ParameterDefinition::new("dx", 1).with_description("Horizontal derivative order"))
        .parameter(ParameterDefinition::new("dy", 0).with_description("Vertical derivative order"))
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Odd aperture size"))
        .build()
}

fn sobel(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let (dx, dy) = derivative_orders(ctx)?;
    let size = ctx.get_odd_kernel("kernel_size", 1)?;
    let kernel = edge::sobel_kernel(dx, dy, size > 1);
    Ok(edge::kernel_response(&widen(image, size), &kernel, 1.0, 0.0))
}

// ============================================================================
// Morphology
// ============================================================================

fn morphology_metadata(name: &str, display_name: &str, default_size: i64) -> FilterMetadata {
    builder(name, display_name, Category::Morphology)
        .description(format!("{} with a square structuring element", display_name))
        .parameter(ParameterDefinition::new("kernel_size", default_size).with_description("Structuring element size"))
        .build()
}

fn iterated_metadata(name: &str, display_name: &str) -> FilterMetadata {
    builder(name, display_name, Category::Morphology)
        .description(format!("{} with a square structuring element", display_name))
        .parameter(ParameterDefinition::new("kernel_size", 1).with_description("Structuring element size"))
        .parameter(ParameterDefinition::new("iterations", 1).with_description("Number of passes"))
        .build()
}

fn morph(image: &DynamicImage, ctx: &ParameterContext<'_>, op: Operation, default_size: i64) -> FilterResult<DynamicImage> {
    Ok(morphology::apply(image, op, structuring_element(ctx, default_size)?, 1))
}

fn iterated(image: &DynamicImage, ctx: &ParameterContext<'_>, op: Operation) -> FilterResult<DynamicImage> {
    let element = structuring_element(ctx, 1)?;
    let iterations = ctx.get_integer_in("iterations", 1, 0, 100)? as u32;
    Ok(morphology::apply(image, op, element, iterations))
}

fn black_hat(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    morph(image, ctx, Operation::BlackHat, 3)
}

fn closing(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    morph(image, ctx, Operation::Close, 1)
}

fn dilation(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    iterated(image, ctx, Operation::Dilate)
}

fn erosion(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    iterated(image, ctx, Operation::Erode)
}

fn morphological_gradient(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    morph(image, ctx, Operation::Gradient, 3)
}

fn opening(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    morph(image, ctx, Operation::Open, 1)
}

fn top_hat(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    morph(image, ctx, Operation::TopHat, 3)
}

// ============================================================================
// Threshold
// ============================================================================

const OTSU: &str = "Otsu's Binarization";
const ADAPTIVE_MEAN: &str = "Adaptive Mean";
const ADAPTIVE_GAUSSIAN: &str = "Adaptive Gaussian";

fn threshold_metadata() -> FilterMetadata {
    builder("threshold", "Threshold", Category::Threshold)
        .description("Fixed, Otsu or adaptive thresholding")
        .parameter(
            ParameterDefinition::new("method", "Binary")
                .with_description("Binary, Otsu's Binarization, Adaptive Mean or Adaptive Gaussian"),
        )
        .parameter(ParameterDefinition::new("argument", 0).with_description("Threshold type code"))
        .parameter(ParameterDefinition::new("threshold", 127).with_description("Fixed threshold level"))
        .parameter(ParameterDefinition::new("block_size", 11).with_description("Adaptive neighbourhood size (odd)"))
        .parameter(ParameterDefinition::new("c", 2).with_description("Constant subtracted from the adaptive mean"))
        .build()
}

fn threshold(image: &DynamicImage, ctx: &ParameterContext<'_>) -> FilterResult<DynamicImage> {
    let method = ctx.get_string("method", "Binary")?;
    let code = ctx.get_integer("argument", 0)?;
    let kind = ThresholdType::from_code(code)
        .ok_or_else(|| ctx.invalid("argument", format!("unknown threshold type {}", code)))?;
    let gray = super::pixels::gray(image);

    let result = match method {
        OTSU => threshold::fixed(&gray, threshold::otsu_level(&gray) as f64, kind),
        ADAPTIVE_MEAN | ADAPTIVE_GAUSSIAN => {
            let inverted = match kind {
                ThresholdType::Binary => false,
                ThresholdType::BinaryInv => true,
                _ => return Err(ctx.invalid("argument", "adaptive thresholding needs a binary type")),
            };
            let block = ctx.get_integer_in("block_size", 11, 3, 255)?;
            if block % 2 == 0 {
                return Err(ctx.invalid("block_size", format!("must be odd, got {}", block)));
            }
            let c = ctx.get_float("c", 2.0)?;
            if method == ADAPTIVE_MEAN {
                threshold::adaptive_mean(&gray, block as u32, c, inverted)
            } else {
                threshold::adaptive_gaussian(&gray, block as u32, c, inverted)
            }
        }
        _ => threshold::fixed(&gray, ctx.get_float("threshold", 127.0)?, kind),
    };
    Ok(DynamicImage::ImageLuma8(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FilterError;
    use crate::core::types::Parameters;
    use image::{GrayImage, Luma};

    fn run(name: &str, parameters: Parameters, image: &DynamicImage) -> FilterResult<DynamicImage> {
        let registry = FilterRegistry::with_builtins();
        registry.create(Library::OpenCv, name, parameters)?.apply(image)
    }

    fn ramp() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(8, 8, |x, y| Luma([(x * 20 + y * 10) as u8])))
    }

    #[test]
    fn test_register_covers_all_kinds() {
        let mut registry = FilterRegistry::new();
        register(&mut registry);
        assert_eq!(registry.filters_in(Library::OpenCv).len(), 20);
    }

    #[test]
    fn test_neutral_defaults_leave_image_unchanged() {
        let image = ramp();
        for name in ["brightness", "contrast", "sharpen", "gaussian", "median", "dilation", "erosion", "opening", "closing"] {
            let output = run(name, Parameters::new(), &image).unwrap();
            assert_eq!(output.as_bytes(), image.as_bytes(), "{}", name);
        }
    }

    #[test]
    fn test_brightness_amount() {
        let output = run("brightness", Parameters::new().with("amount", 10), &ramp()).unwrap();
        assert_eq!(output.to_luma8().get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn test_even_kernel_rounds_up() {
        let image = ramp();
        let even = run("median", Parameters::new().with("kernel_size", 2), &image).unwrap();
        let odd = run("median", Parameters::new().with("kernel_size", 3), &image).unwrap();
        assert_eq!(even.as_bytes(), odd.as_bytes());
    }

    #[test]
    fn test_threshold_methods() {
        let image = ramp();
        let binary = run("threshold", Parameters::new().with("threshold", 100), &image).unwrap();
        assert!(binary.as_bytes().iter().all(|&v| v == 0 || v == 255));

        for method in [OTSU, ADAPTIVE_MEAN, ADAPTIVE_GAUSSIAN] {
            let output = run("threshold", Parameters::new().with("method", method), &image).unwrap();
            assert!(output.as_bytes().iter().all(|&v| v == 0 || v == 255), "{}", method);
        }

        let error = run("threshold", Parameters::new().with("argument", 6), &image).unwrap_err();
        assert!(matches!(error, FilterError::InvalidParameter { ref parameter, .. } if parameter == "argument"));
    }

    #[test]
    fn test_derivative_orders_are_normalised() {
        let image = ramp();
        let zero = run("sobel", Parameters::new().with("dx", 0).with("dy", 0), &image).unwrap();
        let vertical = run("sobel", Parameters::new().with("dx", 0).with("dy", 1), &image).unwrap();
        assert_eq!(zero.as_bytes(), vertical.as_bytes());

        let both = run("scharr", Parameters::new().with("dx", 1).with("dy", 1), &image);
        assert!(both.is_err());
    }

    #[test]
    fn test_invalid_kernel_fails() {
        let image = ramp();
        assert!(run("laplacian", Parameters::new().with("kernel_size", 4), &image).is_err());
        assert!(run("gaussian", Parameters::new().with("kernel_size", 0), &image).is_err());
        assert!(run("bilateral", Parameters::new().with("sigma_color", 0), &image).is_err());
    }
}
