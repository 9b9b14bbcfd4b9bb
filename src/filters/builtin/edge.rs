//! Edge and gradient detectors.

use super::pixels::{abs_to_gray, convolve3x3, gray};
use image::{DynamicImage, GrayImage, Luma};

const SMOOTH: [f32; 3] = [1.0, 2.0, 1.0];
const PASS: [f32; 3] = [0.0, 1.0, 0.0];
const FIRST: [f32; 3] = [-1.0, 0.0, 1.0];
const SECOND: [f32; 3] = [1.0, -2.0, 1.0];

const SCHARR_SMOOTH: [f32; 3] = [3.0, 10.0, 3.0];

/// Separable 3x3 kernel `column ⊗ row`.
fn outer(column: &[f32; 3], row: &[f32; 3]) -> [f32; 9] {
    let mut kernel = [0.0f32; 9];
    for (r, cv) in column.iter().enumerate() {
        for (c, rv) in row.iter().enumerate() {
            kernel[r * 3 + c] = cv * rv;
        }
    }
    kernel
}

fn derivative(order: u32, smooth: bool) -> &'static [f32; 3] {
    match order {
        0 if smooth => &SMOOTH,
        0 => &PASS,
        1 => &FIRST,
        _ => &SECOND,
    }
}

/// Sobel kernel for the given derivative orders (each 0..=2).
///
/// Without smoothing the zero-order axis is a pass-through, as for a 1-wide aperture.
pub(crate) fn sobel_kernel(dx: u32, dy: u32, smooth: bool) -> [f32; 9] {
    outer(derivative(dy, smooth), derivative(dx, smooth))
}

/// Scharr kernel; exactly one of `dx`, `dy` is 1.
pub(crate) fn scharr_kernel(dx: u32) -> [f32; 9] {
    if dx == 1 {
        outer(&SCHARR_SMOOTH, &FIRST)
    } else {
        outer(&FIRST, &SCHARR_SMOOTH)
    }
}

/// Canny edge detector with hysteresis thresholds.
pub(crate) fn canny(image: &DynamicImage, low: f32, high: f32) -> DynamicImage {
    let src = gray(image);
    if src.width() == 0 || src.height() == 0 {
        return DynamicImage::ImageLuma8(src);
    }
    DynamicImage::ImageLuma8(imageproc::edges::canny(&src, low, high))
}

/// Absolute response of a 3x3 kernel, `|v * scale + delta|`.
pub(crate) fn kernel_response(image: &DynamicImage, kernel: &[f32; 9], scale: f32, delta: f32) -> DynamicImage {
    let src = gray(image);
    let (w, h) = src.dimensions();
    DynamicImage::ImageLuma8(abs_to_gray(&convolve3x3(&src, kernel), w, h, scale, delta))
}

/// Gradient magnitude `sqrt(gx² + gy²)` of a kernel pair, scaled by `scale`.
pub(crate) fn magnitude(image: &DynamicImage, horizontal: &[f32; 9], vertical: &[f32; 9], scale: f32) -> DynamicImage {
    let src = gray(image);
    let (w, h) = src.dimensions();
    let gx = convolve3x3(&src, horizontal);
    let gy = convolve3x3(&src, vertical);

    let out = GrayImage::from_fn(w, h, |x, y| {
        let i = (y * w + x) as usize;
        let m = (gx[i] * gx[i] + gy[i] * gy[i]).sqrt() * scale;
        Luma([m.round().clamp(0.0, 255.0) as u8])
    });
    DynamicImage::ImageLuma8(out)
}

/// 4-neighbour Laplacian.
pub(crate) const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Laplacian built from smoothed second derivatives.
pub(crate) const LAPLACIAN_WIDE: [f32; 9] = [2.0, 0.0, 2.0, 0.0, -8.0, 0.0, 2.0, 0.0, 2.0];

/// Absolute 4-neighbour Laplacian response.
pub(crate) fn laplacian(image: &DynamicImage) -> DynamicImage {
    kernel_response(image, &LAPLACIAN, 1.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Left half black, right half white.
    fn step() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 0 } else { 200 }])))
    }

    #[test]
    fn test_sobel_kernel_shape() {
        assert_eq!(sobel_kernel(1, 0, true), [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0]);
        assert_eq!(sobel_kernel(0, 1, true), [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0]);
        assert_eq!(sobel_kernel(1, 0, false), [0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(scharr_kernel(1), [-3.0, 0.0, 3.0, -10.0, 0.0, 10.0, -3.0, 0.0, 3.0]);
    }

    #[test]
    fn test_horizontal_gradient_finds_vertical_edge() {
        let out = kernel_response(&step(), &sobel_kernel(1, 0, true), 1.0, 0.0).to_luma8();
        assert_eq!(out.get_pixel(0, 4)[0], 0);
        assert_eq!(out.get_pixel(4, 4)[0], 255);

        let across = kernel_response(&step(), &sobel_kernel(0, 1, true), 1.0, 0.0);
        assert!(across.as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_laplacian_flat_is_zero() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([77])));
        assert!(laplacian(&flat).as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_canny_marks_step() {
        let out = canny(&step(), 10.0, 50.0);
        assert!(out.as_bytes().iter().any(|&v| v == 255));
    }

    #[test]
    fn test_canny_on_empty_image() {
        let out = canny(&DynamicImage::ImageLuma8(GrayImage::new(0, 0)), 10.0, 50.0);
        assert_eq!((out.width(), out.height()), (0, 0));
    }

    #[test]
    fn test_magnitude_combines_directions() {
        let out = magnitude(&step(), &sobel_kernel(1, 0, true), &sobel_kernel(0, 1, true), 0.25).to_luma8();
        // 4 * 200 / 4
        assert_eq!(out.get_pixel(4, 4)[0], 200);
    }
}
