//! Smoothing and sharpening: Gaussian, median, bilateral, difference of
//! Gaussians, kernel sharpening and unsharp masking.

use super::pixels::{add_weighted, clamp_u8, clamped_to_gray, convolve3x3, gray, normalize_to_gray};
use image::{DynamicImage, GrayImage, Luma};
use rayon::prelude::*;

/// Sigma OpenCV derives from an odd kernel size when none is given.
pub(crate) fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian blur. `sigma` must be positive.
pub(crate) fn gaussian(image: &DynamicImage, sigma: f32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(g) => DynamicImage::ImageLuma8(imageproc::filter::gaussian_blur_f32(g, sigma)),
        other => DynamicImage::ImageRgba8(imageproc::filter::gaussian_blur_f32(&other.to_rgba8(), sigma)),
    }
}

/// Median filter over a square window of half-size `radius`.
pub(crate) fn median(image: &DynamicImage, radius: u32) -> DynamicImage {
    if radius == 0 {
        return image.clone();
    }
    match image {
        DynamicImage::ImageLuma8(g) => DynamicImage::ImageLuma8(imageproc::filter::median_filter(g, radius, radius)),
        other => DynamicImage::ImageRgba8(imageproc::filter::median_filter(&other.to_rgba8(), radius, radius)),
    }
}

/// Edge-preserving bilateral filter on the grayscale channel.
///
/// `sigma_color` is in intensity units (0..255), `sigma_space` in pixels.
pub(crate) fn bilateral(image: &DynamicImage, radius: u32, sigma_color: f64, sigma_space: f64) -> DynamicImage {
    let src = gray(image);
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || radius == 0 {
        return DynamicImage::ImageLuma8(src);
    }

    let r = radius as i64;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_weights: Vec<f64> = (0..256).map(|d| ((d * d) as f64 * color_coeff).exp()).collect();

    let mut out = vec![0u8; (w as usize) * (h as usize)];
    out.par_chunks_mut(w as usize).enumerate().for_each(|(y, row)| {
        let y = y as i64;
        for (x, slot) in row.iter_mut().enumerate() {
            let x = x as i64;
            let center = src.get_pixel(x as u32, y as u32)[0] as i64;
            let mut sum = 0.0;
            let mut norm = 0.0;
            for dy in -r..=r {
                for dx in -r..=r {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let v = src.get_pixel(nx as u32, ny as u32)[0] as i64;
                    let weight = ((dx * dx + dy * dy) as f64 * space_coeff).exp()
                        * color_weights[(v - center).unsigned_abs() as usize];
                    sum += weight * v as f64;
                    norm += weight;
                }
            }
            *slot = clamp_u8(sum / norm);
        }
    });

    DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, out).unwrap_or_else(|| GrayImage::new(w, h)))
}

/// Band-pass: `|blur(sigma1) - blur(sigma2)|`, stretched to the full range.
pub(crate) fn difference_of_gaussians(image: &DynamicImage, sigma1: f32, sigma2: f32) -> DynamicImage {
    let src = gray(image);
    let (w, h) = src.dimensions();
    let narrow = imageproc::filter::gaussian_blur_f32(&src, sigma1);
    let wide = imageproc::filter::gaussian_blur_f32(&src, sigma2);

    let diff: Vec<f32> = narrow
        .pixels()
        .zip(wide.pixels())
        .map(|(a, b)| a[0] as f32 - b[0] as f32)
        .collect();

    DynamicImage::ImageLuma8(normalize_to_gray(&diff, w, h))
}

/// Blend the image with a 3x3 high-boost kernel, weighted by `amount` percent.
pub(crate) fn sharpen_kernel(image: &DynamicImage, amount: f64) -> DynamicImage {
    const HIGH_BOOST: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

    let src = gray(image);
    let (w, h) = src.dimensions();
    let sharp = clamped_to_gray(&convolve3x3(&src, &HIGH_BOOST), w, h);
    let weight = amount / 100.0;

    DynamicImage::ImageLuma8(add_weighted(&src, 1.0 + weight, &sharp, -weight, 0.0))
}

/// Unsharp mask: `v + amount * (v - blur(radius))`.
pub(crate) fn unsharp_mask(image: &DynamicImage, radius: f32, amount: f64) -> DynamicImage {
    let src = gray(image);
    let blurred = imageproc::filter::gaussian_blur_f32(&src, radius);

    let out = GrayImage::from_fn(src.width(), src.height(), |x, y| {
        let v = src.get_pixel(x, y)[0] as f64;
        let b = blurred.get_pixel(x, y)[0] as f64;
        Luma([clamp_u8(v + amount * (v - b))])
    });
    DynamicImage::ImageLuma8(out)
}
