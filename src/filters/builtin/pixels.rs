//! Shared pixel helpers for the built-in filters.
//!
//! Everything here is deterministic: parallel loops only ever write disjoint
//! rows, and floating point reductions run sequentially.

use image::{DynamicImage, GrayImage, Luma};
use rayon::prelude::*;

/// Apply a 256-entry lookup table to every color channel, keeping alpha.
///
/// Grayscale and RGB buffers keep their layout; anything else is widened to RGBA.
pub(crate) fn map_lut(image: &DynamicImage, lut: &[u8; 256]) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = gray.clone();
            let raw: &mut [u8] = &mut out;
            raw.par_iter_mut().for_each(|v| *v = lut[*v as usize]);
            DynamicImage::ImageLuma8(out)
        }
        DynamicImage::ImageRgb8(rgb) => {
            let mut out = rgb.clone();
            let raw: &mut [u8] = &mut out;
            raw.par_iter_mut().for_each(|v| *v = lut[*v as usize]);
            DynamicImage::ImageRgb8(out)
        }
        other => {
            let mut out = other.to_rgba8();
            let raw: &mut [u8] = &mut out;
            raw.par_chunks_mut(4).for_each(|px| {
                for c in &mut px[..3] {
                    *c = lut[*c as usize];
                }
            });
            DynamicImage::ImageRgba8(out)
        }
    }
}

/// Build a lookup table from a float transfer function, rounding and clamping.
pub(crate) fn lut_from(f: impl Fn(f64) -> f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = clamp_u8(f(i as f64));
    }
    lut
}

/// Round and clamp to the u8 range.
pub(crate) fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// 8-bit grayscale view of any image.
pub(crate) fn gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(g) => g.clone(),
        other => other.to_luma8(),
    }
}

/// Mean intensity of a grayscale image.
pub(crate) fn mean(gray: &GrayImage) -> f64 {
    let raw: &[u8] = gray;
    if raw.is_empty() {
        return 0.0;
    }
    let sum: u64 = raw.iter().map(|&v| v as u64).sum();
    sum as f64 / raw.len() as f64
}

/// Minimum and maximum intensity.
pub(crate) fn intensity_range(gray: &GrayImage) -> (u8, u8) {
    let raw: &[u8] = gray;
    let min = raw.iter().copied().min().unwrap_or(0);
    let max = raw.iter().copied().max().unwrap_or(0);
    (min, max)
}

/// Convolve with a 3x3 kernel, replicating border pixels.
pub(crate) fn convolve3x3(gray: &GrayImage, kernel: &[f32; 9]) -> Vec<f32> {
    let (w, h) = gray.dimensions();
    let mut out = vec![0.0f32; (w as usize) * (h as usize)];
    if w == 0 || h == 0 {
        return out;
    }

    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, w as i64 - 1) as u32;
        let cy = y.clamp(0, h as i64 - 1) as u32;
        gray.get_pixel(cx, cy)[0] as f32
    };

    out.par_chunks_mut(w as usize).enumerate().for_each(|(y, row)| {
        let y = y as i64;
        for (x, slot) in row.iter_mut().enumerate() {
            let x = x as i64;
            let mut acc = 0.0f32;
            for ky in 0..3i64 {
                for kx in 0..3i64 {
                    acc += kernel[(ky * 3 + kx) as usize] * at(x + kx - 1, y + ky - 1);
                }
            }
            *slot = acc;
        }
    });
    out
}

/// Convert signed responses to an image via `|v * scale + delta|`, saturating.
pub(crate) fn abs_to_gray(values: &[f32], width: u32, height: u32, scale: f32, delta: f32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = values[(y * width + x) as usize];
        Luma([clamp_u8(((v * scale + delta).abs()) as f64)])
    })
}

/// Convert signed responses to an image, clamping negatives to zero.
pub(crate) fn clamped_to_gray(values: &[f32], width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([clamp_u8(values[(y * width + x) as usize] as f64)]))
}

/// Stretch absolute responses so the largest maps to 255.
pub(crate) fn normalize_to_gray(values: &[f32], width: u32, height: u32) -> GrayImage {
    let peak = values.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
    let scale = if peak > 0.0 { 255.0 / peak } else { 0.0 };
    abs_to_gray(values, width, height, scale, 0.0)
}

/// `a - b`, saturating at zero.
pub(crate) fn saturating_sub(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].saturating_sub(b.get_pixel(x, y)[0])])
    })
}

/// `a * alpha + b * beta + gamma`, rounded and clamped.
pub(crate) fn add_weighted(a: &GrayImage, alpha: f64, b: &GrayImage, beta: f64, gamma: f64) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let va = a.get_pixel(x, y)[0] as f64;
        let vb = b.get_pixel(x, y)[0] as f64;
        Luma([clamp_u8(va * alpha + vb * beta + gamma)])
    })
}

/// Summed-area table with one extra leading row and column of zeros.
pub(crate) fn integral(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = w as usize + 1;
    let mut table = vec![0u64; stride * (h as usize + 1)];
    for y in 0..h as usize {
        let mut row_sum = 0u64;
        for x in 0..w as usize {
            row_sum += gray.get_pixel(x as u32, y as u32)[0] as u64;
            table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
        }
    }
    table
}

/// Mean over the window of half-size `radius` centered on `(x, y)`, clipped to the image.
pub(crate) fn window_mean(table: &[u64], width: u32, height: u32, x: u32, y: u32, radius: u32) -> f64 {
    let stride = width as usize + 1;
    let x0 = x.saturating_sub(radius) as usize;
    let y0 = y.saturating_sub(radius) as usize;
    let x1 = (x + radius + 1).min(width) as usize;
    let y1 = (y + radius + 1).min(height) as usize;
    let sum = table[y1 * stride + x1] + table[y0 * stride + x0] - table[y0 * stride + x1] - table[y1 * stride + x0];
    let area = ((x1 - x0) * (y1 - y0)) as f64;
    sum as f64 / area
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> GrayImage {
        GrayImage::from_fn(4, 4, |x, y| Luma([(x * 10 + y * 40) as u8]))
    }

    #[test]
    fn test_lut_keeps_alpha() {
        let mut rgba = image::RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([10, 20, 30, 77]));
        let lut = lut_from(|v| v + 100.0);

        let out = map_lut(&DynamicImage::ImageRgba8(rgba), &lut).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [110, 120, 130, 77]);
    }

    #[test]
    fn test_identity_kernel() {
        let image = ramp();
        let kernel = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let values = convolve3x3(&image, &kernel);
        assert_eq!(clamped_to_gray(&values, 4, 4), image);
    }

    #[test]
    fn test_window_mean_matches_direct_sum() {
        let image = ramp();
        let table = integral(&image);
        let direct: f64 = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| image.get_pixel(x, y)[0] as f64)
            .sum::<f64>()
            / 4.0;
        assert!((window_mean(&table, 4, 4, 0, 0, 1) - direct).abs() < 1e-9);
    }

    #[test]
    fn test_mean_and_range() {
        let image = ramp();
        assert_eq!(intensity_range(&image), (0, 150));
        assert!((mean(&image) - 75.0).abs() < 1e-9);
    }
}
