//! Global and adaptive binarization.

use super::blur::sigma_for_kernel;
use super::pixels::{clamp_u8, integral, lut_from, window_mean};
use image::{GrayImage, Luma};

/// Fixed-level threshold kinds, numbered as OpenCV numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThresholdType {
    Binary,
    BinaryInv,
    Trunc,
    ToZero,
    ToZeroInv,
}

impl ThresholdType {
    /// Decode a type code. Flag bits above the low three (e.g. the Otsu flag) are ignored.
    pub fn from_code(code: i64) -> Option<Self> {
        match code & 7 {
            0 => Some(Self::Binary),
            1 => Some(Self::BinaryInv),
            2 => Some(Self::Trunc),
            3 => Some(Self::ToZero),
            4 => Some(Self::ToZeroInv),
            _ => None,
        }
    }

    fn map(self, v: f64, level: f64, max: f64) -> f64 {
        let above = v > level;
        match self {
            Self::Binary => if above { max } else { 0.0 },
            Self::BinaryInv => if above { 0.0 } else { max },
            Self::Trunc => if above { level } else { v },
            Self::ToZero => if above { v } else { 0.0 },
            Self::ToZeroInv => if above { 0.0 } else { v },
        }
    }
}

/// Threshold every pixel against one level.
pub(crate) fn fixed(gray: &GrayImage, level: f64, kind: ThresholdType) -> GrayImage {
    let lut = lut_from(|v| kind.map(v, level, 255.0));
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| Luma([lut[gray.get_pixel(x, y)[0] as usize]]))
}

/// Otsu's global level.
pub(crate) fn otsu_level(gray: &GrayImage) -> u8 {
    imageproc::contrast::otsu_level(gray)
}

/// Binarize against a per-pixel level map: `v > level(x, y) - c`.
fn against_map(gray: &GrayImage, levels: impl Fn(u32, u32) -> f64, c: f64, inverted: bool) -> GrayImage {
    let (on, off) = if inverted { (0, 255) } else { (255, 0) };
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0] as f64;
        Luma([if v > levels(x, y) - c { on } else { off }])
    })
}

/// Adaptive threshold against the mean of a `block x block` window.
pub(crate) fn adaptive_mean(gray: &GrayImage, block: u32, c: f64, inverted: bool) -> GrayImage {
    let (w, h) = gray.dimensions();
    let table = integral(gray);
    let radius = block / 2;
    against_map(gray, |x, y| window_mean(&table, w, h, x, y, radius), c, inverted)
}

/// Adaptive threshold against a Gaussian-weighted window.
pub(crate) fn adaptive_gaussian(gray: &GrayImage, block: u32, c: f64, inverted: bool) -> GrayImage {
    let weighted = imageproc::filter::gaussian_blur_f32(gray, sigma_for_kernel(block));
    against_map(gray, |x, y| weighted.get_pixel(x, y)[0] as f64, c, inverted)
}

/// Local threshold surface: Gaussian-weighted neighbourhood mean minus `offset`.
///
/// This is the level map itself, not a binarized image.
pub(crate) fn local_levels(gray: &GrayImage, block: u32, offset: f64) -> GrayImage {
    let sigma = ((block as f32 - 1.0) / 6.0).max(0.1);
    let weighted = imageproc::filter::gaussian_blur_f32(gray, sigma);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([clamp_u8(weighted.get_pixel(x, y)[0] as f64 - offset)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> GrayImage {
        GrayImage::from_fn(4, 1, |x, _| Luma([(x * 80) as u8]))
    }

    fn row(image: &GrayImage) -> Vec<u8> {
        image.pixels().map(|p| p[0]).collect()
    }

    #[test]
    fn test_fixed_kinds() {
        let image = ramp(); // 0, 80, 160, 240
        assert_eq!(row(&fixed(&image, 100.0, ThresholdType::Binary)), vec![0, 0, 255, 255]);
        assert_eq!(row(&fixed(&image, 100.0, ThresholdType::BinaryInv)), vec![255, 255, 0, 0]);
        assert_eq!(row(&fixed(&image, 100.0, ThresholdType::Trunc)), vec![0, 80, 100, 100]);
        assert_eq!(row(&fixed(&image, 100.0, ThresholdType::ToZero)), vec![0, 0, 160, 240]);
        assert_eq!(row(&fixed(&image, 100.0, ThresholdType::ToZeroInv)), vec![0, 80, 0, 0]);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(ThresholdType::from_code(0), Some(ThresholdType::Binary));
        assert_eq!(ThresholdType::from_code(8), Some(ThresholdType::Binary));
        assert_eq!(ThresholdType::from_code(9), Some(ThresholdType::BinaryInv));
        assert_eq!(ThresholdType::from_code(5), None);
    }

    #[test]
    fn test_otsu_splits_bimodal() {
        let image = GrayImage::from_fn(10, 1, |x, _| Luma([if x < 5 { 20 } else { 220 }]));
        let level = otsu_level(&image);
        assert!((20..220).contains(&level));
    }

    #[test]
    fn test_adaptive_mean_on_flat_image() {
        let flat = GrayImage::from_pixel(6, 6, Luma([100]));
        // v > mean - c holds everywhere for positive c
        assert!(adaptive_mean(&flat, 3, 2.0, false).pixels().all(|p| p[0] == 255));
        assert!(adaptive_mean(&flat, 3, 2.0, true).pixels().all(|p| p[0] == 0));
        assert!(adaptive_gaussian(&flat, 3, 2.0, false).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_local_levels_subtracts_offset() {
        let flat = GrayImage::from_pixel(6, 6, Luma([100]));
        assert!(local_levels(&flat, 35, 10.0).pixels().all(|p| p[0] == 90));
    }
}
