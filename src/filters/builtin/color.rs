//! Intensity adjustments: brightness, contrast, gamma, histogram equalization.

use super::pixels::{gray, intensity_range, lut_from, map_lut, mean};
use image::DynamicImage;

/// Add a constant to every color channel, saturating.
pub(crate) fn shift(image: &DynamicImage, amount: f64) -> DynamicImage {
    map_lut(image, &lut_from(|v| v + amount))
}

/// Scale every channel about the image mean: `v * amount + mean * (1 - amount)`.
pub(crate) fn scale_about_mean(image: &DynamicImage, amount: f64) -> DynamicImage {
    let mean = mean(&gray(image));
    map_lut(image, &lut_from(|v| v * amount + mean * (1.0 - amount)))
}

/// Gamma correction: `255 * (v / 255) ^ gamma`.
pub(crate) fn gamma(image: &DynamicImage, gamma: f64) -> DynamicImage {
    map_lut(image, &lut_from(|v| 255.0 * (v / 255.0).powf(gamma)))
}

/// Stretch the intensity range to the full scale, then multiply by `factor`.
pub(crate) fn rescale(image: &DynamicImage, factor: f64) -> DynamicImage {
    let (low, high) = intensity_range(&gray(image));
    let span = (high as f64 - low as f64).max(1.0);
    map_lut(image, &lut_from(|v| (v - low as f64) * 255.0 / span * factor))
}

/// Equalize the grayscale histogram.
pub(crate) fn equalize(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(imageproc::contrast::equalize_histogram(&gray(image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(4, 1, |x, _| Luma([(50 + x * 50) as u8])))
    }

    fn bytes(image: &DynamicImage) -> Vec<u8> {
        image.as_bytes().to_vec()
    }

    #[test]
    fn test_shift_saturates() {
        assert_eq!(bytes(&shift(&image(), 100.0)), vec![150, 200, 250, 255]);
        assert_eq!(bytes(&shift(&image(), -60.0)), vec![0, 40, 90, 140]);
    }

    #[test]
    fn test_scale_about_mean_identity() {
        assert_eq!(bytes(&scale_about_mean(&image(), 1.0)), bytes(&image()));
        // Mean is 125; amount 0 flattens everything to it.
        assert_eq!(bytes(&scale_about_mean(&image(), 0.0)), vec![125; 4]);
    }

    #[test]
    fn test_gamma_one_is_identity() {
        assert_eq!(bytes(&gamma(&image(), 1.0)), bytes(&image()));
        assert!(bytes(&gamma(&image(), 2.0))[0] < 50);
    }

    #[test]
    fn test_rescale_stretches() {
        assert_eq!(bytes(&rescale(&image(), 1.0)), vec![0, 85, 170, 255]);
    }
}
