//! Grayscale morphology with square or diamond structuring elements.

use super::pixels::{gray, saturating_sub};
use image::{DynamicImage, GrayImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Structuring element: a shape and a radius in pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element {
    pub norm: Norm,
    pub radius: u8,
}

impl Element {
    /// Square element covering a `size x size` window.
    pub fn rect(size: u32) -> Self {
        Self {
            norm: Norm::LInf,
            radius: (size / 2).min(u8::MAX as u32) as u8,
        }
    }

    /// Cross-shaped element of radius one.
    pub fn diamond() -> Self {
        Self { norm: Norm::L1, radius: 1 }
    }
}

/// Morphological operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Erode,
    Dilate,
    Open,
    Close,
    Gradient,
    TopHat,
    BlackHat,
}

fn apply_gray(src: &GrayImage, op: Operation, element: Element) -> GrayImage {
    let Element { norm, radius } = element;
    if radius == 0 {
        return match op {
            Operation::Gradient | Operation::TopHat | Operation::BlackHat => {
                GrayImage::new(src.width(), src.height())
            }
            _ => src.clone(),
        };
    }

    match op {
        Operation::Erode => morphology::erode(src, norm, radius),
        Operation::Dilate => morphology::dilate(src, norm, radius),
        Operation::Open => morphology::open(src, norm, radius),
        Operation::Close => morphology::close(src, norm, radius),
        Operation::Gradient => saturating_sub(
            &morphology::dilate(src, norm, radius),
            &morphology::erode(src, norm, radius),
        ),
        Operation::TopHat => saturating_sub(src, &morphology::open(src, norm, radius)),
        Operation::BlackHat => saturating_sub(&morphology::close(src, norm, radius), src),
    }
}

/// Apply `op` `iterations` times on the grayscale channel.
pub(crate) fn apply(image: &DynamicImage, op: Operation, element: Element, iterations: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(apply_luma(&gray(image), op, element, iterations))
}

/// Same as [`apply`] on a grayscale buffer.
pub(crate) fn apply_luma(image: &GrayImage, op: Operation, element: Element, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = apply_gray(&out, op, element);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn dot() -> DynamicImage {
        let mut image = GrayImage::new(7, 7);
        image.put_pixel(3, 3, Luma([255]));
        DynamicImage::ImageLuma8(image)
    }

    fn count_on(image: &DynamicImage) -> usize {
        image.as_bytes().iter().filter(|&&v| v > 0).count()
    }

    #[test]
    fn test_dilate_grows_square_and_diamond() {
        assert_eq!(count_on(&apply(&dot(), Operation::Dilate, Element::rect(3), 1)), 9);
        assert_eq!(count_on(&apply(&dot(), Operation::Dilate, Element::diamond(), 1)), 5);
        assert_eq!(count_on(&apply(&dot(), Operation::Dilate, Element::rect(3), 2)), 25);
    }

    #[test]
    fn test_unit_kernel_is_identity() {
        let out = apply(&dot(), Operation::Erode, Element::rect(1), 3);
        assert_eq!(out.as_bytes(), dot().as_bytes());
    }

    #[test]
    fn test_open_removes_dot_and_top_hat_keeps_it() {
        assert_eq!(count_on(&apply(&dot(), Operation::Open, Element::rect(3), 1)), 0);
        assert_eq!(count_on(&apply(&dot(), Operation::TopHat, Element::rect(3), 1)), 1);
        assert_eq!(count_on(&apply(&dot(), Operation::BlackHat, Element::rect(3), 1)), 0);
    }

    #[test]
    fn test_gradient_is_ring() {
        let out = apply(&dot(), Operation::Gradient, Element::rect(3), 1);
        assert_eq!(count_on(&out), 9);
    }
}
