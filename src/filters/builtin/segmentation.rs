//! Marker-based region segmentation.
//!
//! The pipeline thresholds the image, cleans the mask with a morphological
//! operation, keeps the cores of the foreground via a distance transform,
//! labels the cores as markers and floods the whole image from them.
//! Pixels where two flooded regions meet are painted as boundaries.

use super::morphology::{self, Element, Operation};
use super::pixels::gray;
use super::threshold::{self, ThresholdType};
use image::{DynamicImage, GrayImage, Luma, Rgb};
use imageproc::distance_transform::{distance_transform, Norm};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::VecDeque;

/// Color painted on region boundaries.
pub(crate) const BOUNDARY: Rgb<u8> = Rgb([255, 0, 0]);

/// Tunables of the segmentation pipeline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settings {
    pub threshold: f64,
    pub threshold_type: ThresholdType,
    pub kernel_size: u32,
    pub operation: Operation,
    pub distance_norm: Norm,
    pub core_distance: f64,
    pub connectivity: Connectivity,
}

/// Run the pipeline; the result is always RGB.
pub(crate) fn segment(image: &DynamicImage, settings: &Settings) -> DynamicImage {
    let src = gray(image);
    // Labelling needs at least two pixels.
    if u64::from(src.width()) * u64::from(src.height()) < 2 {
        return DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(src).to_rgb8());
    }
    let mask = threshold::fixed(&src, settings.threshold, settings.threshold_type);
    let mask = morphology::apply_luma(&mask, settings.operation, Element::rect(settings.kernel_size), 1);

    let cores = core_markers(&mask, settings.distance_norm, settings.core_distance);
    let markers = connected_components(&cores, settings.connectivity, Luma([0u8]));
    let labels = flood(&markers);

    let (w, h) = src.dimensions();
    let mut out = DynamicImage::ImageLuma8(src).to_rgb8();
    for y in 0..h {
        for x in 0..w {
            if is_boundary(&labels, w, h, x, y) {
                out.put_pixel(x, y, BOUNDARY);
            }
        }
    }

    log::trace!("segmentation: {} markers", labels.iter().copied().max().unwrap_or(0));
    DynamicImage::ImageRgb8(out)
}

/// Pixels of `mask` farther than `min_distance` from the background.
fn core_markers(mask: &GrayImage, norm: Norm, min_distance: f64) -> GrayImage {
    // Distances are measured to the nearest nonzero pixel, so the mask is
    // inverted to measure distance to the background.
    let inverted = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > 0 { 0 } else { 255 }])
    });
    let distances = distance_transform(&inverted, norm);

    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let d = distances.get_pixel(x, y)[0] as f64;
        Luma([if mask.get_pixel(x, y)[0] > 0 && d > min_distance { 255 } else { 0 }])
    })
}

/// Breadth-first flood from every labelled pixel. Returns one label per pixel.
fn flood(markers: &image::ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<u32> {
    let (w, h) = markers.dimensions();
    let mut labels: Vec<u32> = markers.pixels().map(|p| p[0]).collect();
    let mut queue: VecDeque<(u32, u32)> = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            if labels[(y * w + x) as usize] > 0 {
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        let label = labels[(y * w + x) as usize];
        for (nx, ny) in neighbours(w, h, x, y) {
            let slot = &mut labels[(ny * w + nx) as usize];
            if *slot == 0 {
                *slot = label;
                queue.push_back((nx, ny));
            }
        }
    }
    labels
}

fn neighbours(w: u32, h: u32, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
    let candidates = [
        (x.checked_sub(1), Some(y)),
        (Some(x + 1).filter(|&v| v < w), Some(y)),
        (Some(x), y.checked_sub(1)),
        (Some(x), Some(y + 1).filter(|&v| v < h)),
    ];
    candidates
        .into_iter()
        .filter_map(|(nx, ny)| Some((nx?, ny?)))
}

/// A pixel is on a boundary when a neighbour carries a smaller nonzero label.
fn is_boundary(labels: &[u32], w: u32, h: u32, x: u32, y: u32) -> bool {
    let label = labels[(y * w + x) as usize];
    label > 0
        && neighbours(w, h, x, y).any(|(nx, ny)| {
            let other = labels[(ny * w + nx) as usize];
            other > 0 && other < label
        })
}
