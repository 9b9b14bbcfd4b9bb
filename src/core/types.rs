//! Core value types that flow through the filter stack.
//!
//! Parameters use an enum-based scalar for the same reasons the rest of the
//! crate prefers closed enums:
//! - Dialogs only ever produce numbers, strings and flags
//! - Untagged serde keeps the wire shape a plain JSON object
//! - Exhaustive matching keeps the fingerprint encoder honest

use crate::core::config::LoadOptions;
use crate::core::error::FilterError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Provider library a filter is resolved from.
///
/// Several providers ship filters with the same name; the library is always
/// consulted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    /// Multi-step filters built out of several primitive operations
    Composite,
    /// Filters following OpenCV parameter conventions
    #[serde(rename = "opencv")]
    OpenCv,
    /// Filters following scikit-image parameter conventions
    Scikit,
    /// Pillow-style filters (no filters are registered by default)
    Pil,
}

impl Library {
    /// Wire name of the library.
    pub fn as_str(&self) -> &'static str {
        match self {
            Library::Composite => "composite",
            Library::OpenCv => "opencv",
            Library::Scikit => "scikit",
            Library::Pil => "pil",
        }
    }

    /// All libraries in menu order.
    pub fn all() -> &'static [Library] {
        &[Library::Composite, Library::OpenCv, Library::Scikit, Library::Pil]
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Library {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "composite" => Ok(Library::Composite),
            "opencv" => Ok(Library::OpenCv),
            "scikit" => Ok(Library::Scikit),
            "pil" => Ok(Library::Pil),
            _ => Err(FilterError::UnknownLibrary(s.to_string())),
        }
    }
}

/// A single parameter value produced by a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string (method names, enum choices)
    String(String),
}

impl ParamValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Boolean(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

/// The parameter bag of one filter.
///
/// Keys are kept sorted, so two bags holding the same entries always
/// serialize (and fingerprint) identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    /// Create an empty parameter bag.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Image metadata that is always available without touching pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Whether the buffer carries an alpha channel
    pub has_alpha: bool,
    /// Number of channels per pixel
    pub channels: u8,
}

impl ImageMetadata {
    fn of(image: &DynamicImage) -> Self {
        let color = image.color();
        Self {
            width: image.width(),
            height: image.height(),
            has_alpha: color.has_alpha(),
            channels: color.channel_count(),
        }
    }
}

/// Shared, copy-on-write image buffer.
///
/// Cloning an `ImageValue` is a logical copy: both handles share the pixels
/// until one of them asks for mutable access, at which point the writer gets
/// its own buffer. Cached images are handed out this way, so no consumer can
/// ever change what the cache holds.
#[derive(Clone)]
pub struct ImageValue {
    /// Image metadata (dimensions, channels)
    pub metadata: ImageMetadata,
    data: Arc<DynamicImage>,
}

impl ImageValue {
    /// Create a new ImageValue from a DynamicImage.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            metadata: ImageMetadata::of(&image),
            data: Arc::new(image),
        }
    }

    /// Load an image from a file path.
    pub fn from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, image::ImageError> {
        let image = image::open(path.as_ref())?;
        let image = if options.grayscale {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            image
        };
        log::debug!(
            "loaded {} ({}x{}, grayscale: {})",
            path.as_ref().display(),
            image.width(),
            image.height(),
            options.grayscale
        );
        Ok(Self::new(image))
    }

    /// Shared reference to the pixels.
    pub fn image(&self) -> &DynamicImage {
        &self.data
    }

    /// Edit the pixels in place, cloning them first if they are shared.
    ///
    /// Metadata is recomputed once `edit` returns.
    pub fn modify<R>(&mut self, edit: impl FnOnce(&mut DynamicImage) -> R) -> R {
        let result = edit(Arc::make_mut(&mut self.data));
        self.metadata = ImageMetadata::of(&self.data);
        result
    }

    /// Take ownership of the pixels, cloning if they are shared.
    pub fn into_image(self) -> DynamicImage {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    /// Raw pixel bytes in the buffer's native layout.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.metadata.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.metadata.height
    }

    /// Whether two handles share the same pixel buffer.
    pub fn shares_buffer(&self, other: &ImageValue) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Approximate heap footprint of the pixels.
    pub fn estimated_memory_size(&self) -> usize {
        self.data.as_bytes().len()
    }
}

impl PartialEq for ImageValue {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
            && self.data.color() == other.data.color()
            && self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for ImageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageValue")
            .field("width", &self.metadata.width)
            .field("height", &self.metadata.height)
            .field("channels", &self.metadata.channels)
            .field("color", &self.data.color())
            .finish()
    }
}

impl From<DynamicImage> for ImageValue {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}
