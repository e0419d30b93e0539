use std::collections::BTreeMap;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Metadata key marking a record whose features could not be extracted.
pub const FAILED_TO_EXTRACT: &str = "FTE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Gray8,
    Gray16,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 | Self::Gray16 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }

    pub fn bytes_per_channel(self) -> usize {
        match self {
            Self::Gray8 | Self::Rgb8 | Self::Rgba8 => 1,
            Self::Gray16 => 2,
        }
    }
}

/// Dense row-major matrix. Both images and extracted templates live here;
/// a template is a single row of `Gray8` bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mat {
    pub rows: usize,
    pub cols: usize,
    pub format: PixelFormat,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl Mat {
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            format: PixelFormat::Gray8,
            data: Vec::new(),
        }
    }

    pub fn new(rows: usize, cols: usize, format: PixelFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            rows * cols * format.channels() * format.bytes_per_channel()
        );
        Self {
            rows,
            cols,
            format,
            data,
        }
    }

    /// A `1 x n` byte row.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::new(1, bytes.len(), PixelFormat::Gray8, bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_gray8(&self) -> bool {
        self.format == PixelFormat::Gray8
    }

    pub fn total(&self) -> usize {
        self.rows * self.cols
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        match img {
            DynamicImage::ImageLuma8(buf) => {
                Self::new(h, w, PixelFormat::Gray8, buf.as_raw().clone())
            }
            DynamicImage::ImageLuma16(buf) => {
                let data = buf.as_raw().iter().flat_map(|v| v.to_ne_bytes()).collect();
                Self::new(h, w, PixelFormat::Gray16, data)
            }
            DynamicImage::ImageRgba8(buf) => {
                Self::new(h, w, PixelFormat::Rgba8, buf.as_raw().clone())
            }
            other => Self::new(h, w, PixelFormat::Rgb8, other.to_rgb8().into_raw()),
        }
    }

    /// Back to an `image` buffer. `None` when the data does not fill the dimensions.
    pub fn to_image(&self) -> Option<DynamicImage> {
        let (w, h) = (self.cols as u32, self.rows as u32);
        match self.format {
            PixelFormat::Gray8 => {
                image::GrayImage::from_raw(w, h, self.data.clone()).map(DynamicImage::ImageLuma8)
            }
            PixelFormat::Rgb8 => {
                image::RgbImage::from_raw(w, h, self.data.clone()).map(DynamicImage::ImageRgb8)
            }
            PixelFormat::Rgba8 => {
                image::RgbaImage::from_raw(w, h, self.data.clone()).map(DynamicImage::ImageRgba8)
            }
            PixelFormat::Gray16 => {
                let data = self
                    .data
                    .chunks_exact(2)
                    .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                    .collect();
                image::ImageBuffer::from_raw(w, h, data).map(DynamicImage::ImageLuma16)
            }
        }
    }
}

/// Metadata value attached to a template's file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Where a template came from, plus free-form metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub metadata: BTreeMap<String, Value>,
}

impl FileMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub file: FileMeta,
    pub m: Mat,
}

impl Template {
    pub fn new(file: FileMeta, m: Mat) -> Self {
        Self { file, m }
    }

    /// A template that only knows where its image lives.
    pub fn from_path(name: impl Into<String>) -> Self {
        Self::new(FileMeta::new(name), Mat::empty())
    }

    pub fn failed_to_extract(&self) -> bool {
        self.file.get_bool(FAILED_TO_EXTRACT)
    }

    /// Drop the matrix and flag the record as failed-to-extract.
    pub fn mark_failed(&mut self) {
        self.m = Mat::empty();
        self.file.set(FAILED_TO_EXTRACT, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_image_conversion_keeps_layout() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([10, 20, 30]));
        let m = Mat::from_image(&DynamicImage::ImageRgb8(img));
        assert_eq!((m.rows, m.cols, m.format), (2, 3, PixelFormat::Rgb8));
        assert_eq!(&m.data[15..18], &[10, 20, 30]);
        assert!(!m.is_gray8());
    }

    #[test]
    fn test_gray_roundtrip_through_image() {
        let mut img = image::GrayImage::new(4, 1);
        img.put_pixel(3, 0, Luma([200]));
        let m = Mat::from_image(&DynamicImage::ImageLuma8(img));
        assert!(m.is_gray8());
        let back = m.to_image().unwrap().to_luma8();
        assert_eq!(back.get_pixel(3, 0).0[0], 200);
    }

    #[test]
    fn test_mark_failed() {
        let mut t = Template::new(FileMeta::new("a.png"), Mat::from_bytes(vec![1, 2]));
        assert!(!t.failed_to_extract());
        t.mark_failed();
        assert!(t.failed_to_extract());
        assert!(t.m.is_empty());
    }

    #[test]
    fn test_from_bytes_empty_is_empty() {
        assert_eq!(Mat::from_bytes(Vec::new()), Mat::empty());
        assert_eq!(Mat::from_bytes(vec![7; 5]).total(), 5);
    }
}
