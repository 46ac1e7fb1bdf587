//! Image decoding and fixed-size resizing.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{LogoError, Result};

/// Largest grid edge accepted for hashing or display.
pub const MAX_GRID_EDGE: u32 = 1024;

// == Grid Size ==
/// Target dimensions of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// 8×8 grid used for fingerprints.
    pub const HASH: GridSize = GridSize {
        width: 8,
        height: 8,
    };

    /// 100×100 surface used for display images.
    pub const DISPLAY: GridSize = GridSize {
        width: 100,
        height: 100,
    };

    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_GRID_EDGE || height > MAX_GRID_EDGE {
            return Err(LogoError::InvalidRequest(format!(
                "Grid size {}x{} must be between 1 and {} on each edge",
                width, height, MAX_GRID_EDGE
            )));
        }
        Ok(Self { width, height })
    }

    pub fn square(edge: u32) -> Result<Self> {
        Self::new(edge, edge)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells, which is also the fingerprint length.
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::HASH
    }
}

// == Decode ==
/// Decodes any supported image format from memory.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(LogoError::Decode("No image data".to_string()));
    }
    Ok(image::load_from_memory(bytes)?)
}

// == Resize ==
/// Scales `image` to exactly `size` with bilinear filtering, ignoring aspect.
pub fn resize(image: &DynamicImage, size: GridSize) -> RgbaImage {
    image
        .resize_exact(size.width, size.height, FilterType::Triangle)
        .to_rgba8()
}

/// Scales `image` to `size` and encodes the result as PNG.
pub fn resize_to_png(image: &DynamicImage, size: GridSize) -> Result<Vec<u8>> {
    let resized = DynamicImage::ImageRgba8(resize(image, size));
    let mut png = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| LogoError::Internal(format!("Failed to encode PNG: {}", e)))?;
    Ok(png)
}
