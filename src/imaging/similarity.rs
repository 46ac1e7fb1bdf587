//! Average-hash (aHash) similarity.
//!
//! An image is resized to a small grid, converted to BT.601 luma, and each
//! cell becomes one bit: set when the cell is strictly brighter than the grid
//! mean. Two fingerprints are compared by Hamming distance.
//!
//! Uniform images always produce an all-zero fingerprint, so any two
//! single-colour logos score 100 against each other.

use std::fmt;

use image::{DynamicImage, RgbaImage};

use crate::error::{LogoError, Result};
use crate::imaging::{decode, resize, GridSize};

// == Luma Grid ==
/// Row-major 8-bit luminance values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaGrid {
    width: u32,
    height: u32,
    values: Vec<u8>,
}

impl LumaGrid {
    /// Builds a grid from row-major values. `values.len()` must be `width * height`.
    pub fn from_values(width: u32, height: u32, values: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(LogoError::LengthMismatch {
                left: values.len(),
                right: expected,
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// A grid where every cell holds `value`.
    pub fn uniform(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            values: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.values.iter().map(|&v| v as u64).sum();
        sum as f64 / self.values.len() as f64
    }
}

/// BT.601 luma, truncated to 8 bits.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) as u8
}

// == Grayscale ==
/// Converts RGBA pixels to luma. Fully transparent pixels read as black.
pub fn grayscale(pixels: &RgbaImage) -> LumaGrid {
    let values = pixels
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            if a == 0 {
                0
            } else {
                luma(r, g, b)
            }
        })
        .collect();

    LumaGrid {
        width: pixels.width(),
        height: pixels.height(),
        values,
    }
}

// == Fingerprint ==
/// One bit per grid cell, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bits: Vec<bool>,
}

impl Fingerprint {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Sets each bit whose cell is strictly above the grid mean.
pub fn fingerprint(grid: &LumaGrid) -> Fingerprint {
    let mean = grid.mean();
    Fingerprint {
        bits: grid.values.iter().map(|&v| v as f64 > mean).collect(),
    }
}

/// Resizes, grayscales and fingerprints a decoded image.
pub fn fingerprint_image(image: &DynamicImage, grid: GridSize) -> Fingerprint {
    fingerprint(&grayscale(&resize(image, grid)))
}

// == Comparison ==
/// Count of positions where the two fingerprints differ.
pub fn hamming_distance(a: &Fingerprint, b: &Fingerprint) -> Result<usize> {
    if a.len() != b.len() {
        return Err(LogoError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.bits.iter().zip(&b.bits).filter(|(x, y)| x != y).count())
}

/// `100 × (1 − distance / length)`, in [0, 100]. Two empty fingerprints are identical.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> Result<f64> {
    let distance = hamming_distance(a, b)?;
    if a.is_empty() {
        return Ok(100.0);
    }
    Ok(100.0 * (1.0 - distance as f64 / a.len() as f64))
}

/// Decodes two encoded images and scores them on a `grid`-sized fingerprint.
pub fn compare(a: &[u8], b: &[u8], grid: GridSize) -> Result<f64> {
    let fp_a = fingerprint_image(&decode(a)?, grid);
    let fp_b = fingerprint_image(&decode(b)?, grid);
    similarity(&fp_a, &fp_b)
}
