//! Imaging Module
//!
//! Decodes logo bytes, resizes them to fixed grids, and scores perceptual similarity.

mod decode;
mod similarity;


pub use decode::{decode, resize, resize_to_png, GridSize, MAX_GRID_EDGE};
pub use similarity::{
    compare, fingerprint, fingerprint_image, grayscale, hamming_distance, luma, similarity,
    Fingerprint, LumaGrid,
};
