// vigil-preprocess/src/scratch.rs
use image::RgbImage;
use ndarray::{Array4, ArrayView4};

/// Reusable buffers for one analysis thread.
///
/// Owned by whoever runs the pipeline, never shared between threads.
pub struct Scratch {
    pub(crate) upright: RgbImage,
    pub(crate) resized: Vec<u8>,
    pub(crate) letterboxed: RgbImage,
    pub(crate) tensor: Array4<f32>,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            upright: RgbImage::new(0, 0),
            resized: Vec::new(),
            letterboxed: RgbImage::new(0, 0),
            tensor: Array4::zeros((0, 0, 0, 0)),
        }
    }

    /// Pre-size the model-side buffers for `input_size`.
    pub fn with_input_size(input_size: u32) -> Self {
        let t = input_size as usize;
        Self {
            upright: RgbImage::new(0, 0),
            resized: Vec::with_capacity(t * t * 3),
            letterboxed: RgbImage::new(input_size, input_size),
            tensor: Array4::zeros((1, 3, t, t)),
        }
    }

    /// The last captured upright image.
    pub fn upright(&self) -> &RgbImage {
        &self.upright
    }

    /// The last letterboxed model input.
    pub fn letterboxed(&self) -> &RgbImage {
        &self.letterboxed
    }

    pub fn tensor(&self) -> ArrayView4<'_, f32> {
        self.tensor.view()
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}
