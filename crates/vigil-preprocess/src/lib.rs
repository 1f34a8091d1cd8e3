//! vigil‑preprocess – upright copy, letterbox and planar packing of frames.
//!
//! Stages run in this order for every analysed frame:
//!
//! 1. [`upright_rgb`] copies the frame's pixels into an upright RGB buffer
//!    (rotation applied, alpha dropped) so the camera buffer can be released.
//! 2. [`letterbox_into`] scales the image into a square model input, padding
//!    the short side, and returns the [`LetterboxInfo`] needed to undo it.
//! 3. [`pack_into`] normalises to `0.0..=1.0` and de-interleaves into the
//!    `[1, 3, T, T]` planar tensor the network expects.
//!
//! All destination buffers live in a [`Scratch`] arena owned by the caller
//! and are overwritten in full on every call.

use ndarray::ArrayView4;
use thiserror::Error;
use vigil_camera::{Frame, PixelFormat};

mod letterbox;
mod scratch;
mod tensor;
mod upright;

pub use letterbox::{letterbox, letterbox_into, LetterboxInfo, PadColor};
pub use scratch::Scratch;
pub use tensor::{pack, pack_into};
pub use upright::upright_rgb;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Resize failed: {0:?}")]
    Resize(resize::Error),
}

pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Frame → model-input converter for a fixed square input size.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    input_size: u32,
    pad_color: PadColor,
}

impl Preprocessor {
    /// Create a pre‑processor that outputs `input_size`×`input_size` tensors.
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            pad_color: PadColor::default(),
        }
    }

    pub fn with_pad_color(mut self, pad_color: PadColor) -> Self {
        self.pad_color = pad_color;
        self
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Copy the frame's pixels into `scratch` and release the frame.
    ///
    /// Returns the upright image size.
    pub fn capture(&self, frame: Frame, scratch: &mut Scratch) -> (u32, u32) {
        upright_rgb(&frame, &mut scratch.upright);
        frame.release();
        scratch.upright.dimensions()
    }

    /// Letterbox the captured image into the model input buffer.
    pub fn letterbox(&self, scratch: &mut Scratch) -> Result<LetterboxInfo> {
        letterbox_into(
            &scratch.upright,
            self.input_size,
            self.pad_color,
            &mut scratch.resized,
            &mut scratch.letterboxed,
        )
    }

    /// Pack the letterboxed image into the planar input tensor.
    pub fn pack(&self, scratch: &mut Scratch) -> Result<()> {
        let (w, h) = scratch.letterboxed.dimensions();
        pack_into(
            scratch.letterboxed.as_raw(),
            PixelFormat::Rgb8,
            w,
            h,
            self.input_size,
            &mut scratch.tensor,
        )
    }

    /// All three stages back to back.
    pub fn run<'s>(
        &self,
        frame: Frame,
        scratch: &'s mut Scratch,
    ) -> Result<(LetterboxInfo, ArrayView4<'s, f32>)> {
        self.capture(frame, scratch);
        let info = self.letterbox(scratch)?;
        self.pack(scratch)?;
        Ok((info, scratch.tensor()))
    }
}
