// vigil-camera/src/lib.rs
// ============================================================
// Frame hand-off layer for vigil
// The camera collaborator owns acquisition; this crate only
// defines what a delivered frame looks like and how its
// buffer is handed back once the pixels have been copied.
// ------------------------------------------------------------
// Public API:
//   * Frame::new(data, format, w, h)   – validated pixel buffer
//   * Frame::on_release(hook)          – called when the frame drops
//   * frame_stream(source)             – async stream of frames
// ============================================================

//! vigil – camera hand-off layer
//!
//! A [`Frame`] is an interleaved 8-bit pixel buffer plus the metadata the
//! analysis pipeline needs (size, row stride, sensor rotation, timestamp).
//! Frames are moved, never cloned: whoever holds the `Frame` holds the
//! upstream buffer, and dropping it runs the release hook so the camera can
//! recycle that buffer. The pipeline drops a frame as soon as its pixels have
//! been copied out.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod stream;
pub use stream::{frame_stream, FrameSource, IterSource};

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Invalid frame: {0}")]
    InvalidInput(String),
    #[error("Unsupported rotation: {0} degrees (expected 0, 90, 180 or 270)")]
    UnsupportedRotation(i32),
    #[error("Frame source failed: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, CameraError>;

/// Interleaved pixel layouts the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Clockwise rotation that brings the sensor image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            _ => Err(CameraError::UnsupportedRotation(degrees)),
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }

    /// True when width and height trade places after rotating.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Cw90 | Rotation::Cw270)
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send + 'static>;

/// One captured frame.
///
/// `stride` is the distance in bytes between row starts and may exceed
/// `width * channels` when the camera pads rows.
pub struct Frame {
    data: Vec<u8>,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub rotation: Rotation,
    pub pts: Duration,
    on_release: Option<ReleaseHook>,
}

impl Frame {
    /// Tightly packed frame (`stride == width * channels`).
    ///
    /// ```
    /// use vigil_camera::{Frame, PixelFormat};
    /// let frame = Frame::new(vec![0u8; 4 * 3 * 2], PixelFormat::Rgb8, 4, 2).unwrap();
    /// assert_eq!(frame.upright_size(), (4, 2));
    /// ```
    pub fn new(data: Vec<u8>, format: PixelFormat, width: u32, height: u32) -> Result<Self> {
        let stride = width
            .checked_mul(format.channels() as u32)
            .ok_or_else(|| CameraError::InvalidInput("frame width overflows".into()))?;
        Self::with_stride(data, format, width, height, stride)
    }

    /// Frame whose rows are `stride` bytes apart.
    pub fn with_stride(
        data: Vec<u8>,
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: u32,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidInput(format!(
                "zero-sized frame {}x{}",
                width, height
            )));
        }
        let row_bytes = width as usize * format.channels();
        if (stride as usize) < row_bytes {
            return Err(CameraError::InvalidInput(format!(
                "stride {} is shorter than a {}-byte row",
                stride, row_bytes
            )));
        }
        let needed = stride as usize * (height as usize - 1) + row_bytes;
        if data.len() < needed {
            return Err(CameraError::InvalidInput(format!(
                "expected at least {} bytes for {}x{} {:?}, got {}",
                needed,
                width,
                height,
                format,
                data.len()
            )));
        }

        Ok(Self {
            data,
            format,
            width,
            height,
            stride,
            rotation: Rotation::None,
            pts: Duration::ZERO,
            on_release: None,
        })
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = pts;
        self
    }

    /// Register a hook that runs exactly once when the frame is dropped.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Raw bytes, including any row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel bytes of row `y`, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        &self.data[start..start + self.width as usize * self.format.channels()]
    }

    /// Width and height once `rotation` has been applied.
    pub fn upright_size(&self) -> (u32, u32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Hand the buffer back to the camera now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("rotation", &self.rotation)
            .field("pts", &self.pts)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn rejects_zero_sized_frames() {
        let err = Frame::new(Vec::new(), PixelFormat::Rgb8, 0, 10).unwrap_err();
        assert!(matches!(err, CameraError::InvalidInput(_)));
    }

    #[test]
    fn rejects_short_buffers() {
        let err = Frame::new(vec![0u8; 10], PixelFormat::Rgba8, 2, 2).unwrap_err();
        assert!(matches!(err, CameraError::InvalidInput(_)));
    }

    #[test]
    fn padded_rows_are_sliced_without_padding() {
        // 2x2 RGB, rows padded to 8 bytes
        let data = vec![1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12];
        let frame = Frame::with_stride(data, PixelFormat::Rgb8, 2, 2, 8).unwrap();
        assert_eq!(frame.row(0), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.row(1), &[7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn rotation_swaps_upright_size() {
        let frame = Frame::new(vec![0u8; 6 * 4 * 3], PixelFormat::Rgb8, 6, 4)
            .unwrap()
            .with_rotation(Rotation::from_degrees(270).unwrap());
        assert_eq!(frame.upright_size(), (4, 6));
        assert!(Rotation::from_degrees(45).is_err());
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Cw270);
    }

    #[test]
    fn release_hook_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let frame = Frame::new(vec![0u8; 3], PixelFormat::Rgb8, 1, 1)
            .unwrap()
            .on_release(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        frame.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
