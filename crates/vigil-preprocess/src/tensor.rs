// vigil-preprocess/src/tensor.rs
use crate::{PreprocessError, Result};
use ndarray::Array4;
use vigil_camera::PixelFormat;

/// Allocating variant of [`pack_into`].
pub fn pack(pixels: &[u8], format: PixelFormat, width: u32, height: u32, target: u32) -> Result<Array4<f32>> {
    let mut out = Array4::zeros((1, 3, target as usize, target as usize));
    pack_into(pixels, format, width, height, target, &mut out)?;
    Ok(out)
}

/// Interleaved 8-bit pixels → `[1, 3, T, T]` planar floats in `0.0..=1.0`.
///
/// The image must already be `target`×`target`; alpha is discarded.
/// `out` is reshaped only when its shape is wrong.
pub fn pack_into(
    pixels: &[u8],
    format: PixelFormat,
    width: u32,
    height: u32,
    target: u32,
    out: &mut Array4<f32>,
) -> Result<()> {
    if width != target || height != target {
        return Err(PreprocessError::InvalidInput(format!(
            "expected a {}x{} image, got {}x{}",
            target, target, width, height
        )));
    }
    let ch = format.channels();
    let plane = target as usize * target as usize;
    if pixels.len() != plane * ch {
        return Err(PreprocessError::InvalidInput(format!(
            "expected {} bytes of {:?}, got {}",
            plane * ch,
            format,
            pixels.len()
        )));
    }

    let shape = [1, 3, target as usize, target as usize];
    if out.shape() != shape {
        *out = Array4::zeros(shape);
    }
    let buf = out
        .as_slice_mut()
        .ok_or_else(|| PreprocessError::InvalidInput("tensor is not contiguous".into()))?;
    let (r, rest) = buf.split_at_mut(plane);
    let (g, b) = rest.split_at_mut(plane);

    for (i, px) in pixels.chunks_exact(ch).enumerate() {
        r[i] = px[0] as f32 / 255.0;
        g[i] = px[1] as f32 / 255.0;
        b[i] = px[2] as f32 / 255.0;
    }
    Ok(())
}
