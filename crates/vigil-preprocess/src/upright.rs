// vigil-preprocess/src/upright.rs
use image::RgbImage;
use vigil_camera::{Frame, PixelFormat, Rotation};

/// Copy `frame` into `out` as upright RGB.
///
/// Row padding is skipped, alpha dropped and the frame's rotation applied
/// clockwise. `out` is reallocated only when the upright size changes;
/// every pixel is overwritten.
pub fn upright_rgb(frame: &Frame, out: &mut RgbImage) {
    let (uw, uh) = frame.upright_size();
    if out.dimensions() != (uw, uh) {
        *out = RgbImage::new(uw, uh);
    }
    let (w, h) = (frame.width as usize, frame.height as usize);
    let ch = frame.format.channels();
    let dst: &mut [u8] = out;

    if frame.rotation == Rotation::None && frame.format == PixelFormat::Rgb8 {
        for (y, dst_row) in dst.chunks_exact_mut(w * 3).enumerate() {
            dst_row.copy_from_slice(frame.row(y as u32));
        }
        return;
    }

    for y in 0..h {
        let row = frame.row(y as u32);
        for (x, px) in row.chunks_exact(ch).enumerate() {
            let (dx, dy) = match frame.rotation {
                Rotation::None => (x, y),
                Rotation::Cw90 => (h - 1 - y, x),
                Rotation::Cw180 => (w - 1 - x, h - 1 - y),
                Rotation::Cw270 => (y, w - 1 - x),
            };
            let at = (dy * uw as usize + dx) * 3;
            dst[at..at + 3].copy_from_slice(&px[..3]);
        }
    }
}
