// vigil-preprocess/src/letterbox.rs
use crate::{PreprocessError, Result};
use image::{Rgb, RgbImage};
use resize::{Pixel, Type};
use rgb::FromSlice;
use serde::{Deserialize, Serialize};

/// Fill colour for the padding band around the resized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadColor(pub [u8; 3]);

impl Default for PadColor {
    fn default() -> Self {
        PadColor([114, 114, 114])
    }
}

/// How a source image was placed inside the square model input.
///
/// Model-space `x` maps back to source space as `(x - pad_x) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub target_size: u32,
}

impl LetterboxInfo {
    /// Source → model space.
    pub fn forward(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.pad_x as f32,
            y * self.scale + self.pad_y as f32,
        )
    }

    /// Size of the resized image inside the padding, in model pixels.
    pub fn content_size(&self) -> (u32, u32) {
        (
            content_side(self.source_width, self.scale, self.target_size),
            content_side(self.source_height, self.scale, self.target_size),
        )
    }

    /// Model → source space.
    ///
    /// The content edges recover the source edges to within `0.5 / scale`
    /// source pixels, because the content size is rounded to whole pixels
    /// and `scale` is not. A side clamped up to one pixel is the exception.
    pub fn inverse(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

fn content_side(side: u32, scale: f32, target: u32) -> u32 {
    ((side as f32 * scale).round() as u32).clamp(1, target)
}

/// Allocating convenience wrapper around [`letterbox_into`].
pub fn letterbox(src: &RgbImage, target: u32, pad: PadColor) -> Result<(RgbImage, LetterboxInfo)> {
    let mut resized = Vec::new();
    let mut out = RgbImage::new(target, target);
    let info = letterbox_into(src, target, pad, &mut resized, &mut out)?;
    Ok((out, info))
}

/// Scale `src` to fit a `target`×`target` square and centre it on `pad`.
///
/// Odd padding remainders go to the right/bottom edge. `resized` is a
/// reusable staging buffer; `out` is reallocated only if its size differs.
pub fn letterbox_into(
    src: &RgbImage,
    target: u32,
    pad: PadColor,
    resized: &mut Vec<u8>,
    out: &mut RgbImage,
) -> Result<LetterboxInfo> {
    let (src_w, src_h) = src.dimensions();
    if src_w == 0 || src_h == 0 || target == 0 {
        return Err(PreprocessError::InvalidInput(format!(
            "cannot letterbox {}x{} into {}",
            src_w, src_h, target
        )));
    }

    let scale = target as f32 / src_w.max(src_h) as f32;
    let new_w = content_side(src_w, scale, target);
    let new_h = content_side(src_h, scale, target);

    // bilinear
    resized.resize(new_w as usize * new_h as usize * 3, 0);
    let mut resizer = resize::new(
        src_w as usize,
        src_h as usize,
        new_w as usize,
        new_h as usize,
        Pixel::RGB8,
        Type::Triangle,
    )
    .map_err(PreprocessError::Resize)?;
    resizer
        .resize(src.as_raw().as_rgb(), resized.as_rgb_mut())
        .map_err(PreprocessError::Resize)?;

    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    if out.dimensions() != (target, target) {
        *out = RgbImage::new(target, target);
    }
    for px in out.pixels_mut() {
        *px = Rgb(pad.0);
    }

    let out_row = target as usize * 3;
    let src_row = new_w as usize * 3;
    let dst: &mut [u8] = out;
    for (y, row) in resized.chunks_exact(src_row).enumerate() {
        let start = (y + pad_y as usize) * out_row + pad_x as usize * 3;
        dst[start..start + src_row].copy_from_slice(row);
    }

    log::trace!(
        "letterbox {}x{} -> {}x{} in {} (pad {},{})",
        src_w,
        src_h,
        new_w,
        new_h,
        target,
        pad_x,
        pad_y
    );

    Ok(LetterboxInfo {
        scale,
        pad_x,
        pad_y,
        source_width: src_w,
        source_height: src_h,
        target_size: target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(c))
    }

    fn close(a: u8, b: u8) -> bool {
        (a as i16 - b as i16).abs() <= 1
    }

    #[test]
    fn landscape_pads_top_and_bottom() {
        let (out, info) = letterbox(&solid(640, 480, [200, 10, 30]), 640, PadColor::default()).unwrap();
        assert_eq!(out.dimensions(), (640, 640));
        assert_eq!(info.scale, 1.0);
        assert_eq!((info.pad_x, info.pad_y), (0, 80));
        assert_eq!(out.get_pixel(10, 79).0, [114, 114, 114]);
        assert_eq!(out.get_pixel(10, 560).0, [114, 114, 114]);
        let inside = out.get_pixel(320, 320).0;
        assert!(close(inside[0], 200) && close(inside[1], 10) && close(inside[2], 30));
    }

    #[test]
    fn odd_remainder_goes_to_bottom() {
        // scale 0.7 -> 7x4, one row on top and two below
        let (out, info) = letterbox(&solid(10, 6, [0, 255, 0]), 7, PadColor([1, 2, 3])).unwrap();
        assert_eq!(info.pad_y, 1);
        assert_eq!(out.get_pixel(3, 0).0, [1, 2, 3]);
        assert!(close(out.get_pixel(3, 1).0[1], 255));
        assert!(close(out.get_pixel(3, 4).0[1], 255));
        assert_eq!(out.get_pixel(3, 5).0, [1, 2, 3]);
        assert_eq!(out.get_pixel(3, 6).0, [1, 2, 3]);
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        let (_, info) = letterbox(&solid(2000, 1, [9, 9, 9]), 64, PadColor::default()).unwrap();
        assert_eq!(info.pad_y, 31);
        assert_eq!(info.pad_x, 0);
    }

    #[test]
    fn content_edges_map_back_to_source_corners() {
        for &(w, h, t) in &[(1280u32, 720u32, 640u32), (10, 6, 7), (37, 1001, 640), (333, 333, 100)] {
            let (_, info) = letterbox(&solid(w, h, [0, 0, 0]), t, PadColor::default()).unwrap();
            let (cw, ch) = info.content_size();
            let tol = 0.5 / info.scale + 1e-3;

            let (x0, y0) = info.inverse(info.pad_x as f32, info.pad_y as f32);
            let (x1, y1) = info.inverse((info.pad_x + cw) as f32, (info.pad_y + ch) as f32);
            assert!(x0.abs() < 1e-3 && y0.abs() < 1e-3, "{}x{}: top-left {} {}", w, h, x0, y0);
            assert!((x1 - w as f32).abs() <= tol, "{}x{}: right {} (tol {})", w, h, x1, tol);
            assert!((y1 - h as f32).abs() <= tol, "{}x{}: bottom {} (tol {})", w, h, y1, tol);
        }
    }

    #[test]
    fn content_size_matches_the_copied_region() {
        // 10x6 into 7 rounds to 7x4 with one padding row on top
        let (out, info) = letterbox(&solid(10, 6, [0, 255, 0]), 7, PadColor([1, 2, 3])).unwrap();
        assert_eq!(info.content_size(), (7, 4));
        let (_, ch) = info.content_size();
        assert!(close(out.get_pixel(0, info.pad_y + ch - 1).0[1], 255));
        assert_eq!(out.get_pixel(0, info.pad_y + ch).0, [1, 2, 3]);
    }

    #[test]
    fn reused_buffers_do_not_leak_between_calls() {
        let mut staging = Vec::new();
        let mut out = RgbImage::new(0, 0);
        letterbox_into(&solid(8, 8, [255, 255, 255]), 8, PadColor::default(), &mut staging, &mut out).unwrap();
        letterbox_into(&solid(8, 2, [0, 0, 0]), 8, PadColor::default(), &mut staging, &mut out).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [114, 114, 114]);
        assert_eq!(out.get_pixel(0, 7).0, [114, 114, 114]);
    }

    #[test]
    fn rejects_empty_source() {
        let err = letterbox(&RgbImage::new(0, 4), 640, PadColor::default()).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidInput(_)));
    }
}
