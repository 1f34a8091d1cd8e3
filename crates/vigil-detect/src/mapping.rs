// vigil-detect/src/mapping.rs
// ------------------------------------------------------------
// model space --(undo letterbox)--> camera space
//             --(fill-centre)-----> display space
// ------------------------------------------------------------
use crate::{DetectError, Detection, LetterboxInfo, Rect, Result};
use serde::{Deserialize, Serialize};

/// Camera → display mapping for a view that fills its surface and crops the
/// overflow equally on both sides.
///
/// Valid only for the camera resolution it was built with; rebuild it
/// whenever the view or the camera resolution changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub scale: f32,
    pub crop_x: f32,
    pub crop_y: f32,
    pub camera_width: u32,
    pub camera_height: u32,
    pub view_width: u32,
    pub view_height: u32,
}

impl DisplayTransform {
    pub fn fill_center(view_width: u32, view_height: u32, camera_width: u32, camera_height: u32) -> Result<Self> {
        if view_width == 0 || view_height == 0 || camera_width == 0 || camera_height == 0 {
            return Err(DetectError::InvalidInput(format!(
                "view {}x{} / camera {}x{}",
                view_width, view_height, camera_width, camera_height
            )));
        }
        let (vw, vh) = (view_width as f32, view_height as f32);
        let (cw, ch) = (camera_width as f32, camera_height as f32);
        let scale = (vw / cw).max(vh / ch);
        Ok(Self {
            scale,
            crop_x: (cw * scale - vw) / 2.0,
            crop_y: (ch * scale - vh) / 2.0,
            camera_width,
            camera_height,
            view_width,
            view_height,
        })
    }

    /// Camera pixel → display pixel.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale - self.crop_x, y * self.scale - self.crop_y)
    }

    /// Where an `image_width`×`image_height` image lands when drawn
    /// fill-centred into this view (e.g. a frozen precise-capture frame).
    pub fn background_rect(&self, image_width: u32, image_height: u32) -> Rect {
        let (vw, vh) = (self.view_width as f32, self.view_height as f32);
        let (iw, ih) = (image_width as f32, image_height as f32);
        let scale = (vw / iw).max(vh / ih);
        let left = (vw - iw * scale) / 2.0;
        let top = (vh - ih * scale) / 2.0;
        Rect {
            left,
            top,
            right: left + iw * scale,
            bottom: top + ih * scale,
        }
    }
}

/// Map a detection to display pixels.
///
/// Fails with [`DetectError::ResolutionMismatch`] when `info` was produced
/// from a different camera resolution than `transform` expects.
pub fn to_display_rect(detection: &Detection, info: &LetterboxInfo, transform: &DisplayTransform) -> Result<Rect> {
    let detected = (info.source_width, info.source_height);
    let display = (transform.camera_width, transform.camera_height);
    if detected != display {
        return Err(DetectError::ResolutionMismatch { detected, display });
    }

    let r = detection.to_rect();
    let (l, t) = info.inverse(r.left, r.top);
    let (rr, b) = info.inverse(r.right, r.bottom);
    let (left, top) = transform.apply(l, t);
    let (right, bottom) = transform.apply(rr, b);
    Ok(Rect {
        left,
        top,
        right,
        bottom,
    })
}

/// First detection whose display rect contains `(x, y)`.
pub fn hit_test<'d>(
    detections: &'d [Detection],
    info: &LetterboxInfo,
    transform: &DisplayTransform,
    x: f32,
    y: f32,
) -> Result<Option<&'d Detection>> {
    for d in detections {
        if to_display_rect(d, info, transform)?.contains(x, y) {
            return Ok(Some(d));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_1280x720() -> LetterboxInfo {
        // 1280x720 into 640: scale 0.5, 140 rows of padding on top
        LetterboxInfo {
            scale: 0.5,
            pad_x: 0,
            pad_y: 140,
            source_width: 1280,
            source_height: 720,
            target_size: 640,
        }
    }

    #[test]
    fn fill_center_crops_the_long_axis() {
        // 16:9 camera into a 1000x1000 view: height fills, width overflows
        let t = DisplayTransform::fill_center(1000, 1000, 1280, 720).unwrap();
        assert!((t.scale - 1000.0 / 720.0).abs() < 1e-6);
        assert!((t.crop_x - (1280.0 * t.scale - 1000.0) / 2.0).abs() < 1e-3);
        assert!(t.crop_y.abs() < 1e-3);
    }

    #[test]
    fn identity_display_recovers_camera_pixels() {
        let t = DisplayTransform::fill_center(1280, 720, 1280, 720).unwrap();
        // camera box (100, 200)-(300, 400) seen through the letterbox
        let d = Detection::new(100.0, 290.0, 100.0, 100.0, 0, 0.9).unwrap();
        let r = to_display_rect(&d, &info_1280x720(), &t).unwrap();
        assert!((r.left - 100.0).abs() < 1e-3);
        assert!((r.top - 200.0).abs() < 1e-3);
        assert!((r.right - 300.0).abs() < 1e-3);
        assert!((r.bottom - 400.0).abs() < 1e-3);
    }

    #[test]
    fn stale_resolution_is_rejected() {
        let t = DisplayTransform::fill_center(1080, 1920, 720, 1280).unwrap();
        let d = Detection::new(320.0, 320.0, 10.0, 10.0, 0, 0.9).unwrap();
        assert!(matches!(
            to_display_rect(&d, &info_1280x720(), &t),
            Err(DetectError::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn hit_test_returns_first_match() {
        let t = DisplayTransform::fill_center(1280, 720, 1280, 720).unwrap();
        let dets = [
            Detection::new(100.0, 290.0, 100.0, 100.0, 0, 0.9).unwrap(),
            Detection::new(100.0, 290.0, 200.0, 200.0, 1, 0.8).unwrap(),
        ];
        let hit = hit_test(&dets, &info_1280x720(), &t, 150.0, 250.0).unwrap();
        assert_eq!(hit.map(|d| d.class_index()), Some(0));
        let hit = hit_test(&dets, &info_1280x720(), &t, 380.0, 250.0).unwrap();
        assert_eq!(hit.map(|d| d.class_index()), Some(1));
        assert!(hit_test(&dets, &info_1280x720(), &t, 1000.0, 700.0).unwrap().is_none());
    }

    #[test]
    fn background_fills_view() {
        let t = DisplayTransform::fill_center(1000, 1000, 1280, 720).unwrap();
        let bg = t.background_rect(1280, 720);
        assert!(bg.left < 0.0);
        assert!(bg.top.abs() < 1e-3);
        assert!((bg.bottom - 1000.0).abs() < 1e-3);
        assert!((bg.left + bg.right - 1000.0).abs() < 1e-3);
    }
}
