use crate::{DetectError, Result};
use serde::{Deserialize, Serialize};

/// One detected object, centre-form, in model-input pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    center_x: f32,
    center_y: f32,
    width: f32,
    height: f32,
    class_index: usize,
    score: f32,
}

impl Detection {
    /// Fails unless `width` and `height` are positive and `score` lies in `0..=1`.
    pub fn new(
        center_x: f32,
        center_y: f32,
        width: f32,
        height: f32,
        class_index: usize,
        score: f32,
    ) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !(0.0..=1.0).contains(&score) {
            return Err(DetectError::InvalidInput(format!(
                "detection {}x{} with score {}",
                width, height, score
            )));
        }
        if !center_x.is_finite() || !center_y.is_finite() || !width.is_finite() || !height.is_finite() {
            return Err(DetectError::InvalidInput("non-finite box".into()));
        }
        Ok(Self {
            center_x,
            center_y,
            width,
            height,
            class_index,
            score,
        })
    }

    pub fn center_x(&self) -> f32 {
        self.center_x
    }

    pub fn center_y(&self) -> f32 {
        self.center_y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    /// Corner-form box.
    pub fn to_rect(&self) -> Rect {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        Rect {
            left: self.center_x - hw,
            top: self.center_y - hh,
            right: self.center_x + hw,
            bottom: self.center_y + hh,
        }
    }
}

/// Axis-aligned box in corner form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Edges inclusive.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Intersection over union; 0 for disjoint or degenerate boxes.
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let iw = (a.right.min(b.right) - a.left.max(b.left)).max(0.0);
    let ih = (a.bottom.min(b.bottom) - a.top.max(b.top)).max(0.0);
    let inter = iw * ih;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(l: f32, t: f32, r: f32, b: f32) -> Rect {
        Rect { left: l, top: t, right: r, bottom: b }
    }

    #[test]
    fn iou_edge_values() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &rect(20.0, 20.0, 30.0, 30.0)), 0.0);
        // touching edges share no area
        assert_eq!(iou(&a, &rect(10.0, 0.0, 20.0, 10.0)), 0.0);
        let half = iou(&a, &rect(5.0, 0.0, 15.0, 10.0));
        assert!((half - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn corner_form_from_centre() {
        let d = Detection::new(50.0, 40.0, 20.0, 10.0, 3, 0.7).unwrap();
        assert_eq!(d.to_rect(), rect(40.0, 35.0, 60.0, 45.0));
    }

    #[test]
    fn constructor_enforces_invariants() {
        assert!(Detection::new(0.0, 0.0, 0.0, 1.0, 0, 0.5).is_err());
        assert!(Detection::new(0.0, 0.0, 1.0, 1.0, 0, 1.5).is_err());
        assert!(Detection::new(f32::NAN, 0.0, 1.0, 1.0, 0, 0.5).is_err());
    }
}
