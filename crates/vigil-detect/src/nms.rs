// vigil-detect/src/nms.rs
use crate::{iou, Detection};

/// Per-class greedy non-maximum suppression.
///
/// Drops anything scoring below `confidence_threshold`, then within each
/// class keeps the best remaining box and discards those overlapping it with
/// IoU ≥ `iou_threshold`. Output is grouped by class, best first. Running it
/// again on its own output changes nothing.
pub fn suppress(detections: Vec<Detection>, confidence_threshold: f32, iou_threshold: f32) -> Vec<Detection> {
    let mut dets: Vec<Detection> = detections
        .into_iter()
        .filter(|d| d.score() >= confidence_threshold)
        .collect();
    dets.sort_by(|a, b| {
        a.class_index()
            .cmp(&b.class_index())
            .then(b.score().total_cmp(&a.score()))
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(dets.len());
    let mut class_start = 0;
    for d in dets {
        // first box of a class is always kept, so the last kept box tells us
        // which class we are in
        if keep.last().map_or(true, |k| k.class_index() != d.class_index()) {
            class_start = keep.len();
        }
        let rect = d.to_rect();
        if keep[class_start..]
            .iter()
            .all(|k| iou(&k.to_rect(), &rect) < iou_threshold)
        {
            keep.push(d);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(cx: f32, cy: f32, class: usize, score: f32) -> Detection {
        Detection::new(cx, cy, 20.0, 20.0, class, score).unwrap()
    }

    #[test]
    fn classes_are_isolated() {
        let out = suppress(vec![det(50.0, 50.0, 0, 0.9), det(50.0, 50.0, 1, 0.8)], 0.6, 0.5);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn same_class_overlap_keeps_best() {
        let out = suppress(vec![det(50.0, 50.0, 0, 0.7), det(50.0, 50.0, 0, 0.9)], 0.6, 0.5);
        assert_eq!(out, vec![det(50.0, 50.0, 0, 0.9)]);
    }

    #[test]
    fn chain_is_resolved_greedily() {
        // a overlaps b, b overlaps c, a and c only slightly
        let a = det(50.0, 50.0, 0, 0.9);
        let b = det(56.0, 50.0, 0, 0.8);
        let c = det(62.0, 50.0, 0, 0.7);
        let out = suppress(vec![c, b, a], 0.6, 0.4);
        assert_eq!(out, vec![a, c]);
    }

    #[test]
    fn threshold_reapplied_and_empty_input() {
        assert!(suppress(Vec::new(), 0.6, 0.5).is_empty());
        assert!(suppress(vec![det(1.0, 1.0, 0, 0.59)], 0.6, 0.5).is_empty());
        assert_eq!(suppress(vec![det(1.0, 1.0, 4, 0.61)], 0.6, 0.5).len(), 1);
    }

    #[test]
    fn idempotent() {
        let input: Vec<Detection> = (0..40)
            .map(|i| {
                let f = i as f32;
                det(30.0 + (f * 7.0) % 90.0, 40.0 + (f * 13.0) % 70.0, i % 3, 0.5 + (f * 0.37) % 0.5)
            })
            .collect();
        let once = suppress(input, 0.6, 0.45);
        let twice = suppress(once.clone(), 0.6, 0.45);
        assert_eq!(once, twice);
    }
}
