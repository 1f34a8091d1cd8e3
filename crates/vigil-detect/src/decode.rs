// vigil-detect/src/decode.rs
use crate::{DetectError, Detection, Result};
use ndarray::{ArrayViewD, Axis, Ix3};

/// Decode raw `[1, 4 + classes, boxes]` network output.
///
/// Rows 0..4 hold `cx, cy, w, h` in model-input pixels, the remaining rows
/// one raw score per class. Each box keeps only its best class (first maximum
/// wins on ties) and is dropped when that score is below
/// `confidence_threshold`. Boxes with non-positive or non-finite geometry are
/// dropped as well.
pub fn decode(raw: ArrayViewD<'_, f32>, confidence_threshold: f32) -> Result<Vec<Detection>> {
    let shape = raw.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
        return Err(DetectError::UnsupportedShape(shape));
    }
    let raw = raw
        .into_dimensionality::<Ix3>()
        .map_err(|_| DetectError::UnsupportedShape(shape.clone()))?;

    // [values, boxes] -> [boxes, values], no copy
    let boxes = raw.index_axis_move(Axis(0), 0).reversed_axes();

    let mut out = Vec::new();
    for row in boxes.outer_iter() {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for (class, &score) in row.iter().skip(4).enumerate() {
            if score > best_score {
                best_class = class;
                best_score = score;
            }
        }
        if !(best_score >= confidence_threshold) {
            continue;
        }

        let score = best_score.clamp(0.0, 1.0);
        match Detection::new(row[0], row[1], row[2], row[3], best_class, score) {
            Ok(d) => out.push(d),
            Err(e) => log::trace!("dropping box: {}", e),
        }
    }
    Ok(out)
}
