// vigil-detect/src/lib.rs
// ============================================================
// vigil-detect  –  Object-detection stage for vigil
// Runs a YOLO network through any `InferenceEngine` and turns
// its raw `[1, 4 + classes, boxes]` output into detections.
// ------------------------------------------------------------
// Pipeline: Frame → Scratch → tensor → raw output
//           → decode() → suppress() → DetectorResult
// ------------------------------------------------------------
// Public API
//   * YoloDetector::new(engine, settings)
//   * Detector::detect(frame, scratch, retain_image)
//   * decode(raw, conf)          – argmax + threshold
//   * suppress(dets, conf, iou)  – per-class greedy NMS
//   * to_display_rect / hit_test – model space → display space
// ============================================================

//! vigil – detection layer
//!
//! This crate provides a backend-agnostic [`Detector`] trait plus the
//! concrete [`YoloDetector`] that drives a YOLO-family network through a
//! `vigil_model::InferenceEngine`.
//!
//! Boxes stay in model-input pixel space (after letterboxing) all the way to
//! the [`DetectorResult`]. The display side maps them back with
//! [`to_display_rect`], using the [`LetterboxInfo`] carried by the result and
//! a [`DisplayTransform`] for the current view.

use thiserror::Error;
use vigil_model::ModelError;

mod decode;
mod detection;
mod mapping;
mod nms;
mod yolo;

pub use decode::decode;
pub use detection::{iou, Detection, Rect};
pub use mapping::{hit_test, to_display_rect, DisplayTransform};
pub use nms::suppress;
pub use vigil_preprocess::LetterboxInfo;
pub use yolo::{
    Detector, DetectorResult, DetectorSettings, PerformanceLogging, StageTiming, YoloDetector,
};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unsupported output shape: expected [1, 4 + classes, boxes], got {0:?}")]
    UnsupportedShape(Vec<usize>),
    #[error(transparent)]
    Preprocess(#[from] vigil_preprocess::PreprocessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Detection made at {detected:?} but display expects camera {display:?}")]
    ResolutionMismatch {
        detected: (u32, u32),
        display: (u32, u32),
    },
}

impl DetectError {
    /// True when only the current frame is affected.
    ///
    /// A model that rejected this frame's tensor is still usable. Load,
    /// inference and missing-output failures mean the detector cannot be
    /// trusted with the next frame.
    pub fn is_frame_local(&self) -> bool {
        match self {
            DetectError::Model(e) => matches!(e, ModelError::InvalidInput(_)),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
