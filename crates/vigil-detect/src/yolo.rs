// vigil-detect/src/yolo.rs
use crate::{decode, suppress, Detection, LetterboxInfo, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vigil_camera::Frame;
use vigil_model::InferenceEngine;
use vigil_preprocess::{PadColor, Preprocessor, Scratch};

/// How much timing detail goes into [`DetectorResult::metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLogging {
    #[default]
    Off,
    /// Only the `"Total"` entry
    Basic,
    /// Every stage plus `"Total"`
    Verbose,
}

/// Per-detector knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub pad_color: PadColor,
    pub performance_logging: PerformanceLogging,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.6,
            iou_threshold: 0.5,
            pad_color: PadColor::default(),
            performance_logging: PerformanceLogging::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration: Duration,
}

/// Everything one detection pass produced.
#[derive(Debug, Clone)]
pub struct DetectorResult {
    pub detections: Vec<Detection>,
    pub letterbox: LetterboxInfo,
    pub metrics: Option<Vec<StageTiming>>,
    /// Upright copy of the analysed frame, when retention was asked for
    pub image: Option<Arc<RgbImage>>,
}

/// Trait for object detectors.
///
/// `detect` consumes the frame and releases it as soon as its pixels are in
/// `scratch`, whatever the outcome.
pub trait Detector: Send {
    fn detect(&mut self, frame: Frame, scratch: &mut Scratch, retain_image: bool) -> Result<DetectorResult>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: Frame, scratch: &mut Scratch, retain_image: bool) -> Result<DetectorResult> {
        (**self).detect(frame, scratch, retain_image)
    }
}

/// YOLO detector on top of any inference engine.
pub struct YoloDetector<E> {
    engine: E,
    pre: Preprocessor,
    settings: DetectorSettings,
}

impl<E: InferenceEngine> YoloDetector<E> {
    pub fn new(engine: E, settings: DetectorSettings) -> Self {
        let pre = Preprocessor::new(settings.input_size).with_pad_color(settings.pad_color);
        Self {
            engine,
            pre,
            settings,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: InferenceEngine> Detector for YoloDetector<E> {
    fn detect(&mut self, frame: Frame, scratch: &mut Scratch, retain_image: bool) -> Result<DetectorResult> {
        let mut timer = StageTimer::start(self.settings.performance_logging);

        self.pre.capture(frame, scratch);
        let image = retain_image.then(|| Arc::new(scratch.upright().clone()));
        timer.mark("Bitmap");

        let letterbox = self.pre.letterbox(scratch)?;
        timer.mark("LetterBox");

        self.pre.pack(scratch)?;
        timer.mark("Tensor");

        let raw = self.engine.run(scratch.tensor())?;
        timer.mark("Detection");

        let candidates = decode(raw.view(), self.settings.confidence_threshold)?;
        timer.mark("Extract detections");

        let detections = suppress(
            candidates,
            self.settings.confidence_threshold,
            self.settings.iou_threshold,
        );
        timer.mark("NMS");

        Ok(DetectorResult {
            detections,
            letterbox,
            metrics: timer.finish(),
            image,
        })
    }
}

struct StageTimer {
    level: PerformanceLogging,
    started: Instant,
    last: Instant,
    stages: Vec<StageTiming>,
}

impl StageTimer {
    fn start(level: PerformanceLogging) -> Self {
        let now = Instant::now();
        Self {
            level,
            started: now,
            last: now,
            stages: Vec::new(),
        }
    }

    fn mark(&mut self, stage: &'static str) {
        if self.level != PerformanceLogging::Verbose {
            return;
        }
        let now = Instant::now();
        self.stages.push(StageTiming {
            stage,
            duration: now - self.last,
        });
        self.last = now;
    }

    fn finish(mut self) -> Option<Vec<StageTiming>> {
        if self.level == PerformanceLogging::Off {
            return None;
        }
        self.stages.push(StageTiming {
            stage: "Total",
            duration: self.started.elapsed(),
        });
        Some(self.stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, ArrayD};
    use vigil_camera::PixelFormat;
    use vigil_model::StubEngine;

    fn raw_one_box() -> ArrayD<f32> {
        // one box at the centre of a 64x64 input, class 1
        let mut a = Array3::<f32>::zeros((1, 6, 1));
        a[[0, 0, 0]] = 32.0;
        a[[0, 1, 0]] = 32.0;
        a[[0, 2, 0]] = 10.0;
        a[[0, 3, 0]] = 10.0;
        a[[0, 5, 0]] = 0.95;
        a.into_dyn()
    }

    fn frame() -> Frame {
        Frame::new(vec![40u8; 80 * 60 * 3], PixelFormat::Rgb8, 80, 60).unwrap()
    }

    fn settings(level: PerformanceLogging) -> DetectorSettings {
        DetectorSettings {
            input_size: 64,
            performance_logging: level,
            ..Default::default()
        }
    }

    #[test]
    fn runs_the_whole_pipeline() {
        let mut det = YoloDetector::new(StubEngine::new(raw_one_box()), settings(PerformanceLogging::Off));
        let mut scratch = Scratch::new();
        let res = det.detect(frame(), &mut scratch, false).unwrap();
        assert_eq!(res.detections.len(), 1);
        assert_eq!(res.detections[0].class_index(), 1);
        assert_eq!(res.letterbox.source_width, 80);
        assert!(res.metrics.is_none());
        assert!(res.image.is_none());
    }

    #[test]
    fn metrics_follow_logging_level() {
        let mut scratch = Scratch::new();

        let mut basic = YoloDetector::new(StubEngine::new(raw_one_box()), settings(PerformanceLogging::Basic));
        let m = basic.detect(frame(), &mut scratch, false).unwrap().metrics.unwrap();
        assert_eq!(m.iter().map(|s| s.stage).collect::<Vec<_>>(), vec!["Total"]);

        let mut verbose = YoloDetector::new(StubEngine::new(raw_one_box()), settings(PerformanceLogging::Verbose));
        let m = verbose.detect(frame(), &mut scratch, true).unwrap().metrics.unwrap();
        assert_eq!(
            m.iter().map(|s| s.stage).collect::<Vec<_>>(),
            vec!["Bitmap", "LetterBox", "Tensor", "Detection", "Extract detections", "NMS", "Total"]
        );
    }

    #[test]
    fn retained_image_is_upright_copy() {
        let mut det = YoloDetector::new(StubEngine::new(raw_one_box()), settings(PerformanceLogging::Off));
        let mut scratch = Scratch::new();
        let res = det.detect(frame(), &mut scratch, true).unwrap();
        let img = res.image.unwrap();
        assert_eq!(img.dimensions(), (80, 60));
        assert_eq!(img.get_pixel(0, 0).0, [40, 40, 40]);
    }

    #[test]
    fn engine_failure_is_not_frame_local() {
        let mut det = YoloDetector::new(
            StubEngine::new(raw_one_box()).failing(),
            settings(PerformanceLogging::Off),
        );
        let err = det.detect(frame(), &mut Scratch::new(), false).unwrap_err();
        assert!(!err.is_frame_local());
    }

    #[test]
    fn bad_output_shape_is_frame_local() {
        let mut det = YoloDetector::new(
            StubEngine::new(ArrayD::zeros(ndarray::IxDyn(&[2, 6, 1]))),
            settings(PerformanceLogging::Off),
        );
        let err = det.detect(frame(), &mut Scratch::new(), false).unwrap_err();
        assert!(err.is_frame_local());
    }
}
