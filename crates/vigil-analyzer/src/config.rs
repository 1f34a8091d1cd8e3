use serde::{Deserialize, Serialize};
use vigil_detect::{DetectorSettings, PerformanceLogging};
use vigil_model::ModelConfig;
use vigil_preprocess::PadColor;

/// Everything the analyzer needs, handed in once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Frames dropped between two analysed frames
    pub frames_to_skip: u32,
    /// Square model input size in pixels
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub pad_color: PadColor,
    pub performance_logging: PerformanceLogging,
    /// Keep the analysed image in precise-capture results
    pub retain_precise_image: bool,
    /// Undelivered events at which new realtime results are dropped.
    /// Precise results, failures and mode changes are always delivered.
    pub event_capacity: usize,
    pub model: ModelConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            frames_to_skip: 5,
            input_size: 640,
            confidence_threshold: 0.6,
            iou_threshold: 0.5,
            pad_color: PadColor::default(),
            performance_logging: PerformanceLogging::Off,
            retain_precise_image: true,
            event_capacity: 8,
            model: ModelConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            pad_color: self.pad_color,
            performance_logging: self.performance_logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AnalyzerConfig =
            serde_json::from_str(r#"{ "frames_to_skip": 2, "performance_logging": "verbose" }"#).unwrap();
        assert_eq!(cfg.frames_to_skip, 2);
        assert_eq!(cfg.performance_logging, PerformanceLogging::Verbose);
        assert_eq!(cfg.input_size, 640);
        assert_eq!(cfg.pad_color, PadColor([114, 114, 114]));
    }

    #[test]
    fn settings_mirror_config() {
        let cfg = AnalyzerConfig {
            confidence_threshold: 0.25,
            ..Default::default()
        };
        let s = cfg.detector_settings();
        assert_eq!(s.confidence_threshold, 0.25);
        assert_eq!(s.iou_threshold, 0.5);
    }
}
