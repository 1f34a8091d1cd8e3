//! Integration tests for vigil-model crate

use ndarray::Array4;
use vigil_model::{InferenceEngine, ModelConfig, OrtEngine};

#[test]
fn test_model_config_serialization() {
    let config = ModelConfig {
        accelerated: false,
        intra_threads: 2,
        optimization_level: 1,
    };

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: ModelConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, deserialized);
}

#[test]
#[ignore = "needs a YOLO ONNX model; set VIGIL_MODEL=/path/to/model.onnx"]
fn real_model_runs_on_cpu() -> anyhow::Result<()> {
    let path = std::env::var("VIGIL_MODEL")?;
    let bytes = std::fs::read(path)?;
    let name = vigil_model::validate_model(&bytes)?;

    let config = ModelConfig {
        accelerated: false,
        ..Default::default()
    };
    let mut engine = OrtEngine::from_bytes(&bytes, &config)?;
    assert_eq!(engine.input_name(), name);

    let input = Array4::<f32>::zeros((1, 3, 640, 640));
    let out = engine.run(input.view())?;
    assert_eq!(out.ndim(), 3);
    assert_eq!(out.shape()[0], 1);
    Ok(())
}
