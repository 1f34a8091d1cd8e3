//! ONNX Runtime engine.

use crate::{ExecutionPath, InferenceEngine, ModelConfig, ModelError, Result};
use ndarray::{ArrayD, ArrayView4, IxDyn};
use ort::execution_providers as ep;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

/// A loaded ONNX network.
pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_name: String,
    path: ExecutionPath,
}

impl OrtEngine {
    /// Build a session from model bytes.
    ///
    /// With `config.accelerated` set, an accelerated provider is tried first
    /// and any failure there falls back to the CPU path. Fails with
    /// [`ModelError::Load`] only when the last path tried fails too.
    pub fn from_bytes(bytes: &[u8], config: &ModelConfig) -> Result<Self> {
        let (session, path) = if config.accelerated {
            match build_session(bytes, config, true) {
                Ok(session) => (session, ExecutionPath::Accelerated),
                Err(e) => {
                    log::warn!("accelerated session failed ({}), falling back to CPU", e);
                    (build_session(bytes, config, false)?, ExecutionPath::Cpu)
                }
            }
        } else {
            (build_session(bytes, config, false)?, ExecutionPath::Cpu)
        };

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ModelError::Load("model declares no inputs".into()))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelError::Load("model declares no outputs".into()))?;

        log::info!(
            "model loaded on {:?} path (input {:?}, output {:?})",
            path,
            input_name,
            output_name
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            path,
        })
    }

    pub fn execution_path(&self) -> ExecutionPath {
        self.path
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl InferenceEngine for OrtEngine {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            return Err(ModelError::InvalidInput(format!(
                "expected [1, 3, H, W], got {:?}",
                shape
            )));
        }
        let dims = [1usize, 3, shape[2], shape[3]];
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array((dims, data.into_boxed_slice()))
            .map_err(|e| ModelError::InvalidInput(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ModelError::MissingOutput(self.output_name.clone()))?;
        let (out_shape, out_data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let out_dims: Vec<usize> = out_shape.iter().map(|&d| d.max(0) as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&out_dims), out_data.to_vec())
            .map_err(|e| ModelError::Inference(e.to_string()))
    }
}

/// Check that `bytes` hold a loadable model; returns its input name.
pub fn validate_model(bytes: &[u8]) -> Result<String> {
    let config = ModelConfig {
        accelerated: false,
        ..Default::default()
    };
    let session = build_session(bytes, &config, false)?;
    session
        .inputs
        .first()
        .map(|i| i.name.clone())
        .ok_or_else(|| ModelError::Load("model declares no inputs".into()))
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn load<E: std::fmt::Display>(e: E) -> ModelError {
    ModelError::Load(e.to_string())
}

fn build_session(bytes: &[u8], config: &ModelConfig, accelerated: bool) -> Result<Session> {
    let mut builder = Session::builder()
        .map_err(load)?
        .with_optimization_level(optimization_level(config.optimization_level))
        .map_err(load)?
        .with_intra_threads(config.intra_threads.max(1))
        .map_err(load)?;

    if accelerated {
        builder = builder
            .with_execution_providers([ep::XNNPACKExecutionProvider::default()
                .build()
                .error_on_failure()])
            .map_err(load)?;
    }

    builder.commit_from_memory(bytes).map_err(load)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_on_both_paths() {
        let err = OrtEngine::from_bytes(b"definitely not onnx", &ModelConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ModelError::Load(_)));
        assert!(validate_model(b"").is_err());
    }

    #[test]
    fn optimisation_levels_clamp_high() {
        assert!(matches!(optimization_level(9), GraphOptimizationLevel::Level3));
        assert!(matches!(optimization_level(0), GraphOptimizationLevel::Disable));
    }
}
