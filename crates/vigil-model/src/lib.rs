//! # vigil-model
//!
//! The inference boundary of the pipeline. A network is anything that turns a
//! `[1, 3, T, T]` planar float tensor into one raw output tensor; the
//! [`InferenceEngine`] trait is that contract.
//!
//! ## Engines
//!
//! - [`OrtEngine`]: ONNX Runtime session built from in-memory model bytes.
//!   Tries an accelerated execution provider first and falls back to plain CPU.
//! - [`StubEngine`]: replays a fixed output tensor; used by tests and demos
//!   that must run without a model file.

use ndarray::{ArrayD, ArrayView4};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod engine;
mod stub;

pub use engine::{validate_model, OrtEngine};
pub use stub::StubEngine;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model load failed: {0}")]
    Load(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Model produced no output named {0:?}")]
    MissingOutput(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Which execution path a session ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPath {
    Accelerated,
    Cpu,
}

/// Session construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Try an accelerated execution provider before the CPU path
    pub accelerated: bool,
    /// Intra-op thread count
    pub intra_threads: usize,
    /// Graph optimisation level, 0 (off) to 3 (all)
    pub optimization_level: u8,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            accelerated: true,
            intra_threads: num_cpus::get_physical().max(1),
            optimization_level: 3,
        }
    }
}

/// One loaded network.
///
/// Engines are moved onto the analysis thread and used from there only.
pub trait InferenceEngine: Send {
    /// Name of the network's (first) input.
    fn input_name(&self) -> &str;

    /// Run one forward pass and return the first output tensor.
    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn input_name(&self) -> &str {
        (**self).input_name()
    }

    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        (**self).run(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_default() {
        let config = ModelConfig::default();
        assert!(config.accelerated);
        assert!(config.intra_threads >= 1);
        assert_eq!(config.optimization_level, 3);
    }

    #[test]
    fn test_model_config_partial_json() {
        let config: ModelConfig = serde_json::from_str(r#"{ "accelerated": false }"#).unwrap();
        assert!(!config.accelerated);
        assert_eq!(config.optimization_level, 3);
    }
}
