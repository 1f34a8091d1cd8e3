use crate::{InferenceEngine, ModelError, Result};
use ndarray::{ArrayD, ArrayView4};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stub engine for testing. Returns the same output tensor on every call.
///
/// The call counter and failure switch are shared handles, so a test can keep
/// observing the engine after it has been moved onto a worker thread.
pub struct StubEngine {
    output: ArrayD<f32>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl StubEngine {
    pub fn new(output: ArrayD<f32>) -> Self {
        Self {
            output,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sleep this long inside every `run`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call from the start.
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Number of completed or failed `run` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Set to make subsequent calls fail.
    pub fn fail_switch(&self) -> Arc<AtomicBool> {
        self.fail.clone()
    }
}

impl InferenceEngine for StubEngine {
    fn input_name(&self) -> &str {
        "images"
    }

    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ModelError::Inference("stub failure".into()));
        }
        if input.shape()[1] != 3 {
            return Err(ModelError::InvalidInput(format!(
                "expected 3 channels, got {:?}",
                input.shape()
            )));
        }
        Ok(self.output.clone())
    }
}
