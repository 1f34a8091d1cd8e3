// vigil-analyzer/src/lib.rs
// ============================================================
// vigil-analyzer  –  frame scheduler
// Sits between the camera and the detectors. Decides per frame
// whether it is skipped, dropped or analysed, runs analysis on
// one dedicated thread and publishes results over a channel.
// ------------------------------------------------------------
// Public API
//   * Analyzer::start(config, fast, precise)  – async, loads models
//   * Analyzer::spawn(config, fast, precise)  – ready detectors
//   * Analyzer::submit(frame)                 – never blocks
//   * switch_to_precise / resume / set_frames_to_skip
//   * Analyzer::events()                      – AnalyzerEvent stream
//   * Analyzer::stop()                        – joins the worker
// ============================================================

//! vigil – scheduling layer
//!
//! Frames go in through [`Analyzer::submit`], which decides on the calling
//! thread, without blocking, whether the frame is analysed. At most one frame
//! is in flight; anything arriving meanwhile is dropped and its buffer
//! released. Results and failures come back as [`AnalyzerEvent`]s.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use vigil_camera::Frame;
use vigil_detect::{Detector, DetectorResult, YoloDetector};
use vigil_model::OrtEngine;

mod config;
mod gate;
mod worker;

pub use config::AnalyzerConfig;
pub use gate::{FrameDisposition, FrameGate, Mode, RunKind};

use worker::{Detectors, Job, Worker};

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),
    #[error("Analyzer is not running")]
    NotRunning,
    #[error("Releasing analysis resources failed: {0}")]
    ResourceRelease(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Messages from the analysis thread.
#[derive(Debug, Clone)]
pub enum AnalyzerEvent {
    Result { kind: RunKind, result: DetectorResult },
    /// The detectors failed; analysis is inert until they are replaced
    Failure(String),
    /// First frame seen, or the upright frame size changed
    CameraResolution { width: u32, height: u32 },
    /// Back to realtime; drop any frozen precise image
    Resumed,
}

/// Handle to a running analysis pipeline.
pub struct Analyzer {
    gate: Arc<FrameGate>,
    jobs: Option<Sender<Job>>,
    events: Receiver<AnalyzerEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Analyzer {
    /// Load both models off the async runtime, then start analysing.
    ///
    /// On error nothing is left running.
    pub async fn start(config: AnalyzerConfig, fast_model: Vec<u8>, precise_model: Vec<u8>) -> Result<Self> {
        let cfg = config.clone();
        let (fast, precise) =
            tokio::task::spawn_blocking(move || load_detectors(&cfg, &fast_model, &precise_model))
                .await
                .map_err(|e| AnalyzerError::ModelLoad(e.to_string()))??;
        Self::spawn(config, fast, precise)
    }

    /// Start analysing with detectors that are already loaded.
    pub fn spawn<F, P>(config: AnalyzerConfig, fast: F, precise: P) -> Result<Self>
    where
        F: Detector + 'static,
        P: Detector + 'static,
    {
        let gate = Arc::new(FrameGate::new(config.frames_to_skip));
        let (job_tx, job_rx) = unbounded();
        let (event_tx, events) = unbounded();

        let worker = Worker {
            gate: gate.clone(),
            events: event_tx,
            detectors: Some(Detectors {
                fast: Box::new(fast),
                precise: Box::new(precise),
            }),
            retain_precise_image: config.retain_precise_image,
            input_size: config.input_size,
            event_capacity: config.event_capacity.max(1),
        };
        let handle = thread::Builder::new()
            .name("vigil-analysis".into())
            .spawn(move || worker.run(job_rx))
            .map_err(|e| AnalyzerError::ModelLoad(format!("cannot spawn analysis thread: {}", e)))?;

        log::info!(
            "analyzer started (skip {}, input {})",
            config.frames_to_skip,
            config.input_size
        );

        Ok(Self {
            gate,
            jobs: Some(job_tx),
            events,
            worker: Some(handle),
        })
    }

    /// Offer one frame. Returns at once; a frame that is not dispatched is
    /// released before this returns.
    pub fn submit(&self, frame: Frame) -> FrameDisposition {
        let disposition = self.gate.admit();
        let FrameDisposition::Dispatched(kind) = disposition else {
            log::trace!("frame dropped: {:?}", disposition);
            return disposition;
        };

        match &self.jobs {
            Some(jobs) if jobs.send(Job::Frame { frame, kind }).is_ok() => disposition,
            _ => {
                self.gate.finish();
                FrameDisposition::Stopped
            }
        }
    }

    pub fn events(&self) -> &Receiver<AnalyzerEvent> {
        &self.events
    }

    pub fn mode(&self) -> Mode {
        self.gate.mode()
    }

    pub fn is_inert(&self) -> bool {
        self.gate.is_inert()
    }

    /// Run the next analysed frame through the precise detector, then pause.
    pub fn switch_to_precise(&self) -> bool {
        self.gate.switch_to_precise()
    }

    /// Leave `Paused` and go back to realtime analysis.
    ///
    /// `Resumed` is published after the result of any run still in flight.
    pub fn resume(&self) -> bool {
        let resumed = self.gate.resume();
        if resumed {
            match &self.jobs {
                Some(jobs) if jobs.send(Job::Resumed).is_ok() => {}
                _ => log::debug!("resume after stop, no event sent"),
            }
        }
        resumed
    }

    pub fn set_frames_to_skip(&self, n: u32) {
        self.gate.set_frames_to_skip(n);
    }

    /// Hand new detectors to the worker. Clears the inert state once the
    /// worker has picked them up.
    pub fn replace_detectors<F, P>(&self, fast: F, precise: P) -> Result<()>
    where
        F: Detector + 'static,
        P: Detector + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(AnalyzerError::NotRunning)?;
        jobs.send(Job::Swap(Detectors {
            fast: Box::new(fast),
            precise: Box::new(precise),
        }))
        .map_err(|_| AnalyzerError::NotRunning)
    }

    /// Stop accepting frames and wait for the worker to finish its current
    /// run. Detectors and buffers are released on the worker thread.
    pub fn stop(&mut self) -> Result<()> {
        self.gate.stop();
        self.jobs.take();
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(()) => {
                log::info!("analyzer stopped");
                Ok(())
            }
            Err(_) => {
                log::error!("analysis thread panicked during shutdown");
                Err(AnalyzerError::ResourceRelease("analysis thread panicked".into()))
            }
        }
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{}", e);
        }
    }
}

/// Build the fast and precise ONNX detectors from raw model bytes.
pub fn load_detectors(
    config: &AnalyzerConfig,
    fast_model: &[u8],
    precise_model: &[u8],
) -> Result<(YoloDetector<OrtEngine>, YoloDetector<OrtEngine>)> {
    let load = |bytes: &[u8]| {
        OrtEngine::from_bytes(bytes, &config.model)
            .map(|engine| YoloDetector::new(engine, config.detector_settings()))
            .map_err(|e| AnalyzerError::ModelLoad(e.to_string()))
    };
    Ok((load(fast_model)?, load(precise_model)?))
}
