// vigil-analyzer/src/worker.rs
use crate::{AnalyzerEvent, FrameGate, Mode, RunKind};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use vigil_camera::Frame;
use vigil_detect::Detector;
use vigil_preprocess::Scratch;

pub(crate) type BoxedDetector = Box<dyn Detector>;

pub(crate) struct Detectors {
    pub fast: BoxedDetector,
    pub precise: BoxedDetector,
}

pub(crate) enum Job {
    Frame { frame: Frame, kind: RunKind },
    Swap(Detectors),
    /// Queued behind any in-flight run, so `Resumed` follows its result
    Resumed,
}

pub(crate) struct Worker {
    pub gate: Arc<FrameGate>,
    pub events: Sender<AnalyzerEvent>,
    pub detectors: Option<Detectors>,
    pub retain_precise_image: bool,
    pub input_size: u32,
    /// Queue depth at which realtime results start being dropped
    pub event_capacity: usize,
}

impl Worker {
    /// Analysis thread: runs until every job sender is gone.
    pub fn run(mut self, jobs: Receiver<Job>) {
        let mut scratch = Scratch::with_input_size(self.input_size);
        let mut resolution: Option<(u32, u32)> = None;

        while let Ok(job) = jobs.recv() {
            match job {
                Job::Swap(detectors) => {
                    self.detectors = Some(detectors);
                    self.gate.set_inert(false);
                    log::info!("detectors replaced, analysis active");
                }
                Job::Frame { frame, kind } => {
                    let size = frame.upright_size();
                    if resolution != Some(size) {
                        resolution = Some(size);
                        log::info!("camera resolution {}x{}", size.0, size.1);
                        self.publish(AnalyzerEvent::CameraResolution {
                            width: size.0,
                            height: size.1,
                        });
                    }
                    self.analyse(frame, kind, &mut scratch);
                }
                Job::Resumed => self.publish(AnalyzerEvent::Resumed),
            }
        }
        log::debug!("analysis thread shutting down");
    }

    fn analyse(&mut self, frame: Frame, kind: RunKind, scratch: &mut Scratch) {
        if self.gate.is_stopped() {
            self.gate.finish();
            return;
        }
        let Some(detectors) = self.detectors.as_mut() else {
            self.gate.finish();
            return;
        };

        let detector = match kind {
            RunKind::Fast => &mut detectors.fast,
            RunKind::Precise => &mut detectors.precise,
        };
        let retain = kind == RunKind::Precise && self.retain_precise_image;

        match detector.detect(frame, scratch, retain) {
            Ok(mut result) => {
                log::trace!("{:?} run: {} detections", kind, result.detections.len());
                if kind == RunKind::Precise && self.gate.mode() != Mode::Paused {
                    log::debug!("resumed during precise run, dropping frozen image");
                    result.image = None;
                }
                self.gate.finish();
                self.publish(AnalyzerEvent::Result { kind, result });
            }
            Err(e) if e.is_frame_local() => {
                log::warn!("frame dropped: {}", e);
                if kind == RunKind::Precise {
                    self.gate.retry_precise();
                }
                self.gate.finish();
            }
            Err(e) => {
                log::error!("detector failed, analysis inert until replaced: {}", e);
                // sessions are released here, on the analysis thread
                self.detectors = None;
                self.gate.set_inert(true);
                self.gate.finish();
                self.publish(AnalyzerEvent::Failure(e.to_string()));
            }
        }
    }

    /// Realtime results give way once `event_capacity` events are waiting.
    /// Everything else changes what the listener must show and is always sent.
    fn publish(&self, event: AnalyzerEvent) {
        let realtime = matches!(
            event,
            AnalyzerEvent::Result {
                kind: RunKind::Fast,
                ..
            }
        );
        if realtime && self.events.len() >= self.event_capacity {
            log::warn!("event queue full, dropping realtime result");
            return;
        }
        if self.events.send(event).is_err() {
            log::trace!("no event listener");
        }
    }
}
