// vigil-analyzer/src/gate.rs
// ------------------------------------------------------------
// Admission control for incoming frames.
//
//   Realtime ──switch_to_precise──▶ PreciseCapture
//      ▲                                  │ next admitted frame
//      └────────────resume────────── Paused ◀┘
//
// Shared between the acquisition side (admit) and the worker
// (finish); every field is a single atomic word.
// ------------------------------------------------------------
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Realtime,
    PreciseCapture,
    Paused,
}

impl Mode {
    fn as_u8(self) -> u8 {
        match self {
            Mode::Realtime => 0,
            Mode::PreciseCapture => 1,
            Mode::Paused => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Mode::PreciseCapture,
            2 => Mode::Paused,
            _ => Mode::Realtime,
        }
    }
}

/// Which detector a dispatched frame goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunKind {
    Fast,
    Precise,
}

/// What happened to a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Handed to the worker
    Dispatched(RunKind),
    /// Dropped by the skip counter
    Skipped,
    /// Dropped because the previous run is still in flight
    Busy,
    /// Dropped while paused
    Paused,
    /// Dropped because the detectors failed and have not been replaced
    Inert,
    /// Dropped because the analyzer is stopped
    Stopped,
}

pub struct FrameGate {
    mode: AtomicU8,
    frames_to_skip: AtomicU32,
    countdown: AtomicU32,
    busy: AtomicBool,
    inert: AtomicBool,
    stopped: AtomicBool,
}

impl FrameGate {
    /// The first `frames_to_skip` frames are skipped.
    pub fn new(frames_to_skip: u32) -> Self {
        Self {
            mode: AtomicU8::new(Mode::Realtime.as_u8()),
            frames_to_skip: AtomicU32::new(frames_to_skip),
            countdown: AtomicU32::new(frames_to_skip),
            busy: AtomicBool::new(false),
            inert: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// Decide the fate of one incoming frame. Never blocks.
    ///
    /// A `Dispatched` answer marks the gate busy until [`finish`](Self::finish).
    pub fn admit(&self) -> FrameDisposition {
        if self.stopped.load(Ordering::Acquire) {
            return FrameDisposition::Stopped;
        }
        if self.inert.load(Ordering::Acquire) {
            return FrameDisposition::Inert;
        }
        if self.mode() == Mode::Paused {
            return FrameDisposition::Paused;
        }

        if self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .is_ok()
        {
            return FrameDisposition::Skipped;
        }

        // the counter stays at zero, so the next frame gets another chance
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return FrameDisposition::Busy;
        }

        let kind = match self.mode.compare_exchange(
            Mode::PreciseCapture.as_u8(),
            Mode::Paused.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                log::info!("precise capture dispatched, pausing");
                RunKind::Precise
            }
            Err(current) if Mode::from_u8(current) == Mode::Paused => {
                self.busy.store(false, Ordering::Release);
                return FrameDisposition::Paused;
            }
            Err(_) => RunKind::Fast,
        };

        self.countdown
            .store(self.frames_to_skip.load(Ordering::Acquire), Ordering::Release);
        FrameDisposition::Dispatched(kind)
    }

    /// The worker is done with the dispatched frame.
    pub fn finish(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// `Realtime → PreciseCapture`. False in any other mode.
    pub fn switch_to_precise(&self) -> bool {
        let switched = self
            .mode
            .compare_exchange(
                Mode::Realtime.as_u8(),
                Mode::PreciseCapture.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if switched {
            log::info!("mode: Realtime -> PreciseCapture");
        }
        switched
    }

    /// `Paused` or `PreciseCapture` → `Realtime`. False when already realtime.
    pub fn resume(&self) -> bool {
        let prev = Mode::from_u8(self.mode.swap(Mode::Realtime.as_u8(), Ordering::AcqRel));
        if prev != Mode::Realtime {
            log::info!("mode: {:?} -> Realtime", prev);
        }
        prev != Mode::Realtime
    }

    /// Put a failed precise run back so the next frame retries it.
    pub(crate) fn retry_precise(&self) {
        let _ = self.mode.compare_exchange(
            Mode::Paused.as_u8(),
            Mode::PreciseCapture.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn frames_to_skip(&self) -> u32 {
        self.frames_to_skip.load(Ordering::Acquire)
    }

    /// Takes effect immediately; a longer pending countdown is cut short.
    pub fn set_frames_to_skip(&self, n: u32) {
        self.frames_to_skip.store(n, Ordering::Release);
        let _ = self
            .countdown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| (c > n).then_some(n));
    }

    pub fn is_inert(&self) -> bool {
        self.inert.load(Ordering::Acquire)
    }

    pub(crate) fn set_inert(&self, inert: bool) {
        self.inert.store(inert, Ordering::Release);
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
