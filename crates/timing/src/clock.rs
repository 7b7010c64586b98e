//! Time sources for calibration and timed loops.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::Instant;

/// Monotonic seconds since an arbitrary origin.
pub trait Clock {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockKind {
    /// User CPU time of this process, where the platform exposes it.
    #[default]
    ProcessCpu,
    /// Wall-clock time.
    Monotonic,
}

impl ClockKind {
    pub fn build(self) -> Box<dyn Clock> {
        match self {
            ClockKind::ProcessCpu => Box::new(ProcessCpuClock::new()),
            ClockKind::Monotonic => Box::new(MonotonicClock::new()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClockKind::ProcessCpu => "process-cpu",
            ClockKind::Monotonic => "monotonic",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Process user CPU time via `getrusage(RUSAGE_SELF)`. Falls back to the
/// monotonic clock when the call is unavailable or fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCpuClock {
    fallback: MonotonicClock,
}

impl ProcessCpuClock {
    pub fn new() -> Self {
        Self {
            fallback: MonotonicClock::new(),
        }
    }
}

impl Clock for ProcessCpuClock {
    fn now(&self) -> f64 {
        user_cpu_seconds().unwrap_or_else(|| self.fallback.now())
    }
}

#[cfg(unix)]
fn user_cpu_seconds() -> Option<f64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage only writes into the struct it is handed.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: zero-initialized and filled in by a successful call.
    let usage = unsafe { usage.assume_init() };
    Some(usage.ru_utime.tv_sec as f64 + usage.ru_utime.tv_usec as f64 * 1e-6)
}

#[cfg(not(unix))]
fn user_cpu_seconds() -> Option<f64> {
    None
}

/// Deterministic clock advancing by `step` seconds on every reading.
#[derive(Debug)]
pub struct SteppingClock {
    current: Cell<f64>,
    step: f64,
}

impl SteppingClock {
    pub fn new(step: f64) -> Self {
        Self {
            current: Cell::new(0.0),
            step,
        }
    }

    pub fn readings(&self) -> f64 {
        self.current.get() / self.step
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> f64 {
        let value = self.current.get() + self.step;
        self.current.set(value);
        value
    }
}
