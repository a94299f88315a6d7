use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Get the current time in seconds since the UNIX epoch
fn current_time_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Get a timestamp in seconds since the UNIX epoch, for records written to disk.
/// Elapsed time is measured with a [`Clock`] instead.
pub fn timestamp_secs() -> u64 {
    current_time_secs() as u64
}

/// Source of "now" for anything that measures elapsed time on the UI thread.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary but fixed origin.
    fn now(&self) -> f64;
}

/// Monotonic clock measuring from its own creation; unaffected by wall-clock changes.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to. Shared handles observe the same time.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }

    pub fn set(&self, secs: f64) {
        *self.now.lock() = secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}
