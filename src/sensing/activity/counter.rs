use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use tracing::warn;

use super::{simulated::SimulatedActivity, ActivitySource};

/// Number of input events in one read window that counts as full activity.
pub const DEFAULT_SATURATION: u32 = 20;

/// Counter shared between input callbacks and the sampling loop. Every increment and every
/// read-and-reset happens under the same lock.
#[derive(Debug)]
pub struct ActivityCounter {
    count: Mutex<u32>,
    saturation: u32,
}

impl Default for ActivityCounter {
    fn default() -> Self {
        Self::new(DEFAULT_SATURATION)
    }
}

impl ActivityCounter {
    pub fn new(saturation: u32) -> Self {
        Self {
            count: Mutex::new(0),
            saturation: saturation.max(1),
        }
    }

    // A panicking callback can't leave a half written integer behind.
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_activity(&self) {
        let mut count = self.lock();
        *count = count.saturating_add(1);
    }

    /// Returns `min(count / saturation, 1.0)` and resets the counter.
    pub fn read_and_reset_score(&self) -> f64 {
        let mut count = self.lock();
        let score = (*count as f64 / self.saturation as f64).min(1.0);
        *count = 0;
        score
    }
}

/// Activity fed by a global input listener. Once the listener reports itself dead every read is
/// answered by the simulated fallback.
pub struct HookedActivity {
    counter: Arc<ActivityCounter>,
    listener_alive: Arc<AtomicBool>,
    fallback: SimulatedActivity,
    reported_failure: bool,
}

impl HookedActivity {
    pub fn new(
        counter: Arc<ActivityCounter>,
        listener_alive: Arc<AtomicBool>,
        fallback: SimulatedActivity,
    ) -> Self {
        Self {
            counter,
            listener_alive,
            fallback,
            reported_failure: false,
        }
    }
}

impl ActivitySource for HookedActivity {
    fn read_and_reset_score(&mut self) -> f64 {
        if self.listener_alive.load(Ordering::Acquire) {
            return self.counter.read_and_reset_score();
        }
        if !self.reported_failure {
            warn!("Input listener stopped, switching to simulated activity");
            self.reported_failure = true;
        }
        self.fallback.read_and_reset_score()
    }

    fn is_simulated(&self) -> bool {
        !self.listener_alive.load(Ordering::Acquire)
    }
}
