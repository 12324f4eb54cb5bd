//! Input-activity side of the focus score. [create_activity_source] picks the implementation once
//! at startup: real global hooks when compiled with the `hooks` feature and permitted by the OS,
//! otherwise a simulation.

pub mod counter;
#[cfg(feature = "hooks")]
pub mod hooks;
pub mod simulated;

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::warn;

use counter::DEFAULT_SATURATION;
use simulated::{SimulatedActivity, DEFAULT_SIMULATED_RANGE};

#[cfg_attr(test, mockall::automock)]
pub trait ActivitySource: Send {
    /// Normalized activity since the previous read, in [0, 1].
    fn read_and_reset_score(&mut self) -> f64;

    fn is_simulated(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivitySettings {
    /// Events per read that map to a score of 1.0.
    pub saturation: u32,
    pub simulated_min: f64,
    pub simulated_max: f64,
}

impl Default for ActivitySettings {
    fn default() -> Self {
        Self {
            saturation: DEFAULT_SATURATION,
            simulated_min: *DEFAULT_SIMULATED_RANGE.start(),
            simulated_max: *DEFAULT_SIMULATED_RANGE.end(),
        }
    }
}

impl ActivitySettings {
    pub fn simulated_range(&self) -> RangeInclusive<f64> {
        self.simulated_min..=self.simulated_max
    }
}

pub fn create_activity_source(
    settings: &ActivitySettings,
    prefer_simulated: bool,
) -> Box<dyn ActivitySource> {
    let fallback = SimulatedActivity::new(settings.simulated_range());
    if prefer_simulated {
        return Box::new(fallback);
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "hooks")] {
            use std::sync::Arc;
            use counter::{ActivityCounter, HookedActivity};

            let counter = Arc::new(ActivityCounter::new(settings.saturation));
            match hooks::install_input_hooks(counter.clone()) {
                Ok(alive) => {
                    tracing::info!("Global input hooks installed");
                    Box::new(HookedActivity::new(counter, alive, fallback))
                }
                Err(e) => {
                    warn!("Using simulated activity: {e:?}");
                    Box::new(fallback)
                }
            }
        } else {
            warn!("Built without the hooks feature, using simulated activity");
            Box::new(fallback)
        }
    }
}
