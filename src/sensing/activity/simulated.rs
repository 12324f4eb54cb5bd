use std::ops::RangeInclusive;

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::ActivitySource;

pub const DEFAULT_SIMULATED_RANGE: RangeInclusive<f64> = 0.4..=0.8;

/// Stands in for real input hooks when they can't be installed.
pub struct SimulatedActivity {
    rng: StdRng,
    range: RangeInclusive<f64>,
}

impl SimulatedActivity {
    pub fn new(range: RangeInclusive<f64>) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            range: ordered(range),
        }
    }

    pub fn seeded(seed: u64, range: RangeInclusive<f64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            range: ordered(range),
        }
    }
}

/// Clamps to [0, 1] and puts the bounds in order. Non-finite bounds give the default range.
fn ordered(range: RangeInclusive<f64>) -> RangeInclusive<f64> {
    let (start, end) = range.into_inner();
    if !start.is_finite() || !end.is_finite() {
        return DEFAULT_SIMULATED_RANGE;
    }
    let start = start.clamp(0.0, 1.0);
    let end = end.clamp(0.0, 1.0);
    if start <= end {
        start..=end
    } else {
        end..=start
    }
}

impl ActivitySource for SimulatedActivity {
    fn read_and_reset_score(&mut self) -> f64 {
        self.rng.gen_range(self.range.clone())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::sensing::activity::ActivitySource;

    use super::SimulatedActivity;

    #[test]
    fn stays_in_range() {
        let mut activity = SimulatedActivity::seeded(42, 0.4..=0.8);
        for _ in 0..1000 {
            let score = activity.read_and_reset_score();
            assert!((0.4..=0.8).contains(&score), "{score}");
        }
    }

    #[test]
    fn reversed_and_oversized_ranges_are_normalized() {
        let mut activity = SimulatedActivity::seeded(1, 1.5..=0.9);
        for _ in 0..100 {
            let score = activity.read_and_reset_score();
            assert!((0.9..=1.0).contains(&score), "{score}");
        }
    }

    #[test]
    fn non_finite_bounds_use_default_range() {
        for range in [f64::NAN..=0.8, 0.4..=f64::INFINITY] {
            let mut activity = SimulatedActivity::seeded(7, range);
            for _ in 0..100 {
                let score = activity.read_and_reset_score();
                assert!((0.4..=0.8).contains(&score), "{score}");
            }
        }
    }
}
