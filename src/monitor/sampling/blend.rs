use serde::{Deserialize, Serialize};

/// Weights of the facial and the activity cue in the combined focus score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusBlend {
    pub face_weight: f64,
    pub activity_weight: f64,
}

impl Default for FocusBlend {
    fn default() -> Self {
        Self {
            face_weight: 0.6,
            activity_weight: 0.4,
        }
    }
}

impl FocusBlend {
    /// Weighted sum rounded to 2 decimals and kept inside [0, 1]. A non-finite sum counts as 0.
    pub fn combine(&self, face_focus: f64, activity_score: f64) -> f64 {
        let combined = face_focus * self.face_weight + activity_score * self.activity_weight;
        if !combined.is_finite() {
            return 0.0;
        }
        round_focus(combined.clamp(0.0, 1.0))
    }
}

pub fn round_focus(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{round_focus, FocusBlend};

    #[test]
    fn default_weights() {
        let blend = FocusBlend::default();
        assert_eq!(blend.combine(0.8, 1.0), 0.88);
        assert_eq!(blend.combine(0.5, 0.0), 0.3);
        assert_eq!(blend.combine(0.5, 0.5), 0.5);
    }

    #[test]
    fn result_stays_in_range() {
        let blend = FocusBlend {
            face_weight: 1.0,
            activity_weight: 1.0,
        };
        assert_eq!(blend.combine(0.8, 0.8), 1.0);
        assert_eq!(round_focus(0.123), 0.12);
        assert_eq!(round_focus(0.125_1), 0.13);
    }

    #[test]
    fn non_finite_inputs_give_zero() {
        let blend = FocusBlend {
            face_weight: f64::NAN,
            activity_weight: 0.4,
        };
        assert_eq!(blend.combine(0.8, 1.0), 0.0);
        assert_eq!(FocusBlend::default().combine(f64::NAN, 1.0), 0.0);
        assert_eq!(FocusBlend::default().combine(f64::INFINITY, 0.0), 0.0);
    }
}
