use std::{path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sensing::{
    activity::ActivitySettings, camera::DEFAULT_DEVICE_INDICES, vision::ClassifierSettings,
};

use super::sampling::blend::FocusBlend;

pub const CONFIG_FILE: &str = "config.toml";
/// One sample per hour.
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 60 * 60 * 1000;
/// One suggestion per day.
pub const MAX_SUGGESTION_REFRESH_SECS: u64 = 24 * 60 * 60;

/// Tunables of a monitoring session. Every field has a default so a config file only needs to
/// mention what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sample_interval_ms: u64,
    pub suggestion_refresh_secs: u64,
    pub blend: FocusBlend,
    pub camera_indices: Vec<u32>,
    pub activity: ActivitySettings,
    pub classifier: ClassifierSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            suggestion_refresh_secs: 120,
            blend: FocusBlend::default(),
            camera_indices: DEFAULT_DEVICE_INDICES.to_vec(),
            activity: ActivitySettings::default(),
            classifier: ClassifierSettings::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Invalid config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Couldn't read config {path:?}"))?;
        let config = Self::from_toml(&text).with_context(|| format!("In {path:?}"))?;
        info!("Loaded config from {path:?}");
        Ok(config)
    }

    /// Reads `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SAMPLE_INTERVAL_MS).contains(&self.sample_interval_ms) {
            bail!(
                "sample_interval_ms must be between 1 and {MAX_SAMPLE_INTERVAL_MS}, got {}",
                self.sample_interval_ms
            );
        }
        if self.suggestion_refresh_secs > MAX_SUGGESTION_REFRESH_SECS {
            bail!(
                "suggestion_refresh_secs can't exceed {MAX_SUGGESTION_REFRESH_SECS}, got {}",
                self.suggestion_refresh_secs
            );
        }
        for weight in [self.blend.face_weight, self.blend.activity_weight] {
            if !weight.is_finite() || weight < 0.0 {
                bail!("Focus weights must be finite and non-negative, got {weight}");
            }
        }
        if self.activity.saturation == 0 {
            bail!("activity.saturation must be positive");
        }
        for bound in [self.activity.simulated_min, self.activity.simulated_max] {
            if !bound.is_finite() {
                bail!("Simulated activity bounds must be finite, got {bound}");
            }
        }
        for params in [&self.classifier.face, &self.classifier.smile] {
            if !params.scale_factor.is_finite() || params.scale_factor <= 1.0 {
                bail!("Detector scale_factor must be greater than 1, got {}", params.scale_factor);
            }
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn suggestion_refresh(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.suggestion_refresh_secs as i64)
    }
}
