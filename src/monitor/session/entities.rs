use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse facial expression label. Text form is capitalised, parsing ignores case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Neutral,
    Serious,
    Sad,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Neutral, Mood::Serious, Mood::Sad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Neutral => "Neutral",
            Mood::Serious => "Serious",
            Mood::Sad => "Sad",
        }
    }
}

impl Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("Unknown mood {s:?}. Expected one of happy, neutral, serious, sad"))
    }
}

/// Output of a mood classifier for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoodReading {
    pub mood: Mood,
    /// Confidence-like value in [0, 1] describing how attentive the face looks.
    pub focus_hint: f64,
}

impl MoodReading {
    pub const fn new(mood: Mood, focus_hint: f64) -> Self {
        Self { mood, focus_hint }
    }

    /// Reading used whenever the camera or detector can't tell anything.
    pub const fn neutral() -> Self {
        Self::new(Mood::Neutral, 0.5)
    }
}

/// One point of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub mood: Mood,
    pub focus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FocusLevel {
    Low,
    Medium,
    High,
}

impl FocusLevel {
    pub fn from_focus(focus: f64) -> Self {
        if focus >= 0.7 {
            FocusLevel::High
        } else if focus >= 0.4 {
            FocusLevel::Medium
        } else {
            FocusLevel::Low
        }
    }
}

impl Display for FocusLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusLevel::Low => write!(f, "Low Focus"),
            FocusLevel::Medium => write!(f, "Medium Focus"),
            FocusLevel::High => write!(f, "High Focus"),
        }
    }
}
