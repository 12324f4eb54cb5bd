use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    monitor::sampling::blend::round_focus,
    suggestion::Suggestion,
};

use super::{
    entities::{FocusLevel, Mood, Sample},
    Session,
};

pub const DEFAULT_TREND_BUCKET_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodCount {
    pub mood: Mood,
    pub count: usize,
    /// Part of all samples in percent, rounded to 2 decimals.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusPoint {
    pub start: DateTime<Utc>,
    pub average: f64,
    pub samples: usize,
}

/// Everything the terminal views show once a session ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    /// Most recent sample, what a live dashboard would show.
    pub latest: Option<Sample>,
    pub total_samples: usize,
    pub mood_counts: Vec<MoodCount>,
    pub most_common_mood: Option<Mood>,
    pub average_focus: Option<f64>,
    pub peak_focus: Option<f64>,
    pub focus_level: Option<FocusLevel>,
    pub focus_trend: Vec<FocusPoint>,
    pub suggestion: Option<Suggestion>,
}

impl SessionReport {
    pub fn duration(&self) -> Duration {
        self.latest
            .as_ref()
            .map(|last| last.timestamp - self.started_at)
            .unwrap_or_else(Duration::zero)
    }
}

/// Summarises a session snapshot. Focus trend is averaged over consecutive buckets of `bucket`
/// counted from the session start; a non-positive bucket puts everything into one.
pub fn analyze_session(session: &Session, bucket: Duration) -> SessionReport {
    let samples = session.samples();
    let mood_counts = mood_distribution(samples);
    let average_focus = (!samples.is_empty())
        .then(|| round_focus(samples.iter().map(|s| s.focus).sum::<f64>() / samples.len() as f64));
    let peak_focus = samples.iter().map(|s| s.focus).reduce(f64::max);

    SessionReport {
        started_at: session.started_at(),
        latest: session.last_sample().cloned(),
        total_samples: samples.len(),
        most_common_mood: mood_counts.first().map(|c| c.mood),
        mood_counts,
        average_focus,
        peak_focus,
        focus_level: average_focus.map(FocusLevel::from_focus),
        focus_trend: focus_trend(samples, session.started_at(), bucket),
        suggestion: session.suggestion(),
    }
}

/// Sorted by descending count, ties in label order.
fn mood_distribution(samples: &[Sample]) -> Vec<MoodCount> {
    let mut counts = BTreeMap::<Mood, usize>::new();
    for sample in samples {
        *counts.entry(sample.mood).or_default() += 1;
    }

    let total = samples.len() as f64;
    let mut distribution = counts
        .into_iter()
        .map(|(mood, count)| MoodCount {
            mood,
            count,
            share: round_focus(count as f64 * 100.0 / total),
        })
        .collect::<Vec<_>>();
    // Stable sort keeps the label order of the map for equal counts.
    distribution.sort_by(|a, b| b.count.cmp(&a.count));
    distribution
}

fn focus_trend(samples: &[Sample], start: DateTime<Utc>, bucket: Duration) -> Vec<FocusPoint> {
    let bucket_ms = bucket.num_milliseconds();
    let mut buckets = BTreeMap::<i64, (f64, usize)>::new();
    for sample in samples {
        let offset = (sample.timestamp - start).num_milliseconds().max(0);
        let index = if bucket_ms > 0 { offset / bucket_ms } else { 0 };
        let entry = buckets.entry(index).or_default();
        entry.0 += sample.focus;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(index, (sum, count))| FocusPoint {
            start: start + Duration::milliseconds(index * bucket_ms.max(0)),
            average: round_focus(sum / count as f64),
            samples: count,
        })
        .collect()
}
