use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use entities::Sample;

use crate::suggestion::{suggest, Suggestion};

pub mod entities;
pub mod report;

/// Append-only log of one monitoring session plus the suggestion shown for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    started_at: DateTime<Utc>,
    samples: Vec<Sample>,
    suggestion: Option<Suggestion>,
    last_suggestion_at: DateTime<Utc>,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            samples: vec![],
            suggestion: None,
            last_suggestion_at: started_at,
        }
    }

    /// Clears the log. The first suggestion becomes due one refresh interval after `at`.
    pub fn restart(&mut self, at: DateTime<Utc>) {
        *self = Self::new(at);
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn suggestion(&self) -> Option<Suggestion> {
        self.suggestion
    }

    pub fn last_suggestion_at(&self) -> DateTime<Utc> {
        self.last_suggestion_at
    }

    /// Re-evaluates the suggestion from `sample` when at least `refresh` has passed since the
    /// previous one. Returns the new suggestion if it was re-evaluated.
    pub fn refresh_suggestion(&mut self, sample: &Sample, refresh: Duration) -> Option<Suggestion> {
        if sample.timestamp - self.last_suggestion_at < refresh {
            return None;
        }
        let suggestion = suggest(sample.mood, sample.focus);
        self.suggestion = Some(suggestion);
        self.last_suggestion_at = sample.timestamp;
        Some(suggestion)
    }
}

/// Shared handle the recorder writes to and views read from.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<RwLock<Session>>);

impl SessionHandle {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self(Arc::new(RwLock::new(Session::new(started_at))))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{entities::Mood, Sample, Session, SessionHandle};
    use crate::suggestion::Suggestion;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample_at(secs: i64, mood: Mood, focus: f64) -> Sample {
        Sample {
            timestamp: start() + Duration::seconds(secs),
            mood,
            focus,
        }
    }

    #[test]
    fn first_suggestion_waits_for_refresh_interval() {
        let refresh = Duration::seconds(120);
        let mut session = Session::new(start());

        assert_eq!(session.refresh_suggestion(&sample_at(0, Mood::Happy, 0.9), refresh), None);
        assert_eq!(session.refresh_suggestion(&sample_at(119, Mood::Happy, 0.9), refresh), None);
        assert_eq!(
            session.refresh_suggestion(&sample_at(120, Mood::Happy, 0.9), refresh),
            Some(Suggestion::DeepWork)
        );
        assert_eq!(session.last_suggestion_at(), start() + Duration::seconds(120));

        assert_eq!(session.refresh_suggestion(&sample_at(200, Mood::Sad, 0.5), refresh), None);
        assert_eq!(session.suggestion(), Some(Suggestion::DeepWork));
        assert_eq!(
            session.refresh_suggestion(&sample_at(240, Mood::Sad, 0.5), refresh),
            Some(Suggestion::CreativeTask)
        );
    }

    #[test]
    fn restart_clears_the_log() {
        let handle = SessionHandle::new(start());
        handle.write().push(sample_at(1, Mood::Neutral, 0.5));
        handle
            .write()
            .refresh_suggestion(&sample_at(500, Mood::Neutral, 0.1), Duration::seconds(120));
        assert_eq!(handle.read().samples().len(), 1);

        let restart = start() + Duration::minutes(30);
        handle.write().restart(restart);
        let session = handle.snapshot();
        assert!(session.samples().is_empty());
        assert_eq!(session.suggestion(), None);
        assert_eq!(session.started_at(), restart);
        assert_eq!(session.last_suggestion_at(), restart);
    }
}
