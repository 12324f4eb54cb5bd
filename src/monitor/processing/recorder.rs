use anyhow::Result;
use chrono::Duration;
use tracing::info;

use crate::{
    monitor::session::{entities::Sample, SessionHandle},
    suggestion::Suggestion,
};

use super::module::EventProcessor;

/// Live observer of a running session.
#[cfg_attr(test, mockall::automock)]
pub trait SessionView: Send {
    fn sample_recorded(&mut self, sample: &Sample);

    fn suggestion_changed(&mut self, suggestion: Suggestion);
}

/// View that shows nothing, used when only the final report matters.
pub struct SilentView;

impl SessionView for SilentView {
    fn sample_recorded(&mut self, _sample: &Sample) {}

    fn suggestion_changed(&mut self, _suggestion: Suggestion) {}
}

/// Appends samples to the session log and keeps its suggestion fresh.
pub struct SessionRecorder {
    session: SessionHandle,
    refresh: Duration,
    view: Box<dyn SessionView>,
}

impl SessionRecorder {
    pub fn new(session: SessionHandle, refresh: Duration, view: Box<dyn SessionView>) -> Self {
        Self {
            session,
            refresh,
            view,
        }
    }
}

impl EventProcessor for SessionRecorder {
    async fn process_next(&mut self, sample: Sample) -> Result<()> {
        let refreshed = {
            let mut session = self.session.write();
            session.push(sample.clone());
            session.refresh_suggestion(&sample, self.refresh)
        };

        self.view.sample_recorded(&sample);
        if let Some(suggestion) = refreshed {
            info!("Suggestion refreshed: {suggestion:?}");
            self.view.suggestion_changed(suggestion);
        }
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        let session = self.session.read();
        info!(
            "Session started at {} finished with {} samples",
            session.started_at(),
            session.samples().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use mockall::predicate::eq;

    use super::{MockSessionView, SessionRecorder};
    use crate::{
        monitor::{
            processing::module::EventProcessor,
            session::{
                entities::{Mood, Sample},
                SessionHandle,
            },
        },
        suggestion::Suggestion,
    };

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn suggestion_is_refreshed_every_two_minutes() -> Result<()> {
        let mut view = MockSessionView::new();
        view.expect_sample_recorded().times(9).return_const(());
        view.expect_suggestion_changed()
            .with(eq(Suggestion::TakeBreak))
            .times(1)
            .return_const(());
        view.expect_suggestion_changed()
            .with(eq(Suggestion::SteadyProgress))
            .times(1)
            .return_const(());

        let session = SessionHandle::new(start());
        let mut recorder = SessionRecorder::new(session.clone(), Duration::seconds(120), Box::new(view));

        // One sample every 30 seconds; suggestions land at 120 s and 240 s.
        for step in 0..9 {
            let focus = if step < 6 { 0.2 } else { 0.5 };
            recorder
                .process_next(Sample {
                    timestamp: start() + Duration::seconds(step * 30),
                    mood: Mood::Neutral,
                    focus,
                })
                .await?;
        }
        recorder.finalize().await?;

        let session = session.snapshot();
        assert_eq!(session.samples().len(), 9);
        assert_eq!(session.suggestion(), Some(Suggestion::SteadyProgress));
        assert_eq!(session.last_suggestion_at(), start() + Duration::seconds(240));
        Ok(())
    }
}
