//! Session orchestration: a sampling loop feeding a recorder through a bounded channel, both
//! running on the current task until the session switch is turned off.

use anyhow::Result;
use processing::{
    recorder::{SessionRecorder, SessionView},
    ProcessingModule,
};
use sampling::sampler::SamplingModule;
use session::{entities::Sample, SessionHandle};
use switch::SessionSwitch;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
    sensing::{activity::ActivitySource, camera::CameraFeed, vision::MoodClassifier},
    utils::clock::Clock,
};

use config::MonitorConfig;

pub mod config;
pub mod processing;
pub mod sampling;
pub mod session;
pub mod shutdown;
pub mod switch;

const SAMPLE_BUFFER: usize = 10;

/// Sensors a session samples from.
pub struct SessionSources {
    pub camera: CameraFeed,
    pub classifier: Box<dyn MoodClassifier>,
    pub activity: Box<dyn ActivitySource>,
}

/// Runs one session on `session`, clearing whatever it held before. The switch has to be on
/// already; the session ends once it is turned off and the recorder has drained every sample.
/// Returns the handle of the finished session.
pub async fn run_session(
    session: SessionHandle,
    sources: SessionSources,
    switch: SessionSwitch,
    config: &MonitorConfig,
    view: Box<dyn SessionView>,
    clock: impl Clock,
) -> Result<SessionHandle> {
    session.write().restart(clock.time());
    info!("Session started at {}", session.read().started_at());

    let (sender, receiver) = mpsc::channel::<Sample>(SAMPLE_BUFFER);
    let sampler = create_sampler(sender, sources, switch, config, clock);
    let processor = create_processor(receiver, session.clone(), config, view);

    let (sampling_result, processing_result) = tokio::join!(sampler.run(), processor.run());

    if let Err(sampling_result) = sampling_result {
        error!("Sampling module got an error {:?}", sampling_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(session)
}

fn create_sampler(
    sender: mpsc::Sender<Sample>,
    sources: SessionSources,
    switch: SessionSwitch,
    config: &MonitorConfig,
    clock: impl Clock,
) -> SamplingModule {
    SamplingModule::new(
        sender,
        sources.camera,
        sources.classifier,
        sources.activity,
        config.blend,
        switch,
        config.sample_interval(),
        Box::new(clock),
    )
}

fn create_processor(
    receiver: mpsc::Receiver<Sample>,
    session: SessionHandle,
    config: &MonitorConfig,
    view: Box<dyn SessionView>,
) -> ProcessingModule<SessionRecorder> {
    let recorder = SessionRecorder::new(session, config.suggestion_refresh(), view);
    ProcessingModule::new(receiver, recorder)
}

#[cfg(test)]
mod monitor_tests {
    use std::time::Duration;

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{run_session, SessionSources};
    use crate::{
        monitor::{
            config::MonitorConfig,
            processing::recorder::{MockSessionView, SilentView},
            session::{
                entities::{Mood, MoodReading, Sample},
                SessionHandle,
            },
            shutdown::stop_after,
            switch::SessionSwitch,
        },
        sensing::{
            activity::MockActivitySource, camera::CameraFeed, vision::MockMoodClassifier,
        },
        suggestion::Suggestion,
        utils::{clock::OffsetClock, logging::TEST_LOGGING},
    };

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), NaiveTime::MIN);

    fn happy_sources() -> SessionSources {
        let mut classifier = MockMoodClassifier::new();
        classifier
            .expect_detect()
            .returning(|_| MoodReading::new(Mood::Happy, 0.8));
        let mut activity = MockActivitySource::new();
        activity.expect_read_and_reset_score().returning(|| 1.0);

        SessionSources {
            camera: CameraFeed::synthetic(),
            classifier: Box::new(classifier),
            activity: Box::new(activity),
        }
    }

    /// Paused tokio time makes the sampling cadence and the timestamps exact.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_session() -> Result<()> {
        *TEST_LOGGING;
        let clock = OffsetClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE));
        let switch = SessionSwitch::default();
        switch.start();

        let mut view = MockSessionView::new();
        view.expect_sample_recorded().times(301).return_const(());
        view.expect_suggestion_changed()
            .times(1)
            .return_const(());

        let config = MonitorConfig::default();
        let (_, session) = tokio::join!(
            stop_after(switch.clone(), Duration::from_millis(150_250)),
            run_session(
                SessionHandle::new(Utc::now()),
                happy_sources(),
                switch.clone(),
                &config,
                Box::new(view),
                clock,
            ),
        );
        let session = session?.snapshot();

        let samples = session.samples();
        assert_eq!(samples.len(), 301);
        assert!(samples.iter().all(|s| s.mood == Mood::Happy && s.focus == 0.88));
        assert_eq!(samples[0].timestamp, Utc.from_utc_datetime(&TEST_START_DATE));
        assert_eq!(
            samples[300].timestamp - samples[0].timestamp,
            chrono::Duration::seconds(150)
        );
        assert_eq!(session.suggestion(), Some(Suggestion::DeepWork));
        assert_eq!(
            session.last_suggestion_at() - session.started_at(),
            chrono::Duration::seconds(120)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn switched_off_session_only_clears_the_log() -> Result<()> {
        let clock = OffsetClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE));
        let stale = SessionHandle::new(Utc::now());
        stale.write().push(Sample {
            timestamp: Utc::now(),
            mood: Mood::Sad,
            focus: 0.1,
        });
        let session = run_session(
            stale,
            happy_sources(),
            SessionSwitch::default(),
            &MonitorConfig::default(),
            Box::new(SilentView),
            clock,
        )
        .await?;

        let session = session.snapshot();
        assert!(session.samples().is_empty());
        assert_eq!(session.suggestion(), None);
        assert_eq!(session.started_at(), Utc.from_utc_datetime(&TEST_START_DATE));
        Ok(())
    }
}
