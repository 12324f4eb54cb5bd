use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    monitor::{session::entities::Sample, switch::SessionSwitch},
    sensing::{activity::ActivitySource, camera::CameraFeed, vision::MoodClassifier},
    utils::clock::Clock,
};

use super::blend::FocusBlend;

/// Polls the camera, the classifier and the activity source at a fixed cadence and sends one
/// [Sample] per iteration downstream.
pub struct SamplingModule {
    next: mpsc::Sender<Sample>,
    camera: CameraFeed,
    classifier: Box<dyn MoodClassifier>,
    activity: Box<dyn ActivitySource>,
    blend: FocusBlend,
    switch: SessionSwitch,
    sampling_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl SamplingModule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        next: mpsc::Sender<Sample>,
        camera: CameraFeed,
        classifier: Box<dyn MoodClassifier>,
        activity: Box<dyn ActivitySource>,
        blend: FocusBlend,
        switch: SessionSwitch,
        sampling_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            camera,
            classifier,
            activity,
            blend,
            switch,
            sampling_interval,
            time_provider,
        }
    }

    fn collect_sample(&mut self) -> Sample {
        let frame = self.camera.next_frame();
        let reading = self.classifier.detect(&frame);
        let activity = self.activity.read_and_reset_score();
        let focus = self.blend.combine(reading.focus_hint, activity);
        debug!(
            "Face {:?} activity {activity:.2} combined {focus:.2}",
            reading
        );

        Sample {
            timestamp: self.time_provider.time(),
            mood: reading.mood,
            focus,
        }
    }

    /// Executes the sampling loop until the session switch is turned off.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        while self.switch.is_active() {
            collection_point += self.sampling_interval;

            let sample = self.collect_sample();
            let span = info_span!("Recording sample");
            self.next
                .send(sample)
                .instrument(span)
                .await
                .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;

            self.time_provider.sleep_until(collection_point).await;
        }

        // Dropping the sender afterwards lets the recorder finish.
        info!("Session switched off, sampling stopped");
        Ok(())
    }
}
