use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error};

use super::session::entities::Sample;

pub mod module;
pub mod recorder;

/// Receiving end of the session channel. Hands every sample to the processor and finalizes it once
/// the sampling loop has dropped its sender.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<Sample>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<Sample>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(sample) = self.receiver.recv().await {
            debug!("Processing sample {:?}", sample);
            if let Err(e) = self.processor.process_next(sample.clone()).await {
                error!("Error processing sample {:?}: {e:?}", sample)
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
