use anyhow::Result;

use crate::monitor::session::entities::Sample;

/// Consumer of the samples produced by the sampling loop.
pub trait EventProcessor {
    fn process_next(&mut self, sample: Sample) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
