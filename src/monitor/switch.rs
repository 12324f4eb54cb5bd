use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Externally toggled session flag. The sampling loop checks it once per iteration.
#[derive(Debug, Clone, Default)]
pub struct SessionSwitch(Arc<AtomicBool>);

impl SessionSwitch {
    pub fn start(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
