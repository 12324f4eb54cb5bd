use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{bail, Result};
use rdev::{listen, EventType};
use tracing::{error, info};

use super::counter::ActivityCounter;

/// How long a freshly spawned listener gets to report an installation failure.
const INSTALL_GRACE: Duration = Duration::from_millis(300);

/// Installs global key-down and button-down hooks feeding `counter`. The returned flag turns
/// false when the listener thread stops.
pub fn install_input_hooks(counter: Arc<ActivityCounter>) -> Result<Arc<AtomicBool>> {
    let alive = Arc::new(AtomicBool::new(true));
    let (failure_tx, failure_rx) = mpsc::channel::<String>();

    let listener_alive = alive.clone();
    thread::Builder::new()
        .name("studymood-input".into())
        .spawn(move || {
            let result = listen(move |event| {
                if matches!(
                    event.event_type,
                    EventType::KeyPress(_) | EventType::ButtonPress(_)
                ) {
                    counter.record_activity();
                }
            });
            listener_alive.store(false, Ordering::Release);
            match result {
                Ok(()) => info!("Input listener finished"),
                Err(e) => {
                    error!("Input listener failed {e:?}");
                    let _ = failure_tx.send(format!("{e:?}"));
                }
            }
        })?;

    match failure_rx.recv_timeout(INSTALL_GRACE) {
        Ok(reason) => bail!("Couldn't hook global input: {reason}"),
        Err(RecvTimeoutError::Disconnected) if !alive.load(Ordering::Acquire) => {
            bail!("Input listener exited right after start")
        }
        Err(_) => Ok(alive),
    }
}
