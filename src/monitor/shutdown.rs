use std::time::Duration;

use tracing::{error, info};

use super::switch::SessionSwitch;

/// Turns the session off on Ctrl-C.
pub async fn detect_shutdown(switch: SessionSwitch) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, stopping session");
            switch.stop();
        }
        Err(e) => error!("Can't listen for Ctrl-C {e:?}"),
    }
}

/// Turns the session off once `limit` has passed.
pub async fn stop_after(switch: SessionSwitch, limit: Duration) {
    tokio::time::sleep(limit).await;
    info!("Session time limit of {limit:?} reached");
    switch.stop();
}
