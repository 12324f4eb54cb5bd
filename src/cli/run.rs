use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::{
    monitor::{
        config::MonitorConfig,
        processing::recorder::{SessionView, SilentView},
        run_session,
        session::{
            report::{analyze_session, DEFAULT_TREND_BUCKET_SECS},
            SessionHandle,
        },
        shutdown::{detect_shutdown, stop_after},
        switch::SessionSwitch,
        SessionSources,
    },
    sensing::{
        activity::create_activity_source,
        camera::{default_candidates, CameraFeed},
        vision::load_classifier,
    },
    utils::clock::SystemClock,
};

use super::output::{print_report, ConsoleView};

pub const MAX_SESSION_MINUTES: u64 = 24 * 60;

#[derive(Debug, clap::Args)]
pub struct RunCommand {
    #[arg(
        long,
        short,
        value_parser = clap::value_parser!(u64).range(1..=MAX_SESSION_MINUTES),
        help = "Stop the session after this many minutes, at most one day. Runs until Ctrl-C otherwise"
    )]
    minutes: Option<u64>,
    #[arg(
        long,
        help = "Image or directory of images replayed as camera frames. Tried before camera devices"
    )]
    frames: Option<PathBuf>,
    #[arg(
        long,
        help = "Directory holding haarcascade_frontalface_default.xml and haarcascade_smile.xml"
    )]
    cascades: Option<PathBuf>,
    #[arg(long, help = "Don't probe camera devices")]
    no_camera: bool,
    #[arg(long, help = "Use simulated activity instead of global input hooks")]
    simulate_activity: bool,
    #[arg(long, help = "Print the final report as JSON and skip live output")]
    json: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_TREND_BUCKET_SECS as u64,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Length of focus trend buckets in seconds"
    )]
    bucket_secs: u64,
}

/// Runs one session in the foreground and prints its report once it stops.
pub async fn process_run_command(
    RunCommand {
        minutes,
        frames,
        cascades,
        no_camera,
        simulate_activity,
        json,
        bucket_secs,
    }: RunCommand,
    mut config: MonitorConfig,
) -> Result<()> {
    if cascades.is_some() {
        config.classifier.cascade_dir = cascades;
    }

    let devices = if no_camera {
        vec![]
    } else {
        config.camera_indices.clone()
    };
    let candidates = default_candidates(&devices, frames);
    let camera = if candidates.is_empty() {
        CameraFeed::synthetic()
    } else {
        CameraFeed::probe(&candidates)
    };
    let classifier = load_classifier(&config.classifier);
    let activity = create_activity_source(&config.activity, simulate_activity);

    if !json {
        if camera.is_synthetic() {
            println!("Camera not available, running in analysis mode");
        }
        if classifier.is_stub() {
            println!("Mood detection disabled, every frame counts as Neutral");
        }
        if activity.is_simulated() {
            println!("Input hooks not available, activity is simulated");
        }
        println!("Session running, press Ctrl-C to stop");
    }

    let switch = SessionSwitch::default();
    switch.start();
    let shutdown = tokio::spawn(detect_shutdown(switch.clone()));
    let limit = minutes.map(|m| tokio::spawn(stop_after(switch.clone(), Duration::from_secs(m * 60))));

    let view: Box<dyn SessionView> = if json {
        Box::new(SilentView)
    } else {
        Box::new(ConsoleView)
    };
    let sources = SessionSources {
        camera,
        classifier,
        activity,
    };
    let session = run_session(
        SessionHandle::new(Utc::now()),
        sources,
        switch,
        &config,
        view,
        SystemClock,
    )
    .await?;

    shutdown.abort();
    if let Some(limit) = limit {
        limit.abort();
    }

    let report = analyze_session(
        &session.snapshot(),
        chrono::Duration::seconds(bucket_secs as i64),
    );
    info!("Session ended after {} samples", report.total_samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        print_report(&report);
    }
    Ok(())
}
