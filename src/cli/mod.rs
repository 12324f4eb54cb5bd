pub mod detect;
pub mod output;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use detect::{process_detect_command, DetectCommand};
use run::{process_run_command, RunCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    monitor::{
        config::{MonitorConfig, CONFIG_FILE},
        session::entities::Mood,
    },
    sensing::camera::{open_candidate, CameraCandidate},
    suggestion::suggest,
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, SESSION_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "studymood", version, long_about = None)]
#[command(about = "Monitors mood and focus during study sessions", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/studymood or $HOME/.local/state/studymood"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Config file. By default config.toml in the application directory when it exists"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level, for example debug or trace. Falls back to RUST_LOG")]
    log_filter: Option<LevelFilter>,
    #[arg(long, global = true, help = "Also write logs to stderr")]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run a monitoring session until Ctrl-C or the time limit")]
    Run {
        #[command(flatten)]
        command: RunCommand,
    },
    #[command(about = "Classify the mood on still images")]
    Detect {
        #[command(flatten)]
        command: DetectCommand,
    },
    #[command(about = "Print the suggestion for a mood and focus score")]
    Suggest {
        #[arg(long, help = "One of happy, neutral, serious, sad")]
        mood: Mood,
        #[arg(long, value_parser = parse_focus, help = "Focus score between 0 and 1")]
        focus: f64,
    },
    #[command(about = "Probe the configured camera devices")]
    Cameras {},
}

fn parse_focus(value: &str) -> Result<f64, String> {
    let focus: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&focus) {
        Ok(focus)
    } else {
        Err(format!("{focus} is not between 0 and 1"))
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };
    let prefix = match args.commands {
        Commands::Run { .. } => SESSION_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir, args.log_filter, args.log_console)?;

    let config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::load_or_default(&app_dir.join(CONFIG_FILE))?,
    };

    match args.commands {
        Commands::Run { command } => process_run_command(command, config).await,
        Commands::Detect { command } => process_detect_command(command, config.classifier),
        Commands::Suggest { mood, focus } => {
            println!("{}", suggest(mood, focus));
            Ok(())
        }
        Commands::Cameras {} => {
            list_cameras(&config.camera_indices);
            Ok(())
        }
    }
}

fn list_cameras(indices: &[u32]) {
    for &index in indices {
        let candidate = CameraCandidate::Device(index);
        let result = open_candidate(&candidate).and_then(|mut source| {
            let frame = source.read_frame()?;
            Ok((source.name(), frame.dimensions()))
        });
        match result {
            Ok((name, (width, height))) => println!("{candidate}\tok\t{name}\t{width}x{height}"),
            Err(e) => println!("{candidate}\tunavailable\t{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{parse_focus, Args, Commands};
    use crate::monitor::session::entities::Mood;

    #[test]
    fn focus_must_be_a_score() {
        assert_eq!(parse_focus("0.75"), Ok(0.75));
        assert!(parse_focus("1.5").is_err());
        assert!(parse_focus("high").is_err());
    }

    #[test]
    fn suggest_arguments() {
        let args = Args::try_parse_from(["studymood", "suggest", "--mood", "sad", "--focus", "0.5"])
            .unwrap();
        assert!(matches!(
            args.commands,
            Commands::Suggest {
                mood: Mood::Sad,
                focus
            } if focus == 0.5
        ));
        assert!(
            Args::try_parse_from(["studymood", "suggest", "--mood", "focused", "--focus", "0.5"])
                .is_err()
        );
    }

    #[test]
    fn session_length_is_bounded() {
        let run = |minutes: &str| Args::try_parse_from(["studymood", "run", "--minutes", minutes]);
        assert!(run("1").is_ok());
        assert!(run("1440").is_ok());
        assert!(run("0").is_err());
        assert!(run("1441").is_err());
        assert!(run("18446744073709551615").is_err());
    }

    #[test]
    fn global_options_after_subcommand() {
        let args = Args::try_parse_from([
            "studymood",
            "run",
            "--minutes",
            "25",
            "--no-camera",
            "--log-console",
            "--dir",
            "/tmp/studymood",
        ])
        .unwrap();
        assert!(args.log_console);
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/studymood")));
        assert!(matches!(args.commands, Commands::Run { .. }));
    }
}
