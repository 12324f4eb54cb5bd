use std::path::PathBuf;

use anyhow::Result;
use tracing::error;

use crate::sensing::vision::{load_classifier, ClassifierSettings};

#[derive(Debug, clap::Args)]
pub struct DetectCommand {
    #[arg(required = true, help = "Images to classify")]
    images: Vec<PathBuf>,
    #[arg(
        long,
        help = "Directory holding haarcascade_frontalface_default.xml and haarcascade_smile.xml"
    )]
    cascades: Option<PathBuf>,
}

/// Runs the mood classifier over still images and prints one line per image.
pub fn process_detect_command(
    DetectCommand { images, cascades }: DetectCommand,
    mut settings: ClassifierSettings,
) -> Result<()> {
    if cascades.is_some() {
        settings.cascade_dir = cascades;
    }
    let classifier = load_classifier(&settings);
    if classifier.is_stub() {
        eprintln!("Haar cascades not found, every image will be reported as Neutral");
    }

    for path in images {
        match image::open(&path) {
            Ok(image) => {
                let reading = classifier.detect(&image.to_rgb8());
                println!("{}\t{}\t{:.2}", path.display(), reading.mood, reading.focus_hint);
            }
            Err(e) => {
                error!("Can't open {path:?} {e:?}");
                println!("{}\terror\t{e}", path.display());
            }
        }
    }
    Ok(())
}
