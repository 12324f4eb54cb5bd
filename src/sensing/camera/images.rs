use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::{Frame, FrameSource};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Replays still images as if they came from a camera. Useful without a webcam and for checking
/// the classifier on recorded pictures.
pub struct ImageReplay {
    frames: Vec<PathBuf>,
    position: usize,
}

impl ImageReplay {
    pub fn open(path: &Path) -> Result<Self> {
        let frames = if path.is_dir() {
            let mut frames = std::fs::read_dir(path)
                .with_context(|| format!("Can't list {path:?}"))?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| is_image(path))
                .collect::<Vec<_>>();
            frames.sort();
            frames
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            bail!("{path:?} is neither an image nor a directory")
        };

        if frames.is_empty() {
            bail!("No images found in {path:?}");
        }
        Ok(Self {
            frames,
            position: 0,
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|v| v.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl FrameSource for ImageReplay {
    fn name(&self) -> String {
        format!("{} replayed image(s)", self.frames.len())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let path = &self.frames[self.position];
        self.position = (self.position + 1) % self.frames.len();
        let image = image::open(path).with_context(|| format!("Failed to decode {path:?}"))?;
        Ok(image.to_rgb8())
    }
}
