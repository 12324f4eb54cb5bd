//! Frame acquisition. Candidates are tried in a fixed order and the first one that actually yields
//! a frame is used for the whole session. [CameraFeed] never fails: without a working source it
//! hands out synthetic blank frames.

#[cfg(feature = "camera")]
pub mod device;
pub mod images;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use image::RgbImage;
use tracing::{debug, info, warn};

use images::ImageReplay;

pub type Frame = RgbImage;

pub const SYNTHETIC_WIDTH: u32 = 640;
pub const SYNTHETIC_HEIGHT: u32 = 480;

/// Device indices probed when nothing else is configured.
pub const DEFAULT_DEVICE_INDICES: [u32; 3] = [0, 1, 2];

pub fn synthetic_frame() -> Frame {
    RgbImage::new(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT)
}

/// Empty frames and frames where every pixel has the same color can't contain a face.
pub fn is_blank(frame: &Frame) -> bool {
    let mut pixels = frame.pixels();
    match pixels.next() {
        None => true,
        Some(first) => pixels.all(|pixel| pixel == first),
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait FrameSource {
    fn name(&self) -> String;

    /// Blocks until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraCandidate {
    Device(u32),
    /// A still image or a directory of images replayed in a loop.
    Images(PathBuf),
}

impl Display for CameraCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraCandidate::Device(index) => write!(f, "camera {index}"),
            CameraCandidate::Images(path) => write!(f, "images at {}", path.display()),
        }
    }
}

pub fn default_candidates(indices: &[u32], images: Option<PathBuf>) -> Vec<CameraCandidate> {
    images
        .map(CameraCandidate::Images)
        .into_iter()
        .chain(indices.iter().copied().map(CameraCandidate::Device))
        .collect()
}

pub fn open_candidate(candidate: &CameraCandidate) -> Result<Box<dyn FrameSource>> {
    match candidate {
        CameraCandidate::Images(path) => Ok(Box::new(ImageReplay::open(path)?)),
        CameraCandidate::Device(index) => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "camera")] {
                    Ok(Box::new(device::DeviceSource::open(*index)?))
                } else {
                    anyhow::bail!("Built without the camera feature, can't open camera {index}")
                }
            }
        }
    }
}

/// Opens candidates in order and returns the first that produces a frame.
pub fn open_first<F>(
    candidates: &[CameraCandidate],
    mut open: F,
) -> Option<(CameraCandidate, Box<dyn FrameSource>)>
where
    F: FnMut(&CameraCandidate) -> Result<Box<dyn FrameSource>>,
{
    for candidate in candidates {
        let mut source = match open(candidate) {
            Ok(source) => source,
            Err(e) => {
                debug!("Couldn't open {candidate}: {e:?}");
                continue;
            }
        };
        match source.read_frame() {
            Ok(_) => {
                info!("Using {candidate} ({})", source.name());
                return Some((candidate.clone(), source));
            }
            Err(e) => debug!("{candidate} opened but didn't produce a frame: {e:?}"),
        }
    }
    warn!("No functional camera found, running with synthetic frames");
    None
}

pub struct CameraFeed {
    source: Option<Box<dyn FrameSource>>,
}

impl CameraFeed {
    pub fn new(source: Option<Box<dyn FrameSource>>) -> Self {
        Self { source }
    }

    pub fn synthetic() -> Self {
        Self { source: None }
    }

    pub fn probe(candidates: &[CameraCandidate]) -> Self {
        Self::new(open_first(candidates, open_candidate).map(|(_, source)| source))
    }

    pub fn is_synthetic(&self) -> bool {
        self.source.is_none()
    }

    pub fn next_frame(&mut self) -> Frame {
        let Some(source) = self.source.as_mut() else {
            return synthetic_frame();
        };
        match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame read from {} failed {e:?}", source.name());
                synthetic_frame()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::anyhow;
    use image::{Rgb, RgbImage};

    use super::{
        default_candidates, is_blank, open_first, synthetic_frame, CameraCandidate, CameraFeed,
        FrameSource, MockFrameSource,
    };

    fn working_source() -> Box<dyn FrameSource> {
        let mut source = MockFrameSource::new();
        source.expect_name().returning(|| "working".into());
        source
            .expect_read_frame()
            .returning(|| Ok(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))));
        Box::new(source)
    }

    fn silent_source() -> Box<dyn FrameSource> {
        let mut source = MockFrameSource::new();
        source.expect_name().returning(|| "silent".into());
        source
            .expect_read_frame()
            .returning(|| Err(anyhow!("no frame")));
        Box::new(source)
    }

    #[test]
    fn synthetic_frames_are_blank() {
        let frame = synthetic_frame();
        assert_eq!(frame.dimensions(), (640, 480));
        assert!(is_blank(&frame));
        assert!(is_blank(&RgbImage::new(0, 0)));

        let mut frame = frame;
        frame.put_pixel(3, 3, Rgb([1, 0, 0]));
        assert!(!is_blank(&frame));
    }

    #[test]
    fn probing_stops_at_first_source_with_frames() {
        let candidates = default_candidates(&[0, 1, 2], None);
        let mut attempts = vec![];
        let opened = open_first(&candidates, |candidate| {
            attempts.push(candidate.clone());
            match candidate {
                CameraCandidate::Device(0) => Err(anyhow!("busy")),
                CameraCandidate::Device(1) => Ok(silent_source()),
                _ => Ok(working_source()),
            }
        });

        let (candidate, _) = opened.expect("third camera works");
        assert_eq!(candidate, CameraCandidate::Device(2));
        assert_eq!(attempts.len(), 3);
    }

    #[test]
    fn probing_without_working_sources() {
        let candidates = default_candidates(&[0, 1, 2], None);
        assert!(open_first(&candidates, |_| Ok(silent_source())).is_none());
    }

    #[test]
    fn image_candidates_come_first() {
        let candidates = default_candidates(&[0], Some(PathBuf::from("frames")));
        assert_eq!(
            candidates,
            vec![
                CameraCandidate::Images(PathBuf::from("frames")),
                CameraCandidate::Device(0)
            ]
        );
    }

    #[test]
    fn feed_degrades_to_synthetic_frames() {
        let mut feed = CameraFeed::new(Some(silent_source()));
        assert!(!feed.is_synthetic());
        assert!(is_blank(&feed.next_frame()));

        let mut feed = CameraFeed::synthetic();
        assert!(feed.is_synthetic());
        assert_eq!(feed.next_frame().dimensions(), (640, 480));

        let mut feed = CameraFeed::new(Some(working_source()));
        assert_eq!(feed.next_frame().dimensions(), (4, 4));
    }
}
