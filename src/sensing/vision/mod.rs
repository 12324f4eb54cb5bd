//! Facial side of the focus score. A [MoodClassifier] is picked once at startup: the Haar cascade
//! classifier when cascade files can be found, a stub answering "Neutral" otherwise.

pub mod cascade;
pub mod grouping;
pub mod integral;

use std::path::{Path, PathBuf};

use anyhow::Result;
use image::imageops;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::monitor::session::entities::{Mood, MoodReading};

use super::camera::{is_blank, Frame};
use cascade::{DetectionParams, HaarCascade};

pub const FACE_CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";
pub const SMILE_CASCADE_FILE: &str = "haarcascade_smile.xml";

/// Places where OpenCV packages usually install their cascades.
pub const KNOWN_CASCADE_DIRS: [&str; 5] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
];

/// Focus hint reported whenever a face is visible.
pub const FACE_VISIBLE_FOCUS: f64 = 0.8;

pub const DEFAULT_FACE_PARAMS: DetectionParams = DetectionParams {
    scale_factor: 1.3,
    min_neighbors: 5,
    min_size: 0,
};

pub const DEFAULT_SMILE_PARAMS: DetectionParams = DetectionParams {
    scale_factor: 1.8,
    min_neighbors: 20,
    min_size: 0,
};

#[cfg_attr(test, mockall::automock)]
pub trait MoodClassifier: Send {
    /// Never fails. Anything that prevents a decision yields [MoodReading::neutral].
    fn detect(&self, frame: &Frame) -> MoodReading;

    fn is_stub(&self) -> bool;
}

/// Used when no detector backend could be loaded.
pub struct StubClassifier;

impl MoodClassifier for StubClassifier {
    fn detect(&self, _frame: &Frame) -> MoodReading {
        MoodReading::neutral()
    }

    fn is_stub(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Directory holding the face and smile cascades. Searched before [KNOWN_CASCADE_DIRS].
    pub cascade_dir: Option<PathBuf>,
    pub face: DetectionParams,
    pub smile: DetectionParams,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            cascade_dir: None,
            face: DEFAULT_FACE_PARAMS,
            smile: DEFAULT_SMILE_PARAMS,
        }
    }
}

impl ClassifierSettings {
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.cascade_dir
            .iter()
            .cloned()
            .chain(KNOWN_CASCADE_DIRS.iter().map(PathBuf::from))
            .collect()
    }
}

/// Face detection followed by smile detection inside the first face.
pub struct CascadeClassifier {
    face: HaarCascade,
    smile: HaarCascade,
    face_params: DetectionParams,
    smile_params: DetectionParams,
}

impl CascadeClassifier {
    pub fn new(
        face: HaarCascade,
        smile: HaarCascade,
        face_params: DetectionParams,
        smile_params: DetectionParams,
    ) -> Self {
        Self {
            face,
            smile,
            face_params,
            smile_params,
        }
    }

    pub fn load(dir: &Path, settings: &ClassifierSettings) -> Result<Self> {
        let face = HaarCascade::load(&dir.join(FACE_CASCADE_FILE))?;
        let smile = HaarCascade::load(&dir.join(SMILE_CASCADE_FILE))?;
        Ok(Self::new(face, smile, settings.face, settings.smile))
    }

    fn classify(&self, frame: &Frame) -> Result<MoodReading> {
        let gray = imageops::grayscale(frame);
        let faces = self.face.detect_multi_scale(&gray, &self.face_params)?;
        let Some(face) = faces.first().and_then(|f| f.clamp_to(gray.width(), gray.height()))
        else {
            debug!("No face in frame");
            return Ok(MoodReading::neutral());
        };

        let region = imageops::crop_imm(&gray, face.x, face.y, face.width, face.height).to_image();
        let smiles = self.smile.detect_multi_scale(&region, &self.smile_params)?;
        debug!("Face at {face:?} with {} smile(s)", smiles.len());

        let mood = if smiles.is_empty() {
            Mood::Serious
        } else {
            Mood::Happy
        };
        Ok(MoodReading::new(mood, FACE_VISIBLE_FOCUS))
    }
}

impl MoodClassifier for CascadeClassifier {
    #[instrument(skip_all)]
    fn detect(&self, frame: &Frame) -> MoodReading {
        if is_blank(frame) {
            return MoodReading::neutral();
        }
        self.classify(frame).unwrap_or_else(|e| {
            warn!("Detector failed, treating frame as empty {e:?}");
            MoodReading::neutral()
        })
    }

    fn is_stub(&self) -> bool {
        false
    }
}

/// Loads the cascade classifier from the first directory holding both cascades.
pub fn load_classifier(settings: &ClassifierSettings) -> Box<dyn MoodClassifier> {
    for dir in settings.search_dirs() {
        match CascadeClassifier::load(&dir, settings) {
            Ok(classifier) => {
                info!("Loaded Haar cascades from {dir:?}");
                return Box::new(classifier);
            }
            Err(e) => debug!("No usable cascades in {dir:?}: {e:?}"),
        }
    }
    warn!("Haar cascades not found, mood detection disabled");
    Box::new(StubClassifier)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use image::{buffer::ConvertBuffer, Rgb, RgbImage};
    use tempfile::tempdir;

    use crate::{
        monitor::session::entities::{Mood, MoodReading},
        sensing::camera::synthetic_frame,
    };

    use super::{
        cascade::{
            tests::{constant_cascade, edge_image, EDGE_CASCADE},
            DetectionParams, HaarCascade,
        },
        load_classifier, CascadeClassifier, ClassifierSettings, MoodClassifier, StubClassifier,
        FACE_CASCADE_FILE, SMILE_CASCADE_FILE,
    };

    const FACE: DetectionParams = DetectionParams {
        scale_factor: 1.3,
        min_neighbors: 3,
        min_size: 0,
    };

    const SMILE: DetectionParams = DetectionParams {
        scale_factor: 1.8,
        min_neighbors: 0,
        min_size: 0,
    };

    fn classifier(smile_threshold: f64) -> CascadeClassifier {
        CascadeClassifier::new(
            HaarCascade::from_xml_str(EDGE_CASCADE).unwrap(),
            HaarCascade::from_xml_str(&constant_cascade(smile_threshold)).unwrap(),
            FACE,
            SMILE,
        )
    }

    fn edge_frame() -> RgbImage {
        edge_image(96, 64).convert()
    }

    #[test]
    fn stub_is_always_neutral() {
        assert_eq!(StubClassifier.detect(&edge_frame()), MoodReading::neutral());
        assert_eq!(MoodReading::neutral(), MoodReading::new(Mood::Neutral, 0.5));
    }

    #[test]
    fn blank_frames_are_neutral() {
        let classifier = classifier(-10.0);
        assert_eq!(classifier.detect(&synthetic_frame()), MoodReading::neutral());
        assert_eq!(classifier.detect(&RgbImage::new(0, 0)), MoodReading::neutral());
        let gray = RgbImage::from_pixel(96, 64, Rgb([90, 90, 90]));
        assert_eq!(classifier.detect(&gray), MoodReading::neutral());
    }

    #[test]
    fn smile_inside_face_is_happy() {
        assert_eq!(
            classifier(-10.0).detect(&edge_frame()),
            MoodReading::new(Mood::Happy, 0.8)
        );
    }

    #[test]
    fn face_without_smile_is_serious() {
        assert_eq!(
            classifier(10.0).detect(&edge_frame()),
            MoodReading::new(Mood::Serious, 0.8)
        );
    }

    #[test]
    fn no_face_is_neutral() {
        let mut frame = edge_frame();
        image::imageops::flip_horizontal_in_place(&mut frame);
        assert_eq!(classifier(-10.0).detect(&frame), MoodReading::neutral());
    }

    #[test]
    fn detector_errors_are_neutral() {
        let broken = CascadeClassifier::new(
            HaarCascade::from_xml_str(EDGE_CASCADE).unwrap(),
            HaarCascade::from_xml_str(&constant_cascade(-10.0)).unwrap(),
            DetectionParams {
                scale_factor: 0.5,
                ..FACE
            },
            SMILE,
        );
        assert_eq!(broken.detect(&edge_frame()), MoodReading::neutral());
    }

    #[test]
    fn loads_from_configured_directory() -> Result<()> {
        let dir = tempdir()?;
        let settings = ClassifierSettings {
            cascade_dir: Some(dir.path().to_path_buf()),
            face: FACE,
            smile: SMILE,
        };

        std::fs::write(dir.path().join(FACE_CASCADE_FILE), EDGE_CASCADE)?;
        std::fs::write(dir.path().join(SMILE_CASCADE_FILE), constant_cascade(-10.0))?;
        let classifier = load_classifier(&settings);
        assert!(!classifier.is_stub());
        assert_eq!(classifier.detect(&edge_frame()).mood, Mood::Happy);
        Ok(())
    }

    #[test]
    fn broken_cascade_files_fail_to_load() -> Result<()> {
        let dir = tempdir()?;
        let settings = ClassifierSettings::default();
        assert!(CascadeClassifier::load(dir.path(), &settings).is_err());

        std::fs::write(dir.path().join(FACE_CASCADE_FILE), "<broken")?;
        std::fs::write(dir.path().join(SMILE_CASCADE_FILE), constant_cascade(-10.0))?;
        assert!(CascadeClassifier::load(dir.path(), &settings).is_err());
        Ok(())
    }
}
