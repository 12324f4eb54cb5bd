use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};
use tracing::{instrument, warn};

use super::{Frame, FrameSource};

/// Webcam opened through the platform's native capture API.
pub struct DeviceSource {
    index: u32,
    camera: Camera,
}

impl DeviceSource {
    #[instrument]
    pub fn open(index: u32) -> Result<Self> {
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .with_context(|| format!("Camera {index} is unavailable"))?;
        camera
            .open_stream()
            .with_context(|| format!("Failed to start streaming from camera {index}"))?;
        Ok(Self { index, camera })
    }
}

impl FrameSource for DeviceSource {
    fn name(&self) -> String {
        format!("camera {} ({})", self.index, self.camera.info().human_name())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let buffer = self.camera.frame()?;
        let decoded = buffer.decode_image::<RgbFormat>()?;
        let (width, height) = (decoded.width(), decoded.height());
        // Goes through raw bytes so the capture crate's image version doesn't leak into ours.
        RgbImage::from_raw(width, height, decoded.into_raw())
            .context("Camera returned a truncated frame")
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("Failed to stop camera {} {e:?}", self.index);
        }
    }
}
