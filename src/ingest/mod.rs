//! Frame sources and lens actuators.
//!
//! The perception core never talks to hardware. It receives frames from a
//! `FrameSource` and sends lens commands to a `LensActuator`; both are owned by
//! the caller and passed in explicitly.
//!
//! - `stub://` URLs: synthetic camera with a simulated focus lens
//! - local image paths: still-image replay (feature: ingest-still)

#[cfg(feature = "ingest-still")]
pub mod still;
pub mod synthetic;

use anyhow::Result;

use crate::frame::Frame;

#[cfg(feature = "ingest-still")]
pub use still::StillImageSource;
pub use synthetic::{SyntheticCamera, SyntheticConfig, SyntheticStats};

/// Supplies one frame per tick. Blocks until the frame is available.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame>;
}

/// Focus actuator of the camera module.
pub trait LensActuator {
    /// Move the lens to `position` (units defined by the camera driver).
    fn set_lens_position(&mut self, position: f32) -> Result<()>;

    /// Signal the start of a new autofocus sweep.
    fn trigger_autofocus(&mut self) -> Result<()>;
}

/// Camera configuration used by `Camera::open`.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// `stub://<name>` or a local image path.
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Camera selected from a URL.
pub enum Camera {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-still")]
    Still(StillImageSource),
}

impl Camera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            Ok(Self::Synthetic(SyntheticCamera::new(SyntheticConfig {
                width: config.width,
                height: config.height,
                ..SyntheticConfig::default()
            })?))
        } else if config.url.contains("://") {
            anyhow::bail!("unsupported camera url {}", config.url)
        } else {
            #[cfg(feature = "ingest-still")]
            {
                Ok(Self::Still(StillImageSource::open(&config.url)?))
            }
            #[cfg(not(feature = "ingest-still"))]
            {
                anyhow::bail!("still image input requires the ingest-still feature")
            }
        }
    }
}

impl FrameSource for Camera {
    fn next_frame(&mut self) -> Result<Frame> {
        match self {
            Camera::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ingest-still")]
            Camera::Still(source) => source.next_frame(),
        }
    }
}

impl LensActuator for Camera {
    fn set_lens_position(&mut self, position: f32) -> Result<()> {
        match self {
            Camera::Synthetic(source) => source.set_lens_position(position),
            #[cfg(feature = "ingest-still")]
            Camera::Still(source) => source.set_lens_position(position),
        }
    }

    fn trigger_autofocus(&mut self) -> Result<()> {
        match self {
            Camera::Synthetic(source) => source.trigger_autofocus(),
            #[cfg(feature = "ingest-still")]
            Camera::Still(source) => source.trigger_autofocus(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_synthetic_camera_for_stub_urls() -> Result<()> {
        let mut camera = Camera::open(&CameraConfig {
            url: "stub://bench".to_string(),
            width: 32,
            height: 24,
        })?;
        let frame = camera.next_frame()?;
        assert_eq!((frame.width, frame.height), (32, 24));
        camera.set_lens_position(0.2)?;
        camera.trigger_autofocus()?;
        Ok(())
    }

    #[test]
    fn rejects_network_urls() {
        let result = Camera::open(&CameraConfig {
            url: "rtsp://camera-1/stream".to_string(),
            width: 640,
            height: 480,
        });
        assert!(result.is_err());
    }
}
