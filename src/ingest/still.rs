//! Still-image frame source.
//!
//! Replays one decoded image as an endless stream of identical frames, for
//! checking detector output on a known picture. The image is cropped to whole
//! 8x8 blocks so the focus metric accepts it. There is no lens: position
//! commands are recorded and otherwise ignored.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use super::{FrameSource, LensActuator};
use crate::focus::BLOCK_SIZE;
use crate::frame::{Frame, PixelFormat};

pub struct StillImageSource {
    frame: Frame,
    frames_served: u64,
    lens_position: f32,
}

impl StillImageSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to open image {}", path.display()))?
            .into_rgb8();

        let block = BLOCK_SIZE as u32;
        let width = image.width() / block * block;
        let height = image.height() / block * block;
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "image {} is smaller than one {}x{} block",
                path.display(),
                BLOCK_SIZE,
                BLOCK_SIZE
            ));
        }

        let cropped = image::imageops::crop_imm(&image, 0, 0, width, height).to_image();
        let frame = Frame::new(cropped.into_raw(), width, height, PixelFormat::Rgb24)?;
        log::info!(
            "StillImageSource: loaded {} ({}x{} after block crop)",
            path.display(),
            width,
            height
        );
        Ok(Self {
            frame,
            frames_served: 0,
            lens_position: 0.0,
        })
    }

    pub fn lens_position(&self) -> f32 {
        self.lens_position
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<Frame> {
        self.frames_served += 1;
        Ok(self.frame.clone().with_sequence(self.frames_served))
    }
}

impl LensActuator for StillImageSource {
    fn set_lens_position(&mut self, position: f32) -> Result<()> {
        self.lens_position = position;
        Ok(())
    }

    fn trigger_autofocus(&mut self) -> Result<()> {
        log::debug!("StillImageSource: autofocus trigger ignored (no lens)");
        Ok(())
    }
}
