//! Synthetic camera with a simulated focus lens.
//!
//! The scene is a fixed random texture. Each captured frame is box-blurred by
//! a radius proportional to the distance between the commanded lens position
//! and a hidden in-focus position, so the autofocus loop can be exercised end
//! to end without hardware.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, LensActuator};
use crate::frame::{Frame, PixelFormat};

/// Largest scene the synthetic camera renders, in pixels.
const MAX_SCENE_PIXELS: usize = 8192 * 8192;

/// Configuration for a synthetic camera.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Lens position at which frames are perfectly sharp.
    pub focus_distance: f32,
    /// Blur radius in pixels per unit of lens defocus.
    pub blur_per_unit: f32,
    /// Seed for the scene texture.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            focus_distance: 0.6,
            blur_per_unit: 10.0,
            seed: 0x5eed,
        }
    }
}

/// Statistics for a synthetic camera.
#[derive(Clone, Debug, Default)]
pub struct SyntheticStats {
    pub frames_captured: u64,
    pub lens_moves: u64,
    pub autofocus_triggers: u64,
}

pub struct SyntheticCamera {
    config: SyntheticConfig,
    scene: Vec<f32>,
    scratch: Vec<f32>,
    lens_position: f32,
    stats: SyntheticStats,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic camera dimensions must be non-zero"));
        }
        if !config.blur_per_unit.is_finite() || config.blur_per_unit < 0.0 {
            return Err(anyhow!("blur_per_unit must be a non-negative finite number"));
        }
        let pixels = (config.width as usize)
            .checked_mul(config.height as usize)
            .filter(|&pixels| pixels <= MAX_SCENE_PIXELS)
            .ok_or_else(|| {
                anyhow!(
                    "synthetic camera size {}x{} exceeds {} pixels",
                    config.width,
                    config.height,
                    MAX_SCENE_PIXELS
                )
            })?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let scene = (0..pixels).map(|_| rng.gen_range(0.0f32..255.0)).collect();
        log::info!(
            "SyntheticCamera: {}x{} scene, in focus at lens position {:.3}",
            config.width,
            config.height,
            config.focus_distance
        );
        Ok(Self {
            config,
            scene,
            scratch: vec![0.0; pixels],
            lens_position: 0.0,
            stats: SyntheticStats::default(),
        })
    }

    pub fn lens_position(&self) -> f32 {
        self.lens_position
    }

    pub fn stats(&self) -> &SyntheticStats {
        &self.stats
    }

    /// Current blur radius in pixels.
    pub fn blur_radius(&self) -> usize {
        let defocus = (self.lens_position - self.config.focus_distance).abs();
        let max_radius = (self.config.width.min(self.config.height) / 2) as usize;
        ((defocus * self.config.blur_per_unit).round() as usize).min(max_radius)
    }

    fn render(&mut self) -> Vec<u8> {
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let radius = self.blur_radius();

        // Separable box blur with clamped edges: scene -> scratch (rows),
        // then scratch -> output (columns).
        for y in 0..h {
            let row = &self.scene[y * w..(y + 1) * w];
            for x in 0..w {
                self.scratch[y * w + x] = box_mean(radius, w, |i| row[i], x);
            }
        }
        let mut out = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let value = box_mean(radius, h, |j| self.scratch[j * w + x], y);
                let v = value.round().clamp(0.0, 255.0) as u8;
                out.extend_from_slice(&[v, v, v]);
            }
        }
        out
    }
}

fn box_mean(radius: usize, len: usize, sample: impl Fn(usize) -> f32, center: usize) -> f32 {
    if radius == 0 {
        return sample(center);
    }
    let mut sum = 0.0;
    for offset in 0..=2 * radius {
        let idx = (center + offset).saturating_sub(radius).min(len - 1);
        sum += sample(idx);
    }
    sum / (2 * radius + 1) as f32
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<Frame> {
        self.stats.frames_captured += 1;
        let pixels = self.render();
        Ok(Frame::new(pixels, self.config.width, self.config.height, PixelFormat::Rgb24)?
            .with_sequence(self.stats.frames_captured))
    }
}

impl LensActuator for SyntheticCamera {
    fn set_lens_position(&mut self, position: f32) -> Result<()> {
        if !position.is_finite() {
            return Err(anyhow!("lens position must be finite"));
        }
        self.lens_position = position;
        self.stats.lens_moves += 1;
        Ok(())
    }

    fn trigger_autofocus(&mut self) -> Result<()> {
        self.stats.autofocus_triggers += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusMetric;
    use crate::frame::LumaPlane;

    fn camera() -> SyntheticCamera {
        SyntheticCamera::new(SyntheticConfig {
            width: 64,
            height: 48,
            ..SyntheticConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn frames_are_numbered_and_sized() -> Result<()> {
        let mut cam = camera();
        let first = cam.next_frame()?;
        let second = cam.next_frame()?;
        assert_eq!((first.sequence, second.sequence), (1, 2));
        assert_eq!((first.width, first.height), (64, 48));
        assert_eq!(first.format, PixelFormat::Rgb24);
        Ok(())
    }

    #[test]
    fn blur_grows_with_defocus() -> Result<()> {
        let mut cam = camera();
        cam.set_lens_position(0.6)?;
        assert_eq!(cam.blur_radius(), 0);
        cam.set_lens_position(0.3)?;
        assert_eq!(cam.blur_radius(), 3);
        cam.set_lens_position(100.0)?;
        assert_eq!(cam.blur_radius(), 24);
        assert_eq!(cam.stats().lens_moves, 3);
        Ok(())
    }

    #[test]
    fn sharpness_falls_off_away_from_focus() -> Result<()> {
        let mut cam = camera();
        let metric = FocusMetric::new();
        let mut plane = LumaPlane::default();

        let mut samples = Vec::new();
        for radius in 0..4 {
            cam.set_lens_position(0.6 + radius as f32 * 0.1)?;
            cam.next_frame()?.write_luma(&mut plane)?;
            samples.push(metric.measure(&mut plane)?);
        }
        for pair in samples.windows(2) {
            assert!(pair[0] > pair[1], "sharpness not decreasing: {samples:?}");
        }
        Ok(())
    }

    #[test]
    fn rejects_oversized_scenes() {
        for (width, height) in [(70_000, 70_000), (u32::MAX, 2), (8193, 8192)] {
            let result = SyntheticCamera::new(SyntheticConfig {
                width,
                height,
                ..SyntheticConfig::default()
            });
            assert!(result.is_err(), "accepted {width}x{height}");
        }
    }

    #[test]
    fn rejects_bad_lens_commands() {
        let mut cam = camera();
        assert!(cam.set_lens_position(f32::NAN).is_err());
    }
}
