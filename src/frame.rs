//! Frame buffers and the luminance plane.
//!
//! - `Frame`: one captured image in a camera pixel format (RGB24 or Gray8).
//! - `LumaPlane`: single-channel `f32` plane consumed by the focus metric.
//!
//! Conversions validate buffer lengths up front and report mismatches as errors
//! instead of reading out of bounds.

use anyhow::{anyhow, Result};
use std::borrow::Cow;

/// BT.601 luma weights, same as the usual RGB -> gray conversion.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit R, G, B.
    Rgb24,
    /// 8-bit luminance only.
    Gray8,
}

impl PixelFormat {
    /// Number of bytes a `width` x `height` frame occupies in this format.
    pub fn frame_len(self, width: u32, height: u32) -> Result<usize> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let len = match self {
            PixelFormat::Rgb24 => pixels.checked_mul(3),
            PixelFormat::Gray8 => Some(pixels),
        };
        len.ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

/// One captured frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Monotonic capture counter assigned by the source.
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let expected = format.frame_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "{:?} frame length mismatch: expected {}, got {}",
                format,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            sequence: 0,
        })
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Fill `plane` with this frame's luminance, resizing it to the frame size.
    ///
    /// The plane's buffer is reused across frames when the size does not change.
    pub fn write_luma(&self, plane: &mut LumaPlane) -> Result<()> {
        let expected = self.format.frame_len(self.width, self.height)?;
        if self.data.len() != expected {
            return Err(anyhow!(
                "{:?} frame length mismatch: expected {}, got {}",
                self.format,
                expected,
                self.data.len()
            ));
        }
        let w = self.width as usize;
        let h = self.height as usize;
        plane.reshape(w, h);
        let out = plane.as_mut_slice();
        match self.format {
            PixelFormat::Rgb24 => {
                for (dst, rgb) in out.iter_mut().zip(self.data.chunks_exact(3)) {
                    *dst = LUMA_R * rgb[0] as f32 + LUMA_G * rgb[1] as f32 + LUMA_B * rgb[2] as f32;
                }
            }
            PixelFormat::Gray8 => {
                for (dst, &y) in out.iter_mut().zip(&self.data) {
                    *dst = y as f32;
                }
            }
        }
        Ok(())
    }

    /// Packed RGB24 view of the frame, converting when needed.
    pub fn to_rgb(&self) -> Result<Cow<'_, [u8]>> {
        match self.format {
            PixelFormat::Rgb24 => Ok(Cow::Borrowed(&self.data)),
            PixelFormat::Gray8 => Ok(Cow::Owned(
                self.data.iter().flat_map(|&y| [y, y, y]).collect(),
            )),
        }
    }
}

/// Single-channel `f32` plane, row-major.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LumaPlane {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl LumaPlane {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| anyhow!("plane dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "plane length mismatch: expected {}x{}={}, got {}",
                width,
                height,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Resize to `width` x `height`. Contents are unspecified afterwards.
    pub(crate) fn reshape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height, 0.0);
    }

    /// Nearest-neighbour downsample to one pixel per `block` x `block` tile.
    ///
    /// After the focus metric has run, every tile is uniform, so this is the
    /// per-block sharpness grid.
    pub fn block_map(&self, block: usize) -> Result<LumaPlane> {
        if block == 0 || self.width % block != 0 || self.height % block != 0 {
            return Err(anyhow!(
                "plane {}x{} is not tiled by {}x{} blocks",
                self.width,
                self.height,
                block,
                block
            ));
        }
        let cols = self.width / block;
        let rows = self.height / block;
        let mut out = Vec::with_capacity(cols * rows);
        for by in 0..rows {
            for bx in 0..cols {
                out.push(self.data[by * block * self.width + bx * block]);
            }
        }
        LumaPlane::from_vec(cols, rows, out)
    }

    /// Arithmetic mean of all samples.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }
}
