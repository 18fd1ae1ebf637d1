//! DCT focus metric and hill-climb autofocus.
//!
//! - `BlockTransformer`: 8x8 tiling and in-place DCT-II.
//! - `HighFrequencyMask`: per-block high-pass reduction to a single scalar.
//! - `FocusMetric`: per-frame sharpness sample from a luminance plane.
//! - `AutofocusController`: lens sweep state machine driven by the samples.

mod controller;
mod dct;
mod mask;
mod metric;

pub use controller::{
    AutofocusConfig, AutofocusController, AutofocusState, FocusPhase, LensCommand, HISTORY_MASK,
    STABLE_PATTERN,
};
pub use dct::{Block, BlockTransformer, BLOCK_SIZE};
pub use mask::{HighFrequencyMask, HIGH_FREQUENCY_MASK};
pub use metric::FocusMetric;
