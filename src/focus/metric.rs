use anyhow::Result;

use super::dct::BlockTransformer;
use super::mask::HighFrequencyMask;
use crate::frame::LumaPlane;

/// DCT high-frequency sharpness of a luminance plane.
///
/// Higher values mean more edge and texture energy, which rises
/// (approximately monotonically) as an out-of-focus image comes into focus.
#[derive(Clone, Debug, Default)]
pub struct FocusMetric {
    transformer: BlockTransformer,
    mask: HighFrequencyMask,
}

impl FocusMetric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure the sharpness of `plane`, transforming it in place.
    ///
    /// Afterwards every 8x8 tile of the plane holds that tile's masked
    /// scalar, so `plane.block_map(BLOCK_SIZE)` yields the coarse sharpness
    /// grid. The returned sample is the mean over all tiles.
    pub fn measure(&self, plane: &mut LumaPlane) -> Result<f32> {
        let mut total = 0.0f64;
        let blocks = BlockTransformer::for_each_block(plane, |block| {
            self.transformer.dct2(block);
            total += self.mask.apply(block) as f64;
        })?;
        Ok((total / blocks as f64) as f32)
    }
}
