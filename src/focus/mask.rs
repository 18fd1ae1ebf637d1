use super::dct::{Block, BLOCK_SIZE};

/// Triangular high-pass mask over DCT coefficients, row-major.
///
/// Zeros the 21 lowest-frequency coefficients in the upper-left corner and
/// keeps the remaining 43.
#[rustfmt::skip]
pub const HIGH_FREQUENCY_MASK: Block = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0,
    0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
    0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
];

/// Reduces a transformed block to its high-frequency magnitude.
#[derive(Clone, Copy, Debug, Default)]
pub struct HighFrequencyMask;

impl HighFrequencyMask {
    /// Mask, rectify and average the block, then fill it with the result.
    ///
    /// Returns the block's sharpness contribution: the sum of kept coefficient
    /// magnitudes divided by 64.
    pub fn apply(&self, block: &mut Block) -> f32 {
        let mut sum = 0.0f32;
        for (coeff, weight) in block.iter_mut().zip(HIGH_FREQUENCY_MASK.iter()) {
            *coeff = (*coeff * weight).abs();
            sum += *coeff;
        }
        let scalar = sum / (BLOCK_SIZE * BLOCK_SIZE) as f32;
        block.fill(scalar);
        scalar
    }

    /// Number of coefficients the mask keeps.
    pub fn kept_coefficients(&self) -> usize {
        HIGH_FREQUENCY_MASK.iter().filter(|&&w| w != 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::dct::BlockTransformer;

    #[test]
    fn mask_zeroes_the_low_frequency_triangle() {
        let mask = HighFrequencyMask;
        assert_eq!(mask.kept_coefficients(), 43);
        for row in 0..BLOCK_SIZE {
            for col in 0..BLOCK_SIZE {
                let kept = HIGH_FREQUENCY_MASK[row * BLOCK_SIZE + col] != 0.0;
                assert_eq!(kept, row + col >= 6, "row {row} col {col}");
            }
        }
    }

    #[test]
    fn zero_block_scores_zero() {
        let mut block: Block = [0.0; 64];
        assert_eq!(HighFrequencyMask.apply(&mut block), 0.0);
        assert!(block.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn unit_block_masked_directly_averages_kept_count() {
        let mut block: Block = [1.0; 64];
        let scalar = HighFrequencyMask.apply(&mut block);
        assert_eq!(scalar, 43.0 / 64.0);
        assert!(block.iter().all(|&v| v == scalar));
    }

    #[test]
    fn negative_coefficients_are_rectified() {
        let mut block: Block = [-2.0; 64];
        assert_eq!(HighFrequencyMask.apply(&mut block), 2.0 * 43.0 / 64.0);
    }

    #[test]
    fn flat_block_after_transform_has_no_high_frequency() {
        let dct = BlockTransformer::new();
        let mut block: Block = [1.0; 64];
        dct.dct2(&mut block);
        let scalar = HighFrequencyMask.apply(&mut block);
        assert!(scalar.abs() < 1e-5, "flat block scored {scalar}");
    }
}
