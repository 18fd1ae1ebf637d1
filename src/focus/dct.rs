use anyhow::{anyhow, Result};

use crate::frame::LumaPlane;

/// Edge length of a transform block.
pub const BLOCK_SIZE: usize = 8;

/// One 8x8 block, row-major.
pub type Block = [f32; BLOCK_SIZE * BLOCK_SIZE];

/// Orthonormal 8x8 DCT-II applied block by block over a plane.
///
/// The basis is computed once; transforms run on stack buffers so the
/// per-block path never allocates.
#[derive(Clone, Debug)]
pub struct BlockTransformer {
    /// `basis[k][n] = c(k) * cos(pi * (2n + 1) * k / 16)`
    basis: [[f32; BLOCK_SIZE]; BLOCK_SIZE],
}

impl BlockTransformer {
    pub fn new() -> Self {
        let n = BLOCK_SIZE as f64;
        let mut basis = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        for (k, row) in basis.iter_mut().enumerate() {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            for (i, value) in row.iter_mut().enumerate() {
                let angle = std::f64::consts::PI * (2 * i + 1) as f64 * k as f64 / (2.0 * n);
                *value = (scale * angle.cos()) as f32;
            }
        }
        Self { basis }
    }

    /// Basis vector `k` (frequency index) sampled at the 8 block positions.
    pub fn basis(&self, k: usize) -> Option<&[f32; BLOCK_SIZE]> {
        self.basis.get(k)
    }

    /// 2D separable forward DCT, in place: rows first, then columns.
    pub fn dct2(&self, block: &mut Block) {
        let mut rows = [0.0f32; BLOCK_SIZE * BLOCK_SIZE];
        for r in 0..BLOCK_SIZE {
            let src = &block[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE];
            for (k, basis) in self.basis.iter().enumerate() {
                rows[r * BLOCK_SIZE + k] = dot(basis, src.iter().copied());
            }
        }
        for c in 0..BLOCK_SIZE {
            for (k, basis) in self.basis.iter().enumerate() {
                block[k * BLOCK_SIZE + c] =
                    dot(basis, (0..BLOCK_SIZE).map(|n| rows[n * BLOCK_SIZE + c]));
            }
        }
    }

    /// Visit every non-overlapping 8x8 block of `plane` in raster order.
    ///
    /// Each block is copied out, handed to `f`, and written back to the same
    /// tile. Returns the number of blocks visited. Planes that are empty or not
    /// a whole number of blocks in either direction are rejected.
    pub fn for_each_block<F>(plane: &mut LumaPlane, mut f: F) -> Result<usize>
    where
        F: FnMut(&mut Block),
    {
        let width = plane.width();
        let height = plane.height();
        if width == 0 || height == 0 || width % BLOCK_SIZE != 0 || height % BLOCK_SIZE != 0 {
            return Err(anyhow!(
                "plane {}x{} is not a whole number of {}x{} blocks",
                width,
                height,
                BLOCK_SIZE,
                BLOCK_SIZE
            ));
        }

        let data = plane.as_mut_slice();
        let mut block: Block = [0.0; BLOCK_SIZE * BLOCK_SIZE];
        let mut count = 0;
        for y in (0..height).step_by(BLOCK_SIZE) {
            for x in (0..width).step_by(BLOCK_SIZE) {
                for r in 0..BLOCK_SIZE {
                    let start = (y + r) * width + x;
                    block[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE]
                        .copy_from_slice(&data[start..start + BLOCK_SIZE]);
                }
                f(&mut block);
                for r in 0..BLOCK_SIZE {
                    let start = (y + r) * width + x;
                    data[start..start + BLOCK_SIZE]
                        .copy_from_slice(&block[r * BLOCK_SIZE..(r + 1) * BLOCK_SIZE]);
                }
                count += 1;
            }
        }
        Ok(count)
    }
}

impl Default for BlockTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn dot(basis: &[f32; BLOCK_SIZE], values: impl Iterator<Item = f32>) -> f32 {
    basis.iter().zip(values).map(|(b, v)| b * v).sum()
}
