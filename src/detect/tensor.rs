use anyhow::{anyhow, Result};

/// Offset of the objectness score within a tensor row.
pub const OBJECTNESS_INDEX: usize = 4;
/// Offset of the first class score within a tensor row.
pub const CLASS_OFFSET: usize = 5;

/// Supported square detector input sizes.
///
/// The number of candidate rows is fixed by the input size: three anchors per
/// cell over strides 8, 16 and 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelResolution {
    Px160,
    Px320,
    Px640,
}

impl ModelResolution {
    /// Validate model input dimensions.
    pub fn from_dims(width: u32, height: u32) -> Result<Self> {
        if width != height {
            return Err(anyhow!(
                "unsupported model size {}x{}: width and height must be equal",
                width,
                height
            ));
        }
        match width {
            160 => Ok(Self::Px160),
            320 => Ok(Self::Px320),
            640 => Ok(Self::Px640),
            _ => Err(anyhow!(
                "unsupported model size {}x{}: expected 160, 320 or 640",
                width,
                height
            )),
        }
    }

    pub fn side(self) -> u32 {
        match self {
            Self::Px160 => 160,
            Self::Px320 => 320,
            Self::Px640 => 640,
        }
    }

    /// Candidate rows produced per frame.
    pub fn rows(self) -> usize {
        match self {
            Self::Px160 => 1575,
            Self::Px320 => 6300,
            Self::Px640 => 25200,
        }
    }
}

/// Borrowed view over one raw detection tensor.
///
/// Each row is `[cx, cy, w, h, objectness, class_0 .. class_{C-1}]` in model
/// input coordinates.
#[derive(Clone, Copy, Debug)]
pub struct DetectionTensor<'a> {
    data: &'a [f32],
    rows: usize,
    stride: usize,
}

impl<'a> DetectionTensor<'a> {
    /// Wrap `data`, which must hold exactly `resolution.rows()` rows of
    /// `5 + class_count` floats.
    pub fn new(data: &'a [f32], resolution: ModelResolution, class_count: usize) -> Result<Self> {
        if class_count == 0 {
            return Err(anyhow!("detection tensor needs at least one class"));
        }
        let rows = resolution.rows();
        let stride = CLASS_OFFSET + class_count;
        let expected = rows * stride;
        if data.len() != expected {
            return Err(anyhow!(
                "detection tensor length mismatch: expected {} rows x {} = {} floats, got {}",
                rows,
                stride,
                expected,
                data.len()
            ));
        }
        Ok(Self { data, rows, stride })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Floats per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn class_count(&self) -> usize {
        self.stride - CLASS_OFFSET
    }

    pub fn row(&self, index: usize) -> Option<&'a [f32]> {
        let start = index.checked_mul(self.stride)?;
        self.data.get(start..start + self.stride)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f32]> {
        self.data.chunks_exact(self.stride)
    }
}
