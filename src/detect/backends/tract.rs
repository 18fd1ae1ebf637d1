#![cfg(feature = "backend-tract")]

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{InferenceBackend, InferenceOutput};
use crate::detect::tensor::{ModelResolution, CLASS_OFFSET};
use crate::frame::Frame;

/// Tract-based backend for ONNX anchor-grid detectors.
///
/// Loads a local model file once. Each frame is resized (nearest neighbour)
/// to the square model input, scaled to `[0, 1]`, laid out as NCHW RGB, and
/// run through the model. The first output is returned flattened.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    resolution: ModelResolution,
    expected_len: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        resolution: ModelResolution,
        class_count: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = resolution.side() as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            resolution,
            expected_len: resolution.rows() * (CLASS_OFFSET + class_count),
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let rgb = frame.to_rgb()?;
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let side = self.resolution.side() as usize;

        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            let sy = y * src_h / side;
            let sx = x * src_w / side;
            rgb[(sy * src_w + sx) * 3 + channel] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn extract_tensor(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        if view.len() != self.expected_len {
            return Err(anyhow!(
                "model output has {} floats, expected {}",
                view.len(),
                self.expected_len
            ));
        }
        Ok(view.iter().copied().collect())
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<InferenceOutput> {
        let input = self.build_input(frame)?;
        let started = Instant::now();
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let elapsed = started.elapsed();
        let tensor = self.extract_tensor(outputs)?;

        Ok(InferenceOutput { tensor, elapsed })
    }
}
