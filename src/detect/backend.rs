use std::time::Duration;

use anyhow::Result;

use crate::frame::Frame;

/// Raw output of one inference call.
#[derive(Clone, Debug, Default)]
pub struct InferenceOutput {
    /// Flattened detection tensor, row-major.
    pub tensor: Vec<f32>,
    /// Wall time spent in the model. Diagnostics only.
    pub elapsed: Duration,
}

/// Inference engine that turns a frame into a raw detection tensor.
///
/// Backends own model loading and pre-processing. They never decode boxes;
/// that is the job of `DetectionDecoder`, which validates the tensor shape.
pub trait InferenceBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model on a frame.
    fn infer(&mut self, frame: &Frame) -> Result<InferenceOutput>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
