//! Detection tensor decoding.
//!
//! - `InferenceBackend`: external engine producing one raw tensor per frame.
//! - `DetectionTensor` / `ModelResolution`: validated view over that tensor.
//! - `DetectionDecoder`: objectness + class gates, rescaling, NMS, trigger flag.
//! - `NmsSuppressor`: greedy IoU suppression with a stable tie-break.

mod backend;
mod backends;
mod decoder;
mod labels;
mod nms;
mod result;
mod tensor;

pub use backend::{InferenceBackend, InferenceOutput};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decoder::{DecoderConfig, DetectionDecoder};
pub use labels::ClassList;
pub use nms::NmsSuppressor;
pub use result::{BoxRect, DecodeStats, Detection, DetectionBatch};
pub use tensor::{DetectionTensor, ModelResolution, CLASS_OFFSET, OBJECTNESS_INDEX};
