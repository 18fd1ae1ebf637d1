//! Focus Kernel
//!
//! Perception core for a single camera node: decodes the output tensor of a
//! YOLO-style detector, measures image sharpness with an 8x8 DCT high-pass
//! metric, and drives the lens with a hill-climb autofocus controller. A frame
//! is worth capturing once a trigger-class object is present and focus is
//! locked.
//!
//! # Module Structure
//!
//! - `detect`: tensor validation, decode, NMS, class labels, inference backends
//! - `focus`: block DCT, high-frequency mask, sharpness metric, autofocus controller
//! - `frame`: captured frames and luminance planes
//! - `ingest`: frame sources and lens actuators (synthetic camera, still images)
//! - `pipeline`: per-frame step tying detection, sharpness and autofocus together
//! - `config`: daemon configuration (JSON file plus environment overrides)

pub mod config;
pub mod detect;
pub mod focus;
pub mod frame;
pub mod ingest;
pub mod pipeline;

pub use config::FocusdConfig;
pub use detect::{
    BoxRect, ClassList, DecoderConfig, Detection, DetectionBatch, DetectionDecoder,
    InferenceBackend, InferenceOutput, ModelResolution, StubBackend,
};
pub use focus::{AutofocusConfig, AutofocusController, FocusMetric, FocusPhase, LensCommand};
pub use frame::{Frame, LumaPlane, PixelFormat};
pub use ingest::{Camera, CameraConfig, FrameSource, LensActuator, SyntheticCamera};
pub use pipeline::{FocusPipeline, FrameReport};
