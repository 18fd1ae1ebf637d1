use std::ops::Range;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::backend::{InferenceBackend, InferenceOutput};
use crate::detect::tensor::{ModelResolution, CLASS_OFFSET, OBJECTNESS_INDEX};
use crate::frame::Frame;

/// Scripted subject emitted by the stub backend.
#[derive(Clone, Debug)]
struct Subject {
    class_id: usize,
    frames: Range<u64>,
}

/// Stub backend for testing and synthetic runs.
///
/// Emits a well-formed tensor with every row empty, plus one confident,
/// centered detection of the scripted class while the frame sequence number
/// falls inside the scripted range.
pub struct StubBackend {
    resolution: ModelResolution,
    class_count: usize,
    subject: Option<Subject>,
}

impl StubBackend {
    pub fn new(resolution: ModelResolution, class_count: usize) -> Self {
        Self {
            resolution,
            class_count,
            subject: None,
        }
    }

    /// Show a subject of `class_id` for frames whose sequence is in `frames`.
    pub fn with_subject(mut self, class_id: usize, frames: Range<u64>) -> Self {
        self.subject = Some(Subject { class_id, frames });
        self
    }

    fn subject_row(&self, row: &mut [f32], class_id: usize) {
        let side = self.resolution.side() as f32;
        row[0] = side * 0.5;
        row[1] = side * 0.5;
        row[2] = side * 0.25;
        row[3] = side * 0.5;
        row[OBJECTNESS_INDEX] = 0.9;
        row[CLASS_OFFSET + class_id] = 0.95;
    }
}

impl InferenceBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<InferenceOutput> {
        let stride = CLASS_OFFSET + self.class_count;
        let mut tensor = vec![0.0f32; self.resolution.rows() * stride];

        if let Some(subject) = &self.subject {
            if subject.class_id >= self.class_count {
                return Err(anyhow!(
                    "stub subject class {} is out of range for {} classes",
                    subject.class_id,
                    self.class_count
                ));
            }
            if subject.frames.contains(&frame.sequence) {
                // Put the subject in the middle of the grid like a real detector would.
                let row = self.resolution.rows() / 2;
                let class_id = subject.class_id;
                self.subject_row(&mut tensor[row * stride..(row + 1) * stride], class_id);
            }
        }

        Ok(InferenceOutput {
            tensor,
            elapsed: Duration::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DecoderConfig, DetectionDecoder};
    use crate::frame::PixelFormat;

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 64 * 48], 64, 48, PixelFormat::Gray8)
            .unwrap()
            .with_sequence(sequence)
    }

    #[test]
    fn scripted_subject_decodes_only_inside_range() -> Result<()> {
        let mut backend = StubBackend::new(ModelResolution::Px160, 4).with_subject(0, 3..5);
        let mut decoder = DetectionDecoder::new(DecoderConfig {
            class_count: 4,
            ..DecoderConfig::default()
        })?;

        let mut triggers = Vec::new();
        for seq in 1..=6 {
            let output = backend.infer(&frame(seq))?;
            triggers.push(decoder.decode(&output.tensor, 64, 48)?.has_trigger);
        }
        assert_eq!(triggers, vec![false, false, true, true, false, false]);
        Ok(())
    }

    #[test]
    fn out_of_range_subject_class_is_an_error() {
        let mut backend = StubBackend::new(ModelResolution::Px160, 2).with_subject(5, 0..10);
        assert!(backend.infer(&frame(1)).is_err());
    }
}
