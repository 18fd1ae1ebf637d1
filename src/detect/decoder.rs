use anyhow::{anyhow, Result};

use super::nms::NmsSuppressor;
use super::result::{BoxRect, DecodeStats, Detection, DetectionBatch};
use super::tensor::{DetectionTensor, ModelResolution, CLASS_OFFSET, OBJECTNESS_INDEX};

/// Decoder thresholds and model geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderConfig {
    pub model_width: u32,
    pub model_height: u32,
    pub class_count: usize,
    /// Rows with objectness below this are dropped without scanning classes.
    pub objectness_threshold: f32,
    /// Best class score must be strictly above this.
    pub class_score_threshold: f32,
    /// Confidence re-filter applied by NMS (strictly above).
    pub nms_score_threshold: f32,
    /// Boxes overlapping a kept box by more than this IoU are suppressed.
    pub nms_overlap_threshold: f32,
    /// Class ids that raise the trigger flag.
    pub trigger_classes: Vec<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            model_width: 160,
            model_height: 160,
            class_count: 80,
            objectness_threshold: 0.45,
            class_score_threshold: 0.5,
            nms_score_threshold: 0.5,
            nms_overlap_threshold: 0.45,
            trigger_classes: vec![0],
        }
    }
}

/// Turns raw anchor-grid tensors into filtered, suppressed detections.
pub struct DetectionDecoder {
    config: DecoderConfig,
    resolution: ModelResolution,
    nms: NmsSuppressor,
    boxes: Vec<BoxRect>,
    confidences: Vec<f32>,
    class_ids: Vec<usize>,
}

impl DetectionDecoder {
    /// Validate the configuration and build a decoder.
    ///
    /// Unsupported or non-square model sizes, an empty class set, thresholds
    /// outside `[0, 1]`, and trigger classes beyond the class count are all
    /// rejected here rather than per frame.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        let resolution = ModelResolution::from_dims(config.model_width, config.model_height)?;
        if config.class_count == 0 {
            return Err(anyhow!("class_count must be at least 1"));
        }
        for (name, value) in [
            ("objectness_threshold", config.objectness_threshold),
            ("class_score_threshold", config.class_score_threshold),
            ("nms_score_threshold", config.nms_score_threshold),
            ("nms_overlap_threshold", config.nms_overlap_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if let Some(&bad) = config
            .trigger_classes
            .iter()
            .find(|&&class_id| class_id >= config.class_count)
        {
            return Err(anyhow!(
                "trigger class {} is out of range for {} classes",
                bad,
                config.class_count
            ));
        }

        Ok(Self {
            config,
            resolution,
            nms: NmsSuppressor::new(),
            boxes: Vec::new(),
            confidences: Vec::new(),
            class_ids: Vec::new(),
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn resolution(&self) -> ModelResolution {
        self.resolution
    }

    /// Floats expected in every tensor handed to `decode`.
    pub fn tensor_len(&self) -> usize {
        self.resolution.rows() * (CLASS_OFFSET + self.config.class_count)
    }

    /// Decode one tensor for a frame of `frame_width` x `frame_height`.
    ///
    /// Rows are gated on objectness first; only rows that pass have their
    /// class scores scanned. Accepted boxes are rescaled from model space to
    /// frame space (truncating to whole pixels), suppressed, and the trigger
    /// flag is derived from the survivors.
    pub fn decode(
        &mut self,
        tensor: &[f32],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<DetectionBatch> {
        if frame_width == 0 || frame_height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero"));
        }
        let tensor = DetectionTensor::new(tensor, self.resolution, self.config.class_count)?;

        let x_scale = frame_width as f32 / self.config.model_width as f32;
        let y_scale = frame_height as f32 / self.config.model_height as f32;

        self.boxes.clear();
        self.confidences.clear();
        self.class_ids.clear();
        let mut stats = DecodeStats {
            rows: tensor.rows(),
            ..DecodeStats::default()
        };

        for row in tensor.iter_rows() {
            let objectness = row[OBJECTNESS_INDEX];
            if objectness < self.config.objectness_threshold {
                continue;
            }
            stats.class_scans += 1;
            let (class_id, class_score) = class_argmax(&row[CLASS_OFFSET..]);
            if class_score <= self.config.class_score_threshold {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            self.boxes.push(BoxRect {
                left: ((cx - 0.5 * w) * x_scale) as i32,
                top: ((cy - 0.5 * h) * y_scale) as i32,
                width: (w * x_scale) as i32,
                height: (h * y_scale) as i32,
            });
            self.confidences.push(objectness);
            self.class_ids.push(class_id);
        }
        stats.candidates = self.boxes.len();

        let keep = self.nms.suppress(
            &self.boxes,
            &self.confidences,
            self.config.nms_score_threshold,
            self.config.nms_overlap_threshold,
        )?;

        let detections: Vec<Detection> = keep
            .into_iter()
            .map(|idx| Detection {
                bbox: self.boxes[idx],
                class_id: self.class_ids[idx],
                confidence: self.confidences[idx],
            })
            .collect();
        let has_trigger = detections
            .iter()
            .any(|det| self.config.trigger_classes.contains(&det.class_id));
        stats.survivors = detections.len();

        Ok(DetectionBatch {
            detections,
            has_trigger,
            stats,
        })
    }
}

/// Index and value of the first maximum.
fn class_argmax(scores: &[f32]) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &score) in scores.iter().enumerate() {
        if score > best.1 {
            best = (i, score);
        }
    }
    best
}
