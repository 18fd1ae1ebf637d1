use anyhow::{anyhow, Result};

use super::result::BoxRect;

/// Greedy non-maximum suppression.
///
/// Scratch buffers are kept between calls so steady-state frames do not
/// reallocate.
#[derive(Clone, Debug, Default)]
pub struct NmsSuppressor {
    order: Vec<usize>,
    suppressed: Vec<bool>,
}

impl NmsSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of the boxes that survive suppression.
    ///
    /// Boxes with `confidence <= score_threshold` are dropped first. The rest
    /// are visited by descending confidence, equal confidences in their
    /// input order; each kept box removes every later box whose IoU with
    /// it exceeds `overlap_threshold`. The result is in visiting order.
    pub fn suppress(
        &mut self,
        boxes: &[BoxRect],
        confidences: &[f32],
        score_threshold: f32,
        overlap_threshold: f32,
    ) -> Result<Vec<usize>> {
        if boxes.len() != confidences.len() {
            return Err(anyhow!(
                "nms input mismatch: {} boxes, {} confidences",
                boxes.len(),
                confidences.len()
            ));
        }

        self.order.clear();
        self.order.extend((0..boxes.len()).filter(|&i| confidences[i] > score_threshold));
        // Stable sort keeps insertion order among equal confidences.
        self.order.sort_by(|&a, &b| confidences[b].total_cmp(&confidences[a]));

        self.suppressed.clear();
        self.suppressed.resize(self.order.len(), false);

        let mut keep = Vec::new();
        for pos in 0..self.order.len() {
            if self.suppressed[pos] {
                continue;
            }
            let selected = self.order[pos];
            keep.push(selected);
            for later in pos + 1..self.order.len() {
                if !self.suppressed[later]
                    && boxes[selected].iou(&boxes[self.order[later]]) > overlap_threshold
                {
                    self.suppressed[later] = true;
                }
            }
        }
        Ok(keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes() -> Vec<BoxRect> {
        vec![
            BoxRect::new(0, 0, 100, 100),
            BoxRect::new(5, 5, 100, 100),
            BoxRect::new(300, 300, 50, 50),
            BoxRect::new(310, 305, 50, 50),
            BoxRect::new(600, 0, 20, 20),
        ]
    }

    #[test]
    fn keeps_best_of_each_overlapping_group() -> Result<()> {
        let mut nms = NmsSuppressor::new();
        let conf = [0.6, 0.9, 0.8, 0.7, 0.55];
        let keep = nms.suppress(&boxes(), &conf, 0.5, 0.45)?;
        assert_eq!(keep, vec![1, 2, 4]);
        Ok(())
    }

    #[test]
    fn suppression_is_idempotent() -> Result<()> {
        let mut nms = NmsSuppressor::new();
        let all = boxes();
        let conf = [0.6, 0.9, 0.8, 0.7, 0.55];
        let keep = nms.suppress(&all, &conf, 0.5, 0.45)?;

        let kept_boxes: Vec<BoxRect> = keep.iter().map(|&i| all[i]).collect();
        let kept_conf: Vec<f32> = keep.iter().map(|&i| conf[i]).collect();
        let again = nms.suppress(&kept_boxes, &kept_conf, 0.5, 0.45)?;

        let mapped: Vec<usize> = again.iter().map(|&i| keep[i]).collect();
        assert_eq!(mapped, keep);
        Ok(())
    }

    #[test]
    fn equal_confidence_tie_goes_to_lower_index() -> Result<()> {
        let mut nms = NmsSuppressor::new();
        let boxes = [
            BoxRect::new(200, 200, 10, 10),
            BoxRect::new(0, 0, 50, 50),
            BoxRect::new(2, 2, 50, 50),
        ];
        let keep = nms.suppress(&boxes, &[0.3, 0.8, 0.8], 0.1, 0.5)?;
        assert_eq!(keep, vec![1, 0]);
        Ok(())
    }

    #[test]
    fn score_threshold_refilters_strictly() -> Result<()> {
        let mut nms = NmsSuppressor::new();
        let boxes = [BoxRect::new(0, 0, 10, 10), BoxRect::new(50, 50, 10, 10)];
        let keep = nms.suppress(&boxes, &[0.5, 0.51], 0.5, 0.45)?;
        assert_eq!(keep, vec![1]);
        Ok(())
    }

    #[test]
    fn overlap_at_threshold_is_kept() -> Result<()> {
        let mut nms = NmsSuppressor::new();
        // IoU = 50 / 150 exactly one third.
        let boxes = [BoxRect::new(0, 0, 10, 10), BoxRect::new(5, 0, 10, 10)];
        let iou = boxes[0].iou(&boxes[1]);
        let keep = nms.suppress(&boxes, &[0.9, 0.8], 0.0, iou)?;
        assert_eq!(keep, vec![0, 1]);
        Ok(())
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let mut nms = NmsSuppressor::new();
        assert!(nms
            .suppress(&[BoxRect::default()], &[0.9, 0.8], 0.0, 0.5)
            .is_err());
        assert_eq!(nms.suppress(&[], &[], 0.0, 0.5).unwrap(), Vec::<usize>::new());
    }
}
