/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoxRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoxRect {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// Area in square pixels; degenerate boxes have zero area.
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection over union with `other`, in `[0, 1]`.
    pub fn iou(&self, other: &BoxRect) -> f32 {
        let ix = (self.right().min(other.right()) - (self.left.max(other.left)) as i64).max(0);
        let iy = (self.bottom().min(other.bottom()) - (self.top.max(other.top)) as i64).max(0);
        let inter = ix * iy;
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        (inter as f64 / union as f64) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoxRect,
    pub class_id: usize,
    /// Objectness of the row the box came from.
    pub confidence: f32,
}

/// Counters from one decode pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Rows scanned.
    pub rows: usize,
    /// Rows that passed the objectness gate and had their class scores scanned.
    pub class_scans: usize,
    /// Rows that passed both gates.
    pub candidates: usize,
    /// Boxes left after non-maximum suppression.
    pub survivors: usize,
}

/// Decoded detections of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionBatch {
    /// Surviving detections, highest confidence first.
    pub detections: Vec<Detection>,
    /// True when any surviving detection belongs to a trigger class.
    pub has_trigger: bool,
    pub stats: DecodeStats,
}

impl DetectionBatch {
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
