//! Axis-aligned pixel bounding boxes produced by a detector.

use serde::Deserialize;

/// Detection box in TLBR pixel coordinates.
///
/// Construction normalizes the corners so that `x1 <= x2` and `y1 <= y2` always hold.
/// The confidence is clamped into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "BoxRecord")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    /// Detection confidence in `[0, 1]`
    pub confidence: f32,
    /// Detector class identifier
    pub class_id: u32,
}

#[derive(Deserialize)]
struct BoxRecord {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    #[serde(default = "full_confidence")]
    confidence: f32,
    #[serde(default)]
    class_id: u32,
}

fn full_confidence() -> f32 {
    1.0
}

impl From<BoxRecord> for BoundingBox {
    fn from(r: BoxRecord) -> Self {
        Self::new(r.x1, r.y1, r.x2, r.y2, r.confidence, r.class_id)
    }
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32, class_id: u32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
            confidence,
            class_id,
        }
    }

    /// Rebuild a box from Kalman XYAH state (center x, center y, aspect ratio, height).
    pub fn from_xyah(
        cx: f64,
        cy: f64,
        aspect_ratio: f64,
        height: f64,
        confidence: f32,
        class_id: u32,
    ) -> Self {
        let width = aspect_ratio * height;
        let x1 = (cx - width / 2.0).round() as i32;
        let y1 = (cy - height / 2.0).round() as i32;
        let x2 = (cx + width / 2.0).round() as i32;
        let y2 = (cy + height / 2.0).round() as i32;
        Self::new(x1, y1, x2, y2, confidence, class_id)
    }

    /// Integer midpoint, truncated toward zero.
    #[inline]
    pub fn center(&self) -> (i32, i32) {
        (midpoint(self.x1, self.x2), midpoint(self.y1, self.y2))
    }

    /// Horizontal extent, saturating at `i32::MAX`.
    #[inline]
    pub fn width(&self) -> i32 {
        extent(self.x1, self.x2)
    }

    /// Vertical extent, saturating at `i32::MAX`.
    #[inline]
    pub fn height(&self) -> i32 {
        extent(self.y1, self.y2)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() as f64 * self.height() as f64
    }

    /// Convert to XYAH: (center_x, center_y, aspect_ratio, height), with sub-pixel centers.
    pub fn to_xyah(&self) -> [f64; 4] {
        let w = self.width() as f64;
        let h = self.height() as f64;
        let cx = self.x1 as f64 + w / 2.0;
        let cy = self.y1 as f64 + h / 2.0;
        let aspect_ratio = if h > 0.0 { w / h } else { 0.0 };
        [cx, cy, aspect_ratio, h]
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter_w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0) as f64;
        let inter_h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0) as f64;
        let inter_area = inter_w * inter_h;
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}

/// Builder for [`BoundingBox`] from the float layouts detectors usually emit.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxBuilder {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
    class_id: u32,
}

impl BoundingBoxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corners as (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Center and size, the YOLO output layout.
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Top-left corner and size.
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn class_id(mut self, class_id: u32) -> Self {
        self.class_id = class_id;
        self
    }

    /// Round to the pixel grid and build.
    pub fn build(self) -> BoundingBox {
        BoundingBox::new(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
            self.confidence,
            self.class_id,
        )
    }
}

fn midpoint(a: i32, b: i32) -> i32 {
    // The mean of two i32 values always fits back into i32.
    ((a as i64 + b as i64) / 2) as i32
}

fn extent(lo: i32, hi: i32) -> i32 {
    (hi as i64 - lo as i64).clamp(0, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_geometry() {
        let b = BoundingBox::new(10, 20, 40, 60, 0.9, 0);
        assert_eq!(b.center(), (25, 40));
        assert_eq!(b.width(), 30);
        assert_eq!(b.height(), 40);
    }

    #[test]
    fn test_center_truncates() {
        let b = BoundingBox::new(0, 0, 5, 3, 0.5, 0);
        assert_eq!(b.center(), (2, 1));
    }

    #[test]
    fn test_extreme_corners_do_not_overflow() {
        let b = BoundingBox::new(-2_000_000_000, -2_000_000_000, 2_000_000_000, i32::MAX, 0.5, 0);
        assert_eq!(b.center(), (0, (i32::MAX as i64 - 2_000_000_000) as i32 / 2));
        assert_eq!(b.width(), i32::MAX);
        assert_eq!(b.height(), i32::MAX);

        let diverged = BoundingBox::from_xyah(1e12, 1e12, 1.0, 1e12, 0.5, 0);
        assert_eq!(diverged.center(), (i32::MAX, i32::MAX));
    }

    #[test]
    fn test_corners_normalized() {
        let b = BoundingBox::new(40, 60, 10, 20, 1.7, 2);
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (10, 20, 40, 60));
        assert_eq!(b.confidence, 1.0);
    }

    #[test]
    fn test_xyah_round_trip() {
        let b = BoundingBox::new(10, 20, 40, 60, 0.9, 3);
        let [cx, cy, a, h] = b.to_xyah();
        assert_eq!(cx, 25.0);
        assert_eq!(cy, 40.0);
        assert!((a - 0.75).abs() < 1e-9);
        assert_eq!(h, 40.0);
        assert_eq!(BoundingBox::from_xyah(cx, cy, a, h, 0.9, 3), b);
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0, 0, 10, 10, 1.0, 0);
        let b = BoundingBox::new(5, 5, 15, 15, 1.0, 0);
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-9);

        let far = BoundingBox::new(20, 20, 30, 30, 1.0, 0);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_builder_xywh() {
        let b = BoundingBoxBuilder::new()
            .xywh(50.0, 50.0, 20.0, 40.0)
            .confidence(0.95)
            .class_id(0)
            .build();
        assert_eq!((b.x1, b.y1, b.x2, b.y2), (40, 30, 60, 70));
        assert_eq!(b.confidence, 0.95);
    }

    #[test]
    fn test_deserialize_defaults() {
        let b: BoundingBox =
            serde_json::from_str(r#"{"x1": 8, "y1": 2, "x2": 4, "y2": 6}"#).unwrap();
        assert_eq!((b.x1, b.x2), (4, 8));
        assert_eq!(b.confidence, 1.0);
        assert_eq!(b.class_id, 0);
    }
}
