/// Class index for "person" in the COCO label schema the pretrained model ships
/// with. Fixed by the model, not configurable.
pub const PERSON_CLASS_ID: usize = 0;

/// One finding from the model: a class, a confidence score, and a bounding box
/// in pixel space (top-left, bottom-right).
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    /// A person-class detection. Convenience for tests and the demo bin.
    pub fn person(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self::new(x1, y1, x2, y2, confidence, PERSON_CLASS_ID)
    }

    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_class_is_coco_zero() {
        let det = Detection::person(0.0, 0.0, 10.0, 10.0, 0.9);
        assert_eq!(det.class_id, 0);
        assert!(det.is_person());
        assert!(!Detection::new(0.0, 0.0, 1.0, 1.0, 0.9, 16).is_person());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = Detection::person(10.0, 10.0, 50.0, 120.0, 0.9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Detection::person(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = Detection::person(20.0, 20.0, 30.0, 30.0, 0.9);
        assert_eq!(a.iou(&b), 0.0);
    }
}
