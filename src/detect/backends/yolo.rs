#![cfg(feature = "backend-yolo")]

//! YOLOv8 backend on tract-onnx.
//!
//! Loads a local ONNX export of a pretrained YOLOv8 detector and runs it on RGB
//! frames. The model is loaded once and reused for the lifetime of the process.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

type Model = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const DEFAULT_CONF_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

pub struct YoloBackend {
    model: Model,
    input_size: u32,
    conf_threshold: f32,
    iou_threshold: f32,
}

impl YoloBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    ///
    /// Failure here is fatal at startup: there is no fallback model.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_size as usize, input_size as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Override the default NMS IoU threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let img = RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match dimensions"))?;
        let resized = if width == self.input_size && height == self.input_size {
            img
        } else {
            image::imageops::resize(&img, self.input_size, self.input_size, FilterType::Triangle)
        };

        let size = self.input_size as usize;
        let input =
            tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
                resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
            });

        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        // YOLOv8 head: [1, 4 + classes, anchors], boxes as cx/cy/w/h in
        // model-input coordinates.
        let shape = view.shape();
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let classes = shape[1] - 4;
        let anchors = shape[2];

        let scale_x = width as f32 / self.input_size as f32;
        let scale_y = height as f32 / self.input_size as f32;

        let mut candidates = Vec::new();
        for a in 0..anchors {
            let mut class_id = 0usize;
            let mut score = 0f32;
            for c in 0..classes {
                let s = view[[0, 4 + c, a]];
                if s > score {
                    score = s;
                    class_id = c;
                }
            }
            if score < self.conf_threshold {
                continue;
            }

            let cx = view[[0, 0, a]];
            let cy = view[[0, 1, a]];
            let w = view[[0, 2, a]];
            let h = view[[0, 3, a]];

            let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, width as f32);
            let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, height as f32);
            let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, width as f32);
            let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, height as f32);

            candidates.push(Detection::new(x1, y1, x2, y2, score, class_id));
        }

        Ok(non_max_suppression(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for YoloBackend {
    fn name(&self) -> &'static str {
        "yolo"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, width, height)
    }
}

/// Greedy per-class non-maximum suppression, highest confidence first.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && k.iou(&det) >= iou_threshold);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_highest_confidence_of_overlapping_pair() {
        let a = Detection::person(10.0, 10.0, 50.0, 120.0, 0.9);
        let b = Detection::person(12.0, 12.0, 52.0, 122.0, 0.6);
        let kept = non_max_suppression(vec![b, a.clone()], 0.45);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn nms_keeps_boxes_of_different_classes() {
        let person = Detection::person(10.0, 10.0, 50.0, 120.0, 0.9);
        let dog = Detection::new(10.0, 10.0, 50.0, 120.0, 0.8, 16);
        let kept = non_max_suppression(vec![person, dog], 0.45);
        assert_eq!(kept.len(), 2);
    }
}
