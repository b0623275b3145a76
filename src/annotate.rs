//! Bounding-box and label drawing.
//!
//! Annotation is a pure function of the frame and the detection list: the same
//! inputs always produce the same raster, so re-annotating is idempotent.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::Detection;
use crate::frame::Frame;

pub const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const PERSON_LABEL: &str = "Person";

const BOX_THICKNESS: u32 = 2;
const GLYPH_WIDTH: u32 = 8;
const GLYPH_HEIGHT: u32 = 12;

/// Draw a box and a "Person" label for every person-class detection onto a
/// copy of the frame. Non-person detections are not drawn.
pub fn annotate_persons(frame: &Frame, detections: &[Detection]) -> RgbImage {
    let mut img = frame.to_image();
    for det in detections.iter().filter(|d| d.is_person()) {
        draw_detection(&mut img, det);
    }
    img
}

fn draw_detection(img: &mut RgbImage, det: &Detection) {
    let (width, height) = img.dimensions();
    let x1 = (det.x1.max(0.0) as u32).min(width.saturating_sub(1));
    let y1 = (det.y1.max(0.0) as u32).min(height.saturating_sub(1));
    let x2 = (det.x2.max(0.0) as u32).min(width.saturating_sub(1));
    let y2 = (det.y2.max(0.0) as u32).min(height.saturating_sub(1));
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    // Nested hollow rects give the box its thickness. The rect spans the
    // detection corners inclusively.
    for t in 0..BOX_THICKNESS {
        let w = x2 - x1 + 1;
        let h = y2 - y1 + 1;
        if w <= 2 * t || h <= 2 * t {
            break;
        }
        let rect = Rect::at((x1 + t) as i32, (y1 + t) as i32).of_size(w - 2 * t, h - 2 * t);
        draw_hollow_rect_mut(img, rect, BOX_COLOR);
    }

    // Label above the box, below it when there is no headroom.
    let label_y = if y1 >= GLYPH_HEIGHT + 4 {
        y1 - GLYPH_HEIGHT - 4
    } else {
        y2 + 2
    };
    draw_label(img, PERSON_LABEL, x1, label_y);
}

fn draw_label(img: &mut RgbImage, text: &str, start_x: u32, start_y: u32) {
    let (width, height) = img.dimensions();
    let mut x = start_x;
    for ch in text.chars() {
        let Some(pattern) = glyph(ch) else {
            x += GLYPH_WIDTH;
            continue;
        };
        for (row, bits) in pattern.iter().enumerate() {
            let py = start_y + row as u32;
            if py >= height {
                break;
            }
            for col in 0..GLYPH_WIDTH {
                let px = x + col;
                if px >= width {
                    break;
                }
                if (bits >> (7 - col)) & 1 == 1 {
                    img.put_pixel(px, py, BOX_COLOR);
                }
            }
        }
        x += GLYPH_WIDTH;
        if x >= width {
            break;
        }
    }
}

/// 8x12 bitmap glyphs, one row per byte, MSB leftmost. Only the characters of
/// the "Person" label are needed.
fn glyph(ch: char) -> Option<[u8; 12]> {
    let pattern = match ch {
        'P' => [
            0x00, 0x7C, 0x42, 0x42, 0x42, 0x7C, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00,
        ],
        'e' => [
            0x00, 0x00, 0x00, 0x3C, 0x42, 0x7E, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00,
        ],
        'r' => [
            0x00, 0x00, 0x00, 0x5C, 0x62, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00,
        ],
        's' => [
            0x00, 0x00, 0x00, 0x3E, 0x40, 0x3C, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00,
        ],
        'o' => [
            0x00, 0x00, 0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00,
        ],
        'n' => [
            0x00, 0x00, 0x00, 0x5C, 0x62, 0x42, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00,
        ],
        _ => return None,
    };
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height)
            .expect("valid frame buffer")
    }

    #[test]
    fn annotation_is_idempotent() {
        let frame = black_frame(160, 160);
        let dets = vec![
            Detection::person(10.0, 40.0, 50.0, 120.0, 0.9),
            Detection::person(80.0, 30.0, 140.0, 150.0, 0.7),
        ];

        let first = annotate_persons(&frame, &dets);
        let second = annotate_persons(&frame, &dets);
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn box_lands_on_detection_coordinates() -> Result<()> {
        let frame = black_frame(640, 480);
        let dets = vec![Detection::person(10.0, 40.0, 50.0, 120.0, 0.9)];
        let img = annotate_persons(&frame, &dets);

        // Border pixels are painted, the box interior is untouched.
        assert_eq!(*img.get_pixel(10, 40), BOX_COLOR);
        assert_eq!(*img.get_pixel(50, 40), BOX_COLOR);
        assert_eq!(*img.get_pixel(10, 120), BOX_COLOR);
        assert_eq!(*img.get_pixel(30, 80), Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn non_person_detections_are_not_drawn() {
        let frame = black_frame(64, 64);
        let dets = vec![Detection::new(5.0, 5.0, 40.0, 40.0, 0.95, 16)];
        let img = annotate_persons(&frame, &dets);
        assert_eq!(img.as_raw().as_slice(), frame.pixels());
    }
}
