//! In-memory frame representation.
//!
//! A `Frame` is an ephemeral RGB8 raster owned by the detection session for the
//! duration of one iteration. Frames are never persisted in raw form; only the
//! annotated JPEG snapshot leaves memory.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// One captured frame, RGB8, row-major, 3 bytes per pixel.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap an RGB8 buffer. The buffer length must be exactly `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Build a frame from raw BGR8 camera output, converting to RGB.
    ///
    /// The capture device delivers BGR byte order; everything downstream
    /// (inference, annotation, display) works in RGB.
    pub fn from_bgr(bgr: &[u8], width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if bgr.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                bgr.len()
            ));
        }
        let mut data = vec![0u8; expected];
        for (rgb, bgr) in data.chunks_exact_mut(3).zip(bgr.chunks_exact(3)) {
            rgb[0] = bgr[2];
            rgb[1] = bgr[1];
            rgb[2] = bgr[0];
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Copy into an `image::RgbImage` for drawing and encoding.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_buffer_length() {
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
        assert!(Frame::new(vec![0u8; 11], 2, 2).is_err());
    }

    #[test]
    fn from_bgr_swaps_channels() -> Result<()> {
        let bgr = vec![10, 20, 30];
        let frame = Frame::from_bgr(&bgr, 1, 1)?;
        assert_eq!(frame.pixels(), &[30, 20, 10]);
        Ok(())
    }

    #[test]
    fn to_image_round_trips_pixels() -> Result<()> {
        let frame = Frame::new(vec![7u8; 2 * 3 * 3], 2, 3)?;
        let img = frame.to_image();
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.as_raw().as_slice(), frame.pixels());
        Ok(())
    }
}
