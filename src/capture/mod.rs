//! Camera sources.
//!
//! The monitor reads from the system's default capture device (`/dev/video0`)
//! through V4L2, or from a synthetic `stub://` source in tests and the demo
//! bin. Device frames arrive in raw BGR order and are normalized to RGB before
//! inference and display.
//!
//! A source is acquired when a Running session starts and released when the
//! session ends (on stop or on grab failure). Only one session exists per
//! process, so sources are never shared.

#[cfg(feature = "capture-v4l2")]
mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video0"), or "stub://..." for the synthetic
    /// source. "stub-fail://..." yields a source whose grabs always fail.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// A camera source with a synthetic backend for tests and a V4L2 backend for
/// real devices (feature `capture-v4l2`).
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "capture-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") || config.device.starts_with("stub-fail://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }

        #[cfg(feature = "capture-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(v4l2::DeviceCamera::new(config)?),
            })
        }

        #[cfg(not(feature = "capture-v4l2"))]
        Err(anyhow!(
            "capture device '{}' requires the capture-v4l2 feature",
            config.device
        ))
    }

    /// Acquire the capture device. Called when a session transitions to Running.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    /// Release the capture device. Called when a session ends; the device must
    /// be reacquired with `connect` before the next session.
    pub fn release(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.release(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.release(),
        }
    }

    /// Grab the next frame as RGB.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.connected,
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.is_connected(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and the demo bin
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    connected: bool,
    frame_count: u64,
    always_fails: bool,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        let always_fails = config.device.starts_with("stub-fail://");
        Self {
            config,
            connected: false,
            frame_count: 0,
            always_fails,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn release(&mut self) {
        self.connected = false;
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if !self.connected {
            return Err(anyhow!("camera not connected"));
        }
        if self.always_fails {
            return Err(anyhow!(
                "synthetic source {} is configured to fail",
                self.config.device
            ));
        }

        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Frame::new(pixels, self.config.width, self.config.height)
    }

    /// Generate a simple moving gradient so successive frames differ.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count * 7) % 256) as u8;
        }
        pixels
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(device: &str) -> CameraConfig {
        CameraConfig {
            device: device.to_string(),
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn successive_synthetic_frames_differ() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        source.connect()?;

        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_ne!(a.pixels(), b.pixels());
        Ok(())
    }

    #[test]
    fn released_source_must_be_reacquired() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub://test"))?;
        source.connect()?;
        source.release();

        assert!(!source.is_connected());
        assert!(source.next_frame().is_err());

        source.connect()?;
        assert!(source.next_frame().is_ok());
        Ok(())
    }

    #[test]
    fn fail_source_never_grabs() -> Result<()> {
        let mut source = CameraSource::new(stub_config("stub-fail://test"))?;
        source.connect()?;
        assert!(source.next_frame().is_err());
        Ok(())
    }
}
