//! V4L2 device backend.
//!
//! Opens a local device node (e.g. /dev/video0), captures frames through a
//! memory-mapped buffer stream, and normalizes the device's pixel order to RGB.
//! The device is held only while a session is Running.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

pub(crate) struct DeviceCamera {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
    active_fourcc: [u8; 4],
}

#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCamera {
    pub(crate) fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            active_fourcc: *b"BGR3",
            config,
            state: None,
            frame_count: 0,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        // Webcams commonly deliver BGR; we convert to RGB after capture.
        format.fourcc = v4l::FourCC::new(b"BGR3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        match &format.fourcc.repr {
            b"BGR3" | b"RGB3" => {}
            other => {
                return Err(anyhow!(
                    "unsupported v4l2 pixel format {:?} on {}",
                    String::from_utf8_lossy(other),
                    self.config.device
                ));
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.active_fourcc = format.fourcc.repr;

        let state = DeviceCameraStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub(crate) fn release(&mut self) {
        // Dropping the state closes the stream and the device node.
        self.state = None;
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .context("capture v4l2 frame")?;

        self.frame_count += 1;

        match &self.active_fourcc {
            b"BGR3" => Frame::from_bgr(buf, self.active_width, self.active_height),
            _ => Frame::new(buf.to_vec(), self.active_width, self.active_height),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}
