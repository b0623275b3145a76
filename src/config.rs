use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8807";
const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_SNAPSHOT_DIR: &str = "detected_persons";
const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_CONF_THRESHOLD: f32 = 0.25;

#[derive(Debug, Deserialize, Default)]
struct WatchcamConfigFile {
    listen_addr: Option<String>,
    snapshot_dir: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    input_size: Option<u32>,
    conf_threshold: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct WatchcamConfig {
    pub listen_addr: String,
    pub snapshot_dir: PathBuf,
    pub camera: CameraSettings,
    pub model: ModelSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub input_size: u32,
    pub conf_threshold: f32,
}

impl WatchcamConfig {
    /// Load configuration. With no config file and no environment set, every
    /// value is the hardcoded default matching the original application.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WATCHCAM_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchcamConfigFile) -> Self {
        let listen_addr = file
            .listen_addr
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let snapshot_dir = file
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR));
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|model| model.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_size: file
                .model
                .as_ref()
                .and_then(|model| model.input_size)
                .unwrap_or(DEFAULT_MODEL_INPUT),
            conf_threshold: file
                .model
                .and_then(|model| model.conf_threshold)
                .unwrap_or(DEFAULT_CONF_THRESHOLD),
        };
        Self {
            listen_addr,
            snapshot_dir,
            camera,
            model,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("WATCHCAM_LISTEN_ADDR") {
            if !addr.trim().is_empty() {
                self.listen_addr = addr;
            }
        }
        if let Ok(device) = std::env::var("WATCHCAM_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(dir) = std::env::var("WATCHCAM_SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                self.snapshot_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("WATCHCAM_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = PathBuf::from(path);
            }
        }
        if let Ok(threshold) = std::env::var("WATCHCAM_CONF_THRESHOLD") {
            let threshold: f32 = threshold
                .parse()
                .map_err(|_| anyhow!("WATCHCAM_CONF_THRESHOLD must be a number in (0, 1]"))?;
            self.model.conf_threshold = threshold;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.model.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if !(self.model.conf_threshold > 0.0 && self.model.conf_threshold <= 1.0) {
            return Err(anyhow!("confidence threshold must be in (0, 1]"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WatchcamConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
