//! watchcamd - person monitor daemon
//!
//! This daemon:
//! 1. Loads the pretrained detector once (fatal on failure, no fallback)
//! 2. Prepares the snapshot directory (created on first run)
//! 3. Serves the browser dashboard on the loopback interface
//! 4. Lets the dashboard drive the detection loop: start/stop the camera
//!    session and poll the live view, which processes one frame per poll

use anyhow::Result;

use watchcam::config::WatchcamConfig;
use watchcam::web::{DashboardConfig, DashboardServer};
use watchcam::{CameraConfig, CameraSource, DetectionSession, DetectorBackend, SnapshotStore};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = WatchcamConfig::load()?;

    let store = SnapshotStore::open(&cfg.snapshot_dir)?;
    log::info!("snapshot directory: {}", store.dir().display());

    let mut backend = build_backend(&cfg)?;
    backend.warm_up()?;

    let camera = CameraSource::new(CameraConfig {
        device: cfg.camera.device.clone(),
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;

    let session = DetectionSession::new(camera, backend, store);
    let dashboard_cfg = DashboardConfig {
        addr: cfg.listen_addr.clone(),
    };
    let handle = DashboardServer::new(dashboard_cfg, session).spawn()?;
    log::info!("dashboard listening on http://{}", handle.addr);
    log::info!("camera device: {}", cfg.camera.device);

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    rx.recv()?;

    log::info!("shutting down");
    handle.stop()?;
    Ok(())
}

#[cfg(feature = "backend-yolo")]
fn build_backend(cfg: &WatchcamConfig) -> Result<Box<dyn DetectorBackend>> {
    log::info!(
        "loading model {} (input {}x{})",
        cfg.model.path.display(),
        cfg.model.input_size,
        cfg.model.input_size
    );
    let backend = watchcam::YoloBackend::new(&cfg.model.path, cfg.model.input_size)?
        .with_conf_threshold(cfg.model.conf_threshold);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-yolo"))]
fn build_backend(_cfg: &WatchcamConfig) -> Result<Box<dyn DetectorBackend>> {
    log::warn!("built without backend-yolo; using the stub detector (reports nothing)");
    Ok(Box::new(watchcam::StubBackend::new()))
}
