//! watchcam - webcam person monitor.
//!
//! Runs a pretrained object detector over a live webcam stream, draws boxes
//! around detected persons, saves annotated snapshots of positive detections,
//! and serves a browser dashboard (live view, recent-detections sidebar, saved
//! gallery).
//!
//! The pipeline is deliberately linear and single-threaded: the dashboard
//! drives the detection loop on a polling basis, the loop drives the model
//! adapter synchronously, and persistence is a side effect of the loop. The
//! snapshot directory is the only persisted state.

pub mod annotate;
pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod session;
pub mod storage;
pub mod web;

pub use capture::{CameraConfig, CameraSource};
pub use config::WatchcamConfig;
pub use detect::{Detection, DetectorBackend, StubBackend, PERSON_CLASS_ID};
pub use frame::Frame;
pub use session::{DetectionSession, PollOutcome, SessionState, GRAB_FAILURE_NOTICE};
pub use storage::{
    gallery_column, is_snapshot_name, SnapshotStore, GALLERY_COLUMNS, SIDEBAR_LIMIT,
};

#[cfg(feature = "backend-yolo")]
pub use detect::YoloBackend;
