pub mod stub;

#[cfg(feature = "backend-yolo")]
pub mod yolo;

pub use stub::StubBackend;

#[cfg(feature = "backend-yolo")]
pub use yolo::YoloBackend;
