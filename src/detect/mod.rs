mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
pub use result::{Detection, PERSON_CLASS_ID};

#[cfg(feature = "backend-yolo")]
pub use backends::YoloBackend;
