use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend wraps one pretrained object-detection model, loaded once per
/// process lifetime and reused across all frames. If loading fails the process
/// fails fast at startup; there is no fallback model and no retry.
///
/// Implementations must treat the pixel slice as read-only RGB8 and ephemeral.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one RGB frame. Returns every detection the model
    /// produced; filtering to the person class happens in the session.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
