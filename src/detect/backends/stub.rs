use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Stub backend for tests and the demo bin.
///
/// Plays back a scripted sequence of detection lists, one list per `detect`
/// call. Once the script is exhausted every frame comes back empty.
pub struct StubBackend {
    script: VecDeque<Vec<Detection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    /// Queue the detections to report for the next frame.
    pub fn push_frame(&mut self, detections: Vec<Detection>) {
        self.script.push_back(detections);
    }

    pub fn with_script(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            script: frames.into(),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_plays_back_script_then_empties() -> Result<()> {
        let mut backend = StubBackend::with_script(vec![
            vec![Detection::person(10.0, 10.0, 50.0, 120.0, 0.9)],
            vec![],
        ]);

        let first = backend.detect(&[], 640, 480)?;
        assert_eq!(first.len(), 1);
        assert!(first[0].is_person());

        assert!(backend.detect(&[], 640, 480)?.is_empty());
        assert!(backend.detect(&[], 640, 480)?.is_empty());
        Ok(())
    }
}
