//! Snapshot persistence.
//!
//! Saved detections are plain JPEG files named
//! `person_detected_<YYYYMMDD_HHMMSS>.jpg` in a single directory. There is no
//! database and no index file: the directory listing is the source of truth
//! for the sidebar and the gallery. Files are immutable once written and never
//! deleted automatically. Two saves within the same wall-clock second overwrite
//! one another; that is an accepted limitation of the naming scheme.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use image::{ImageFormat, RgbImage};
use regex::Regex;

/// Sidebar shows this many of the most recent snapshots.
pub const SIDEBAR_LIMIT: usize = 5;

/// The gallery lays snapshots out in this many columns.
pub const GALLERY_COLUMNS: usize = 3;

fn snapshot_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^person_detected_\d{8}_\d{6}\.jpg$").expect("snapshot pattern is valid")
    })
}

/// True when `name` is a well-formed snapshot filename.
pub fn is_snapshot_name(name: &str) -> bool {
    snapshot_pattern().is_match(name)
}

/// Gallery column of the snapshot at `index` (0-indexed, sorted descending).
pub fn gallery_column(index: usize) -> usize {
    index % GALLERY_COLUMNS
}

/// Directory-backed store for saved detection images.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open the store, creating the directory if absent. Creation failure is
    /// fatal for the caller.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create snapshot directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an annotated frame. Returns the filename, whose timestamp
    /// component is the wall-clock second at save time.
    pub fn save(&self, image: &RgbImage) -> Result<String> {
        let name = format!(
            "person_detected_{}.jpg",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(&name);
        image
            .save_with_format(&path, ImageFormat::Jpeg)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        Ok(name)
    }

    /// All snapshot filenames, most recent first (filenames embed timestamps,
    /// so descending lexicographic order is newest-first). Files that do not
    /// match the snapshot pattern are ignored.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("list snapshot directory {}", self.dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_snapshot_name(name) {
                names.push(name.to_string());
            }
        }
        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// The `limit` most recent snapshot filenames.
    pub fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let mut names = self.list()?;
        names.truncate(limit);
        Ok(names)
    }

    /// Resolve a snapshot filename to its path. Rejects anything that is not a
    /// well-formed snapshot name, which also rules out path traversal.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if !is_snapshot_name(name) {
            return Err(anyhow!("not a snapshot filename: {}", name));
        }
        Ok(self.dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_names_are_validated() {
        assert!(is_snapshot_name("person_detected_20260824_153000.jpg"));
        assert!(!is_snapshot_name("person_detected_2026_1530.jpg"));
        assert!(!is_snapshot_name("notes.txt"));
        assert!(!is_snapshot_name("../person_detected_20260824_153000.jpg"));
    }

    #[test]
    fn path_for_rejects_traversal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SnapshotStore::open(dir.path())?;
        assert!(store.path_for("../../etc/passwd").is_err());
        assert!(store.path_for("person_detected_20260824_153000.jpg").is_ok());
        Ok(())
    }

    #[test]
    fn gallery_columns_cycle_mod_three() {
        assert_eq!(gallery_column(0), 0);
        assert_eq!(gallery_column(1), 1);
        assert_eq!(gallery_column(2), 2);
        assert_eq!(gallery_column(3), 0);
        assert_eq!(gallery_column(7), 1);
    }
}
