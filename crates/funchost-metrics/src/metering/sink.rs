//! Snapshot sinks
//!
//! The file sink is a flat directory of immutable artifacts polled by the
//! scaling/billing consumer. Artifacts are never modified after creation and are
//! never deleted here.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use funchost_common::Result;
use tracing::debug;
use uuid::Uuid;

/// Durable destination for serialized snapshots
pub trait SnapshotSink: Send + Sync {
    /// Persist one artifact and return its identifier
    fn write(&self, content: &[u8]) -> Result<String>;
}

/// Writes each snapshot to a new uniquely named `.json` file
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lowercase random token, independent of wall-clock time
    fn artifact_name() -> String {
        format!("{}.json", Uuid::new_v4().hyphenated())
    }
}

impl SnapshotSink for FileSink {
    fn write(&self, content: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.directory)?;

        let name = Self::artifact_name();
        let path = self.directory.join(&name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(content)?;
        file.sync_all()?;

        debug!(artifact = %name, bytes = content.len(), "Wrote metrics artifact");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("metrics");
        let sink = FileSink::new(&dir);

        let name = sink.write(b"{}").unwrap();

        assert!(name.ends_with(".json"));
        assert_eq!(name, name.to_lowercase());
        assert_eq!(fs::read(dir.join(&name)).unwrap(), b"{}");
    }

    #[test]
    fn test_names_do_not_collide() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = FileSink::new(tmp.path());

        let names: HashSet<String> = (0..1000).map(|_| sink.write(b"{}").unwrap()).collect();

        assert_eq!(names.len(), 1000);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1000);
    }

    #[test]
    fn test_write_into_file_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let sink = FileSink::new(&blocker);
        assert!(sink.write(b"{}").is_err());
    }
}
