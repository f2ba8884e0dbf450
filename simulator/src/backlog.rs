//! File-backed record of measurements that have not been confirmed delivered.
//!
//! The file holds at most one batch. Every save replaces the whole file via a
//! temp-file-then-rename so a crash mid-write never leaves a truncated backlog.

use crate::errors::{Error, Result};
use crate::model::{Batch, Measurement};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BacklogStore {
    path: PathBuf,
}

impl BacklogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and remove the persisted batch.
    ///
    /// A missing file is an empty batch. An unparseable file is moved aside to
    /// `<path>.corrupt` and reported as `CorruptBacklog`.
    pub fn load(&self) -> Result<Batch> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };

        let batch = match parse_batches(&raw) {
            Ok(batch) => batch,
            Err(source) => {
                self.quarantine();
                return Err(Error::CorruptBacklog {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if let Err(e) = fs::remove_file(&self.path) {
            // Still hand the batch over; the next save or clear replaces the file.
            warn!(
                "Failed to remove backlog {} after loading: {}",
                self.path.display(),
                e
            );
        }
        info!(
            "Loaded {} backlogged measurements from {}",
            batch.len(),
            self.path.display()
        );
        Ok(batch)
    }

    /// Replace the backlog with `batch`.
    pub fn save(&self, batch: &[Measurement]) -> Result<()> {
        let mut encoded = serde_json::to_vec(batch)?;
        encoded.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::persistence(parent, e))?;
        }

        let tmp_path = self.temp_path();
        let write_result = (|| -> io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)?;

            if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Ok(parent_dir) = fs::File::open(dir) {
                    let _ = parent_dir.sync_all();
                }
            }
            Ok(())
        })();

        if let Err(e) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::persistence(&self.path, e));
        }

        debug!(
            "Saved {} measurements to backlog {}",
            batch.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the backlog. Absent is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared backlog {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(&self.path, e)),
        }
    }

    pub fn corrupt_path(&self) -> PathBuf {
        sibling(&self.path, "corrupt")
    }

    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, "tmp")
    }

    fn quarantine(&self) {
        let target = self.corrupt_path();
        if let Err(e) = fs::rename(&self.path, &target) {
            warn!(
                "Failed to move corrupt backlog {} aside: {}",
                self.path.display(),
                e
            );
            let _ = fs::remove_file(&self.path);
        } else {
            warn!("Corrupt backlog moved to {}", target.display());
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Older builds wrote one JSON array per line; concatenate them in file order.
fn parse_batches(raw: &[u8]) -> std::result::Result<Batch, serde_json::Error> {
    let mut batch = Vec::new();
    for chunk in serde_json::Deserializer::from_slice(raw).into_iter::<Batch>() {
        batch.extend(chunk?);
    }
    Ok(batch)
}
