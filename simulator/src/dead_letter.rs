use crate::errors::{Error, Result};
use crate::model::{Measurement, RejectedBatch};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Append-only JSON-lines file of batches the service refused.
#[derive(Debug, Clone)]
pub struct DeadLetterSink {
    path: PathBuf,
}

impl DeadLetterSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn record(
        &self,
        status: StatusCode,
        measurements: &[Measurement],
        rejected_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = RejectedBatch {
            rejected_at,
            status: status.as_u16(),
            measurements: measurements.to_vec(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::persistence(parent, e))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(&line))
            .map_err(|e| Error::persistence(&self.path, e))?;

        info!(
            "Dead-lettered {} measurements to {}",
            measurements.len(),
            self.path.display()
        );
        Ok(())
    }
}
