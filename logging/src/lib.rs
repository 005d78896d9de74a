#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Append-only JSON-lines run log.
//!
//! Each pipeline run can leave an auditable trail of stage events with
//! their counters, one JSON object per line.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One event in a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Pipeline phase emitting the event, e.g. "load" or "cascade.genus".
    pub phase: String,
    /// Human-readable description.
    pub message: String,
    /// Counters and other structured fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub counters: serde_json::Map<String, serde_json::Value>,
}

impl RunEvent {
    /// Creates an event for the given phase.
    #[must_use]
    pub fn phase(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            phase: phase.into(),
            message: message.into(),
            counters: serde_json::Map::new(),
        }
    }

    /// Attaches a counter field.
    #[must_use]
    pub fn with_counter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.counters.insert(key.into(), value.into());
        self
    }
}

/// Thread-safe JSON-lines writer with append-only semantics.
#[derive(Debug)]
pub struct JsonRunLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonRunLog {
    /// Creates or opens the log at the given path, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Appends one event as a JSON line.
    pub fn record(&self, event: &RunEvent) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, event)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
