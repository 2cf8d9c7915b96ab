//! Tracing setup and JSON line-delimited run logs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

#[derive(Debug, Serialize)]
pub struct EpochLogEntry {
    pub epoch: usize,
    pub train_loss: f32,
    pub test_loss: f32,
    pub train_batches: usize,
    pub test_batches: usize,
    pub elapsed_ms: u128,
    pub timestamp_ms: u128,
}

impl EpochLogEntry {
    pub fn new(
        epoch: usize,
        train_loss: f32,
        test_loss: f32,
        train_batches: usize,
        test_batches: usize,
        elapsed_ms: u128,
    ) -> Self {
        Self {
            epoch,
            train_loss,
            test_loss,
            train_batches,
            test_batches,
            elapsed_ms,
            timestamp_ms: timestamp_ms(),
        }
    }
}

/// Appends one epoch record to a JSON-lines file.
pub fn log_epoch<P: AsRef<Path>>(path: P, entry: &EpochLogEntry) -> io::Result<()> {
    append_json_line(path, entry)
}

#[derive(Debug, Serialize)]
pub struct PaletteLogEntry {
    pub images: usize,
    pub colors: usize,
    pub channels: usize,
    pub timestamp_ms: u128,
}

/// Appends a palette extraction summary to a JSON-lines file.
pub fn log_palette<P: AsRef<Path>>(path: P, images: usize, palette: &crate::Palette) -> io::Result<()> {
    let entry = PaletteLogEntry {
        images,
        colors: palette.len(),
        channels: palette.channels(),
        timestamp_ms: timestamp_ms(),
    };
    append_json_line(path, &entry)
}
