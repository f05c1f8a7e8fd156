//! Mass-storage volume demo
//!
//! The flash-backed volume the device exposes over USB MSC is an external
//! collaborator; this module only defines the handful of file operations the
//! firmware performs on it and reports every outcome through the log
//! pipeline.
//!
//! The firmware mounts no volume, so `main.rs` never calls
//! [`file_operations`]. It runs on the host against the in-memory
//! `MockVolume`, and a flash driver only has to implement [`Volume`].

use crate::cdc_log;
use crate::config::storage::{DIRECTORY, FILE_PATH, GREETING, MAX_LINE_LEN};
use crate::pipeline::LogPipeline;

/// Tag for storage messages
const TAG: &str = "storage";

/// Errors reported by a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Path does not exist
    NotFound,
    /// Path already exists
    AlreadyExists,
    /// Volume is full
    NoSpace,
    /// Any other I/O failure
    Io,
}

/// File operations on a mounted volume
pub trait Volume {
    /// Check whether a file or directory exists
    fn exists(&mut self, path: &str) -> bool;

    /// Create a directory
    fn create_dir(&mut self, path: &str) -> Result<(), StorageError>;

    /// Create or replace a file with `contents`
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    /// Read the start of a file into `buf`, returning the byte count
    fn read_prefix(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, StorageError>;
}

/// Make sure the demo file exists, then read its first line back.
///
/// A failed directory creation is logged and the sequence continues; the
/// write or read failing ends it early with the error.
pub async fn file_operations<V: Volume, const N: usize>(
    pipeline: &LogPipeline<N>,
    volume: &mut V,
) -> Result<(), StorageError> {
    if !volume.exists(DIRECTORY) {
        if let Err(e) = volume.create_dir(DIRECTORY) {
            cdc_log!(pipeline, TAG, "mkdir failed with error: {:?}", e).await;
        }
    }

    if !volume.exists(FILE_PATH) {
        cdc_log!(pipeline, TAG, "Creating file").await;
        if let Err(e) = volume.write_file(FILE_PATH, GREETING.as_bytes()) {
            cdc_log!(pipeline, TAG, "Failed to open file for writing").await;
            return Err(e);
        }
    }

    cdc_log!(pipeline, TAG, "Reading file").await;
    let mut buf = [0u8; MAX_LINE_LEN];
    let count = match volume.read_prefix(FILE_PATH, &mut buf) {
        Ok(count) => count,
        Err(e) => {
            cdc_log!(pipeline, TAG, "Failed to open file for reading").await;
            return Err(e);
        }
    };

    let line = first_line(&buf[..count]);
    cdc_log!(pipeline, TAG, "Read from file: '{}'", line).await;
    Ok(())
}

/// Text up to the first newline, cut back to valid UTF-8
fn first_line(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let line = &bytes[..end];
    match core::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&line[..e.valid_up_to()]).unwrap_or_default(),
    }
}
