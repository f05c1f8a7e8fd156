//! Owned byte block moved through the transfer queue.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::Deref;

use super::PipelineError;
use crate::config::pipeline::CHUNK_CAPACITY;

/// A heap-allocated slice of at most [`CHUNK_CAPACITY`] bytes.
///
/// Whoever holds a `Chunk` owns its storage. Handing it to the queue moves
/// it, and the storage is released when the last holder drops it, whether
/// that is the drain task after writing or a producer whose enqueue failed.
#[derive(Debug, PartialEq, Eq)]
pub struct Chunk {
    data: Box<[u8]>,
}

impl Chunk {
    /// Copy `bytes` into a freshly allocated chunk.
    ///
    /// Heap exhaustion is reported as [`PipelineError::OutOfMemory`] instead
    /// of aborting, so callers can treat it as one more dropped item.
    pub fn copy_from(bytes: &[u8]) -> Result<Self, PipelineError> {
        if bytes.len() > CHUNK_CAPACITY {
            return Err(PipelineError::TooLarge);
        }

        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|_| PipelineError::OutOfMemory)?;
        data.extend_from_slice(bytes);

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}
