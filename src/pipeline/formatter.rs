//! Tagged message rendering behind a single lock.
//!
//! Log producers share one render scratch buffer. The [`Formatter`] lock
//! guards it for the whole render, split and enqueue sequence, so the chunks
//! of one message always reach the queue contiguously with respect to other
//! log calls.

use core::fmt::{self, Write};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::with_timeout;
use heapless::Vec;

use super::Timeout;
use crate::config::pipeline::{CHUNK_CAPACITY, RENDER_BUFFER_SIZE};

/// Fixed-size scratch buffer that silently truncates what does not fit.
pub struct RenderBuffer {
    bytes: Vec<u8, RENDER_BUFFER_SIZE>,
}

impl RenderBuffer {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Render `"[tag] message\n"` and return the rendered bytes.
    ///
    /// Output longer than [`RENDER_BUFFER_SIZE`] is cut at the buffer end,
    /// in which case the trailing newline is lost as well.
    pub fn render(&mut self, tag: &str, args: fmt::Arguments<'_>) -> &[u8] {
        self.bytes.clear();
        let _ = write!(self, "[{}] ", tag);
        let _ = self.write_fmt(args);
        let _ = self.write_str("\n");
        &self.bytes
    }

    /// Split the last render into queue-sized pieces, in order.
    pub fn pieces(&self) -> core::slice::Chunks<'_, u8> {
        self.bytes.chunks(CHUNK_CAPACITY)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for RenderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for RenderBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.bytes.capacity() - self.bytes.len();
        let take = s.len().min(room);
        // Cannot overflow after clamping to the remaining room
        let _ = self.bytes.extend_from_slice(&s.as_bytes()[..take]);
        Ok(())
    }
}

/// Owner of the shared render scratch.
pub struct Formatter {
    scratch: Mutex<CriticalSectionRawMutex, RenderBuffer>,
}

pub type ScratchGuard<'a> = MutexGuard<'a, CriticalSectionRawMutex, RenderBuffer>;

impl Formatter {
    pub const fn new() -> Self {
        Self {
            scratch: Mutex::new(RenderBuffer::new()),
        }
    }

    /// Acquire the scratch buffer, giving up after `timeout`.
    pub async fn lock(&self, timeout: Timeout) -> Option<ScratchGuard<'_>> {
        match timeout {
            Timeout::NoWait => self.try_lock(),
            Timeout::After(duration) => with_timeout(duration, self.scratch.lock()).await.ok(),
            Timeout::Forever => Some(self.scratch.lock().await),
        }
    }

    /// Acquire the scratch buffer only if it is free right now.
    pub fn try_lock(&self) -> Option<ScratchGuard<'_>> {
        self.scratch.try_lock().ok()
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a tagged, formatted message through a [`LogPipeline`](crate::pipeline::LogPipeline).
///
/// Usage: `cdc_log!(pipeline, "BG", "Hello World {}", "dewe").await;`
///
/// Evaluates to a future resolving to the number of bytes rendered (0 when
/// the formatter lock timed out). The formatted arguments live inside the
/// future, so it can be stored or joined before it is awaited.
#[macro_export]
macro_rules! cdc_log {
    ($pipeline:expr, $tag:expr, $($arg:tt)*) => {
        async { $pipeline.log($tag, format_args!($($arg)*)).await }
    };
}
