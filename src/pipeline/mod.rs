//! Log/transport pipeline
//!
//! Producers (formatted log calls, the CDC RX path) push [`Chunk`]s into a
//! bounded [`TransferQueue`]. A single [`Drainer`] pops them and writes them
//! to the USB serial transport. Producers never touch the transport.

pub mod chunk;
pub mod drain;
pub mod formatter;
pub mod queue;
pub mod rx;

pub use chunk::Chunk;
pub use drain::Drainer;
pub use formatter::{Formatter, RenderBuffer};
pub use queue::{QueueConsumer, TransferQueue};

use core::fmt;

use embassy_time::Duration;

use crate::config::pipeline::{ENQUEUE_TIMEOUT_MS, LOCK_TIMEOUT_MS};

/// Errors surfaced by pipeline operations
///
/// None of these are fatal; each one means a chunk or a whole message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// No queue slot became free in time
    QueueFull,
    /// Nothing arrived in the queue in time
    QueueEmpty,
    /// The formatter lock could not be acquired in time
    LockTimeout,
    /// Data does not fit in a single chunk
    TooLarge,
    /// Chunk storage could not be allocated
    OutOfMemory,
    /// The transport rejected a write, flush or read
    Transport,
}

/// How long a blocking pipeline primitive may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Fail immediately instead of waiting
    NoWait,
    /// Wait at most this long
    After(Duration),
    /// Wait until the operation can complete
    Forever,
}

impl Timeout {
    pub const fn from_millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }
}

/// Timeouts applied by task-context producers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Wait for the formatter lock
    pub lock_timeout: Timeout,
    /// Wait for a free queue slot, per chunk
    pub enqueue_timeout: Timeout,
}

impl PipelineSettings {
    pub const DEFAULT: Self = Self {
        lock_timeout: Timeout::from_millis(LOCK_TIMEOUT_MS),
        enqueue_timeout: Timeout::from_millis(ENQUEUE_TIMEOUT_MS),
    };
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Process-scoped pipeline context.
///
/// Built once at start-up and shared by reference with every producer and
/// with the drain task.
pub struct LogPipeline<const N: usize> {
    queue: TransferQueue<N>,
    formatter: Formatter,
    settings: PipelineSettings,
}

impl<const N: usize> LogPipeline<N> {
    pub const fn new(settings: PipelineSettings) -> Self {
        Self {
            queue: TransferQueue::new(),
            formatter: Formatter::new(),
            settings,
        }
    }

    pub fn queue(&self) -> &TransferQueue<N> {
        &self.queue
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Render `"[tag] message\n"` and queue it in chunk-sized pieces.
    ///
    /// Returns the number of bytes rendered, or 0 if the formatter lock could
    /// not be taken within the configured timeout. Pieces that do not fit in
    /// the queue are dropped individually; later pieces are still attempted.
    pub async fn log(&self, tag: &str, args: fmt::Arguments<'_>) -> usize {
        let Some(mut scratch) = self.formatter.lock(self.settings.lock_timeout).await else {
            return 0;
        };

        let len = scratch.render(tag, args).len();
        for piece in scratch.pieces() {
            match Chunk::copy_from(piece) {
                Ok(chunk) => {
                    let _ = self.queue.enqueue(chunk, self.settings.enqueue_timeout).await;
                }
                Err(_) => self.queue.record_drop(),
            }
        }

        len
    }

    /// Non-blocking [`log`](Self::log) for interrupt context and synchronous callers.
    ///
    /// Gives up at once if another caller holds the formatter, and pushes
    /// each piece with [`TransferQueue::enqueue_from_isr`].
    pub fn try_log(&self, tag: &str, args: fmt::Arguments<'_>) -> usize {
        let Some(mut scratch) = self.formatter.try_lock() else {
            return 0;
        };

        let len = scratch.render(tag, args).len();
        for piece in scratch.pieces() {
            match Chunk::copy_from(piece) {
                Ok(chunk) => {
                    let _ = self.queue.enqueue_from_isr(chunk);
                }
                Err(_) => self.queue.record_drop(),
            }
        }

        len
    }
}

impl<const N: usize> Default for LogPipeline<N> {
    fn default() -> Self {
        Self::new(PipelineSettings::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdc_log;
    use crate::config::pipeline::{CHUNK_CAPACITY, RENDER_BUFFER_SIZE};
    use std::string::String;
    use std::vec::Vec;

    const BLOCKING: PipelineSettings = PipelineSettings {
        lock_timeout: Timeout::Forever,
        enqueue_timeout: Timeout::Forever,
    };

    const LOSSY: PipelineSettings = PipelineSettings {
        lock_timeout: Timeout::NoWait,
        enqueue_timeout: Timeout::NoWait,
    };

    fn drain_all<const N: usize>(consumer: &mut QueueConsumer<'_, N>) -> Vec<Chunk> {
        futures::executor::block_on(async {
            let mut chunks = Vec::new();
            while let Ok(chunk) = consumer.dequeue(Timeout::NoWait).await {
                chunks.push(chunk);
            }
            chunks
        })
    }

    #[test]
    fn test_log_single_chunk() {
        let pipeline: LogPipeline<8> = LogPipeline::new(BLOCKING);
        let mut consumer = pipeline.queue().take_consumer().unwrap();

        let len = futures::executor::block_on(cdc_log!(pipeline, "BG", "Hello World {}", "dewe"));

        assert_eq!(len, 22);
        let chunks = drain_all(&mut consumer);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_bytes(), b"[BG] Hello World dewe\n");
    }

    #[test]
    fn test_log_splits_into_chunks() {
        let pipeline: LogPipeline<16> = LogPipeline::new(BLOCKING);
        let mut consumer = pipeline.queue().take_consumer().unwrap();
        let body: String = (0..200).map(|i| (b'a' + (i % 26) as u8) as char).collect();

        let len = futures::executor::block_on(cdc_log!(pipeline, "split", "{}", body));

        let expected = std::format!("[split] {}\n", body);
        assert_eq!(len, expected.len());

        let chunks = drain_all(&mut consumer);
        assert_eq!(chunks.len(), len.div_ceil(CHUNK_CAPACITY));
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_CAPACITY));

        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, expected.as_bytes());
    }

    #[test]
    fn test_log_truncates_to_render_buffer() {
        let pipeline: LogPipeline<64> = LogPipeline::new(BLOCKING);
        let mut consumer = pipeline.queue().take_consumer().unwrap();
        let body = "y".repeat(RENDER_BUFFER_SIZE * 2);

        let len = futures::executor::block_on(cdc_log!(pipeline, "big", "{}", body));

        assert_eq!(len, RENDER_BUFFER_SIZE);
        let total: usize = drain_all(&mut consumer).iter().map(|c| c.len()).sum();
        assert_eq!(total, RENDER_BUFFER_SIZE);
    }

    #[test]
    fn test_log_continues_after_dropped_chunk() {
        // Room for two of the four pieces
        let pipeline: LogPipeline<2> = LogPipeline::new(LOSSY);
        let mut consumer = pipeline.queue().take_consumer().unwrap();
        let body = "z".repeat(CHUNK_CAPACITY * 4 - 8);

        let len = futures::executor::block_on(cdc_log!(pipeline, "drop", "{}", body));

        assert_eq!(len, CHUNK_CAPACITY * 4);
        assert_eq!(pipeline.queue().dropped(), 2);

        let chunks = drain_all(&mut consumer);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with(b"[drop] zz"));
    }

    #[test]
    fn test_log_lock_unavailable_is_noop() {
        let pipeline: LogPipeline<4> = LogPipeline::new(LOSSY);

        let held = pipeline.formatter.try_lock();
        assert!(held.is_some());

        let len = futures::executor::block_on(cdc_log!(pipeline, "busy", "dropped"));
        assert_eq!(len, 0);
        assert_eq!(pipeline.try_log("busy", format_args!("dropped")), 0);
        assert!(pipeline.queue().is_empty());

        drop(held);
        assert!(pipeline.try_log("busy", format_args!("kept")) > 0);
        assert_eq!(pipeline.queue().len(), 1);
    }

    #[test]
    fn test_try_log_full_queue_returns_immediately() {
        let pipeline: LogPipeline<1> = LogPipeline::default();

        assert!(pipeline.try_log("isr", format_args!("first")) > 0);
        assert!(pipeline.try_log("isr", format_args!("second")) > 0);

        assert_eq!(pipeline.queue().len(), 1);
        assert_eq!(pipeline.queue().dropped(), 1);
    }

    #[test]
    fn test_concurrent_logs_do_not_interleave() {
        // Small queue so producers suspend mid-message while holding the lock
        let pipeline: LogPipeline<2> = LogPipeline::new(BLOCKING);
        let mut consumer = pipeline.queue().take_consumer().unwrap();

        let line_a = "A".repeat(150);
        let line_b = "B".repeat(150);
        let line_c = "C".repeat(150);
        let per_message = (line_a.len() + 5).div_ceil(CHUNK_CAPACITY);

        let received = futures::executor::block_on(async {
            let consume = async {
                let mut out = Vec::new();
                for _ in 0..per_message * 3 {
                    out.push(consumer.dequeue(Timeout::Forever).await.unwrap());
                }
                out
            };

            let (_, _, _, out) = futures::join!(
                cdc_log!(pipeline, "a", "{}", line_a),
                cdc_log!(pipeline, "b", "{}", line_b),
                cdc_log!(pipeline, "c", "{}", line_c),
                consume
            );
            out
        });

        let stream: Vec<u8> = received.iter().flat_map(|c| c.iter().copied()).collect();
        let text = String::from_utf8(stream).unwrap();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], std::format!("[a] {}", line_a));
        assert_eq!(lines[1], std::format!("[b] {}", line_b));
        assert_eq!(lines[2], std::format!("[c] {}", line_c));
    }
}
