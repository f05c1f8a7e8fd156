//! Bounded transfer queue between producers and the drain task.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::with_timeout;

use super::{Chunk, PipelineError, Timeout};

/// Fixed-capacity FIFO of [`Chunk`]s.
///
/// Any number of producers may push, from task context with
/// [`enqueue`](Self::enqueue) or from interrupt context with
/// [`enqueue_from_isr`](Self::enqueue_from_isr). Exactly one
/// [`QueueConsumer`] exists at a time.
///
/// When the queue is full new data is dropped rather than queued. Every
/// dropped chunk is counted in [`dropped`](Self::dropped).
pub struct TransferQueue<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, Chunk, N>,
    dropped: AtomicU32,
    consumer_taken: AtomicBool,
}

impl<const N: usize> TransferQueue<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
            consumer_taken: AtomicBool::new(false),
        }
    }

    /// Push a chunk from task context, waiting up to `timeout` for space.
    ///
    /// On failure the chunk is dropped here and `QueueFull` is returned.
    pub async fn enqueue(&self, chunk: Chunk, timeout: Timeout) -> Result<(), PipelineError> {
        let sent = match timeout {
            Timeout::NoWait => self.channel.try_send(chunk).is_ok(),
            Timeout::After(duration) => with_timeout(duration, self.channel.send(chunk))
                .await
                .is_ok(),
            Timeout::Forever => {
                self.channel.send(chunk).await;
                true
            }
        };

        if sent {
            Ok(())
        } else {
            self.record_drop();
            Err(PipelineError::QueueFull)
        }
    }

    /// Push a chunk without ever blocking. Safe to call from an interrupt handler.
    ///
    /// The consumer's waker is only signalled here; the executor runs the
    /// drain task after the handler returns.
    pub fn enqueue_from_isr(&self, chunk: Chunk) -> Result<(), PipelineError> {
        match self.channel.try_send(chunk) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.record_drop();
                Err(PipelineError::QueueFull)
            }
        }
    }

    /// Claim the consumer side of the queue.
    ///
    /// Returns `None` while another consumer handle is alive.
    pub fn take_consumer(&self) -> Option<QueueConsumer<'_, N>> {
        if self.consumer_taken.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(QueueConsumer { queue: self })
        }
    }

    /// Number of chunks currently queued
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Total chunks dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl<const N: usize> Default for TransferQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The single consumer handle of a [`TransferQueue`].
pub struct QueueConsumer<'a, const N: usize> {
    queue: &'a TransferQueue<N>,
}

impl<'a, const N: usize> QueueConsumer<'a, N> {
    /// Pop the oldest chunk, waiting up to `timeout` for one to arrive.
    pub async fn dequeue(&mut self, timeout: Timeout) -> Result<Chunk, PipelineError> {
        let channel = &self.queue.channel;
        match timeout {
            Timeout::NoWait => channel.try_receive().map_err(|_| PipelineError::QueueEmpty),
            Timeout::After(duration) => with_timeout(duration, channel.receive())
                .await
                .map_err(|_| PipelineError::QueueEmpty),
            Timeout::Forever => Ok(channel.receive().await),
        }
    }
}

impl<const N: usize> Drop for QueueConsumer<'_, N> {
    fn drop(&mut self) {
        self.queue.consumer_taken.store(false, Ordering::Release);
    }
}
