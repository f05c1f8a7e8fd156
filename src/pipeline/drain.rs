//! Single consumer that moves queued chunks onto the transport.

use embassy_time::{Duration, Timer};
use embedded_io_async::Write;

use super::{PipelineError, QueueConsumer, Timeout};

/// Drain side of the pipeline.
///
/// Owns the queue's only [`QueueConsumer`] and the transport's write half,
/// so it is the only code that ever writes to the transport. Each pass
/// waits on the queue, writes the chunk, flushes, then drops the chunk.
/// Failed writes are not retried.
pub struct Drainer<'a, W: Write, const N: usize> {
    consumer: QueueConsumer<'a, N>,
    writer: W,
    transport_failures: u32,
}

impl<'a, W: Write, const N: usize> Drainer<'a, W, N> {
    pub fn new(consumer: QueueConsumer<'a, N>, writer: W) -> Self {
        Self {
            consumer,
            writer,
            transport_failures: 0,
        }
    }

    /// Move one chunk from the queue to the transport.
    ///
    /// Returns the number of bytes written. The chunk is released on every
    /// path, including a failed write.
    pub async fn drain_one(&mut self, timeout: Timeout) -> Result<usize, PipelineError> {
        let chunk = self.consumer.dequeue(timeout).await?;

        match self.write_flush(&chunk).await {
            Ok(()) => Ok(chunk.len()),
            Err(_) => {
                self.transport_failures = self.transport_failures.wrapping_add(1);
                Err(PipelineError::Transport)
            }
        }
    }

    async fn write_flush(&mut self, bytes: &[u8]) -> Result<(), W::Error> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Chunks lost to transport errors so far
    pub fn transport_failures(&self) -> u32 {
        self.transport_failures
    }

    /// Wait `startup_delay`, then drain for the life of the process.
    pub async fn run(mut self, startup_delay: Duration) -> ! {
        Timer::after(startup_delay).await;

        loop {
            if self.drain_one(Timeout::Forever).await.is_err() {
                // Let producers run before the next attempt
                embassy_futures::yield_now().await;
            }
        }
    }
}
