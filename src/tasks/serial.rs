//! Serial tasks for the CDC-ACM port.
//!
//! The drain task is the only writer on the port. The RX task reads what the
//! host sends and hands it to the pipeline, so received bytes are echoed back
//! in queue order alongside log output. Both are generic over any type
//! implementing the embedded_io_async traits.

use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};

use crate::config::pipeline::CHUNK_CAPACITY;
use crate::config::tasks::RX_RETRY_DELAY_MS;
use crate::pipeline::{Drainer, LogPipeline, PipelineError, QueueConsumer};

/// Task that writes queued chunks to the serial interface.
///
/// Waits `startup_delay` first so the host has time to enumerate and open
/// the port.
pub async fn drain_task<W: Write, const N: usize>(
    consumer: QueueConsumer<'_, N>,
    writer: W,
    startup_delay: Duration,
) -> ! {
    Drainer::new(consumer, writer).run(startup_delay).await
}

/// Read one packet from `reader` and queue it.
///
/// Returns the number of bytes queued; an empty read queues nothing.
pub async fn forward_packet<R: Read, const N: usize>(
    pipeline: &LogPipeline<N>,
    reader: &mut R,
) -> Result<usize, PipelineError> {
    let mut buf = [0u8; CHUNK_CAPACITY];
    let count = reader
        .read(&mut buf)
        .await
        .map_err(|_| PipelineError::Transport)?;
    pipeline.on_receive(&buf[..count]).await
}

/// Task that reads from the serial interface into the pipeline.
pub async fn rx_task<R: Read, const N: usize>(pipeline: &LogPipeline<N>, mut reader: R) -> ! {
    loop {
        match forward_packet(pipeline, &mut reader).await {
            Ok(_) => {}
            Err(PipelineError::Transport) => {
                // Port error, back off and retry
                Timer::after(Duration::from_millis(RX_RETRY_DELAY_MS)).await;
            }
            Err(_) => {
                // Dropped under load, already counted by the queue
            }
        }
    }
}
