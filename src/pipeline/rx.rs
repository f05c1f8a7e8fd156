//! CDC receive path: inbound bytes go straight into the transfer queue.
//!
//! Received data needs no formatting, so it bypasses the formatter lock. The
//! transport's buffer is copied into a fresh [`Chunk`] before the callback
//! returns; nothing keeps a reference to it.

use super::{Chunk, LogPipeline, PipelineError};
use crate::config::pipeline::CHUNK_CAPACITY;

impl<const N: usize> LogPipeline<N> {
    /// Task-context RX callback.
    ///
    /// Waits up to the configured enqueue timeout for queue space. Returns
    /// the number of bytes queued (0 for an empty read).
    pub async fn on_receive(&self, data: &[u8]) -> Result<usize, PipelineError> {
        if data.is_empty() {
            return Ok(0);
        }

        let chunk = self.rx_chunk(data)?;
        self.queue
            .enqueue(chunk, self.settings.enqueue_timeout)
            .await?;
        Ok(data.len())
    }

    /// Interrupt-context RX callback. Never blocks.
    pub fn on_receive_from_isr(&self, data: &[u8]) -> Result<usize, PipelineError> {
        if data.is_empty() {
            return Ok(0);
        }

        let chunk = self.rx_chunk(data)?;
        self.queue.enqueue_from_isr(chunk)?;
        Ok(data.len())
    }

    /// Interrupt-context RX event: read what the transport has buffered and
    /// forward it through [`on_receive_from_isr`](Self::on_receive_from_isr).
    ///
    /// At most [`CHUNK_CAPACITY`] bytes are read per event.
    pub fn on_rx_event<S: embedded_io::Read>(&self, source: &mut S) -> Result<usize, PipelineError> {
        let mut buf = [0u8; CHUNK_CAPACITY];
        let count = source.read(&mut buf).map_err(|_| PipelineError::Transport)?;
        self.on_receive_from_isr(&buf[..count])
    }

    fn rx_chunk(&self, data: &[u8]) -> Result<Chunk, PipelineError> {
        Chunk::copy_from(data).inspect_err(|_| self.queue.record_drop())
    }
}
