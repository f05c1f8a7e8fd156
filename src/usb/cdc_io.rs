//! embedded_io_async wrapper for CDC-ACM Receiver/Sender.
//!
//! Provides Read/Write implementations for the CDC packet-based API. The
//! writer buffers up to one packet and only sends on a full packet or on
//! flush, terminating a transfer that ends on a packet boundary with a
//! zero-length packet.

use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::driver::{Driver, EndpointError};
use embedded_io_async::{ErrorType, Read, Write};
use heapless::Vec;

use crate::config::usb::MAX_PACKET_SIZE;
use crate::transport::TransportError;

const PACKET_SIZE: usize = MAX_PACKET_SIZE as usize;

impl From<EndpointError> for TransportError {
    fn from(error: EndpointError) -> Self {
        match error {
            EndpointError::BufferOverflow => TransportError::BufferOverflow,
            EndpointError::Disabled => TransportError::Disconnected,
        }
    }
}

/// Wrapper around CDC Receiver that implements embedded_io_async::Read.
pub struct CdcReader<'d, D: Driver<'d>> {
    inner: Receiver<'d, D>,
}

impl<'d, D: Driver<'d>> CdcReader<'d, D> {
    pub fn new(inner: Receiver<'d, D>) -> Self {
        Self { inner }
    }
}

impl<'d, D: Driver<'d>> ErrorType for CdcReader<'d, D> {
    type Error = TransportError;
}

impl<'d, D: Driver<'d>> Read for CdcReader<'d, D> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        // Wait for DTR (Data Terminal Ready) before reading
        self.inner.wait_connection().await;

        Ok(self.inner.read_packet(buf).await?)
    }
}

/// Wrapper around CDC Sender that implements embedded_io_async::Write.
pub struct CdcWriter<'d, D: Driver<'d>> {
    inner: Sender<'d, D>,
    pending: Vec<u8, PACKET_SIZE>,
    last_was_full: bool,
}

impl<'d, D: Driver<'d>> CdcWriter<'d, D> {
    pub fn new(inner: Sender<'d, D>) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            last_was_full: false,
        }
    }

    /// Send the buffered packet. The buffer is cleared even on failure.
    async fn send_pending(&mut self) -> Result<(), TransportError> {
        let result = self.inner.write_packet(&self.pending).await;
        self.last_was_full = self.pending.is_full();
        self.pending.clear();
        Ok(result?)
    }
}

impl<'d, D: Driver<'d>> ErrorType for CdcWriter<'d, D> {
    type Error = TransportError;
}

impl<'d, D: Driver<'d>> Write for CdcWriter<'d, D> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        // Wait for DTR before writing
        self.inner.wait_connection().await;

        if self.pending.is_full() {
            self.send_pending().await?;
        }

        let room = self.pending.capacity() - self.pending.len();
        let take = buf.len().min(room);
        // Cannot overflow after clamping to the remaining room
        let _ = self.pending.extend_from_slice(&buf[..take]);
        Ok(take)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.pending.is_empty() {
            self.send_pending().await?;
        }

        if self.last_was_full {
            self.last_was_full = false;
            self.inner.write_packet(&[]).await?;
        }

        Ok(())
    }
}
