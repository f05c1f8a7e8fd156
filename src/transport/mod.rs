//! Transport abstraction for the USB serial endpoint
//!
//! The pipeline talks to the transport only through the `embedded-io`
//! traits: the drain task owns an [`embedded_io_async::Write`] half, the RX
//! path reads through [`embedded_io_async::Read`] (task context) or
//! [`embedded_io::Read`] (interrupt context). This lets the CDC-ACM adapters
//! be swapped with a mock for testing.

/// Errors that can occur on the serial transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Host not connected or endpoint disabled
    Disconnected,
    /// Packet larger than the endpoint buffer
    BufferOverflow,
    /// Write rejected by the endpoint
    WriteError,
    /// Read rejected by the endpoint
    ReadError,
}

impl embedded_io::Error for TransportError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            TransportError::Disconnected => embedded_io::ErrorKind::NotConnected,
            TransportError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            TransportError::WriteError | TransportError::ReadError => embedded_io::ErrorKind::Other,
        }
    }
}

#[cfg(test)]
pub mod mock;
