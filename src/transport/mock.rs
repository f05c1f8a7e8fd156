//! Mock serial transport for testing

use core::cell::RefCell;

use heapless::Vec;

use super::TransportError;

/// Room for every byte a test pushes through the mock
const MOCK_BUFFER_SIZE: usize = 4096;

/// Mock CDC endpoint for unit testing
///
/// Implements the blocking and async `embedded-io` read traits over a queue
/// of pending RX bytes, and the async write trait into a TX capture buffer.
pub struct MockTransport {
    /// Data queued to be returned by read()
    rx_buffer: RefCell<Vec<u8, MOCK_BUFFER_SIZE>>,
    /// Data written via write()
    tx_buffer: RefCell<Vec<u8, MOCK_BUFFER_SIZE>>,
    /// Number of successful flush() calls
    flushes: RefCell<usize>,
    /// Error to return on next read
    next_read_error: RefCell<Option<TransportError>>,
    /// Error to return on next write
    next_write_error: RefCell<Option<TransportError>>,
    /// Error to return on next flush
    next_flush_error: RefCell<Option<TransportError>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self {
            rx_buffer: RefCell::new(Vec::new()),
            tx_buffer: RefCell::new(Vec::new()),
            flushes: RefCell::new(0),
            next_read_error: RefCell::new(None),
            next_write_error: RefCell::new(None),
            next_flush_error: RefCell::new(None),
        }
    }

    /// Queue data to be returned by read()
    pub fn queue_rx_data(&self, data: &[u8]) {
        let _ = self.rx_buffer.borrow_mut().extend_from_slice(data);
    }

    /// Get all data written via write()
    pub fn get_tx_data(&self) -> Vec<u8, MOCK_BUFFER_SIZE> {
        self.tx_buffer.borrow().clone()
    }

    /// Number of successful flushes
    pub fn flush_count(&self) -> usize {
        *self.flushes.borrow()
    }

    /// Set an error to be returned by the next read() call
    pub fn set_next_read_error(&self, error: TransportError) {
        *self.next_read_error.borrow_mut() = Some(error);
    }

    /// Set an error to be returned by the next write() call
    pub fn set_next_write_error(&self, error: TransportError) {
        *self.next_write_error.borrow_mut() = Some(error);
    }

    /// Set an error to be returned by the next flush() call
    pub fn set_next_flush_error(&self, error: TransportError) {
        *self.next_flush_error.borrow_mut() = Some(error);
    }

    fn read_pending(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if let Some(error) = self.next_read_error.borrow_mut().take() {
            return Err(error);
        }

        let mut rx = self.rx_buffer.borrow_mut();
        let count = core::cmp::min(buf.len(), rx.len());
        buf[..count].copy_from_slice(&rx[..count]);

        // Remove read bytes from buffer (shift remaining)
        let remaining: Vec<u8, MOCK_BUFFER_SIZE> = rx[count..].iter().copied().collect();
        *rx = remaining;

        Ok(count)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl embedded_io::ErrorType for MockTransport {
    type Error = TransportError;
}

impl embedded_io::Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.read_pending(buf)
    }
}

impl embedded_io_async::Read for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        // No data available returns Ok(0); a real endpoint would wait
        self.read_pending(buf)
    }
}

impl embedded_io_async::Write for MockTransport {
    async fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if let Some(error) = self.next_write_error.borrow_mut().take() {
            return Err(error);
        }

        self.tx_buffer
            .borrow_mut()
            .extend_from_slice(data)
            .map_err(|_| TransportError::BufferOverflow)?;

        Ok(data.len())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        if let Some(error) = self.next_flush_error.borrow_mut().take() {
            return Err(error);
        }

        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_partial_read() {
        let mut port = MockTransport::new();
        port.queue_rx_data(&[0x01, 0x02, 0x03, 0x04, 0x05]);

        let mut buf = [0u8; 2];
        let count = embedded_io::Read::read(&mut port, &mut buf).unwrap();
        assert_eq!(count, 2);
        assert_eq!(&buf, &[0x01, 0x02]);

        let mut buf = [0u8; 10];
        let count = embedded_io::Read::read(&mut port, &mut buf).unwrap();
        assert_eq!(count, 3);
        assert_eq!(&buf[..3], &[0x03, 0x04, 0x05]);
    }

    #[test]
    fn test_mock_write_and_flush() {
        let mut port = MockTransport::new();

        futures::executor::block_on(async {
            embedded_io_async::Write::write_all(&mut port, &[0x01, 0x02]).await.unwrap();
            embedded_io_async::Write::flush(&mut port).await.unwrap();
        });

        assert_eq!(port.get_tx_data().as_slice(), &[0x01, 0x02]);
        assert_eq!(port.flush_count(), 1);
    }

    #[test]
    fn test_mock_errors_are_one_shot() {
        let mut port = MockTransport::new();

        futures::executor::block_on(async {
            port.set_next_write_error(TransportError::Disconnected);
            let result = embedded_io_async::Write::write(&mut port, &[0x01]).await;
            assert_eq!(result, Err(TransportError::Disconnected));

            // Error should be cleared
            let count = embedded_io_async::Write::write(&mut port, &[0x01]).await.unwrap();
            assert_eq!(count, 1);
        });
    }
}
