//! We use this mocking module in unit tests to emulate a serial port with an inverter on the other end.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::channel::SerialChannel;

/// Capacity of the simulated receive buffer.
const READ_CAPACITY: usize = 1024;

/// State shared between a [MockSerial] and the [MockProbe]s looking at it.
#[derive(Default)]
struct MockState {
    /// Every frame passed to a successful write call, in order
    frames: Vec<Vec<u8>>,
    /// Bytes the "inverter" has sent which are waiting to be read
    read_buffer: heapless::Vec<u8, READ_CAPACITY>,
    /// Replies released into the read buffer, one per successful write
    replies: VecDeque<Vec<u8>>,
    /// Error returned by every write, if set
    write_error: Option<MockSerialError>,
    /// Accept at most this many bytes per write
    write_limit: Option<usize>,
    /// Hand out at most this many bytes per read
    read_limit: Option<usize>,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    input_clears: usize,
    output_clears: usize,
    flushes: usize,
    closes: usize,
}

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    state: Rc<RefCell<MockState>>,
}

/// A view on a [MockSerial] which stays usable after the port has been moved or dropped.
#[derive(Clone)]
pub struct MockProbe {
    state: Rc<RefCell<MockState>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated timeout error
    #[error("simulated timeout")]
    Timeout,
    /// Simulated buffer overflow
    #[error("simulated buffer overflow")]
    BufferOverflow,
    /// Simulated missing device
    #[error("simulated missing device")]
    NotFound,
    /// Generic simulated error for testing
    #[error("simulated error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::NotFound => embedded_io::ErrorKind::NotFound,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.write_error {
            return Err(err);
        }

        let accepted = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.frames.push(buf[..accepted].to_vec());

        if let Some(reply) = state.replies.pop_front() {
            state
                .read_buffer
                .extend_from_slice(&reply)
                .map_err(|_| MockSerialError::BufferOverflow)?;
        }

        Ok(accepted)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.write_error {
            return Err(err);
        }
        state.flushes += 1;
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        if state.read_buffer.is_empty() {
            return Err(MockSerialError::Timeout);
        }

        let wanted = state.read_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        let bytes_to_read = core::cmp::min(wanted, state.read_buffer.len());
        buf[..bytes_to_read].copy_from_slice(&state.read_buffer[..bytes_to_read]);

        let remaining: heapless::Vec<u8, READ_CAPACITY> =
            heapless::Vec::from_slice(&state.read_buffer[bytes_to_read..])
                .map_err(|_| MockSerialError::BufferOverflow)?;
        state.read_buffer = remaining;
        Ok(bytes_to_read)
    }
}

impl SerialChannel for MockSerial {
    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        let state = self.state.borrow();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(state.read_buffer.len())
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.read_buffer.clear();
        state.input_clears += 1;
        Ok(())
    }

    fn clear_output(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().output_clears += 1;
        Ok(())
    }
}

impl Drop for MockSerial {
    fn drop(&mut self) {
        self.state.borrow_mut().closes += 1;
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    /// Get a handle for inspecting this port after it has been handed over.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Rc::clone(&self.state),
        }
    }

    /// Make bytes available to read right now, as if they arrived before the next send.
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        let mut state = self.state.borrow_mut();
        state.read_buffer.clear();
        state
            .read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Queue a reply which becomes readable after the next successful write.
    pub fn reply_with(&mut self, data: &[u8]) {
        self.state.borrow_mut().replies.push_back(data.to_vec());
    }

    /// Configure whether write operations should fail, and how.
    pub fn set_write_error(&mut self, error: Option<MockSerialError>) {
        self.state.borrow_mut().write_error = error;
    }

    /// Accept at most `limit` bytes per write call.
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.state.borrow_mut().write_limit = limit;
    }

    /// Return at most `limit` bytes per read call.
    pub fn set_read_limit(&mut self, limit: Option<usize>) {
        self.state.borrow_mut().read_limit = limit;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.state.borrow_mut().should_error_on_read = should_error;
    }
}

impl MockProbe {
    /// Every frame written so far.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.borrow().frames.clone()
    }

    pub fn input_clears(&self) -> usize {
        self.state.borrow().input_clears
    }

    pub fn output_clears(&self) -> usize {
        self.state.borrow().output_clears
    }

    /// Bytes still waiting in the receive buffer.
    pub fn pending_input(&self) -> usize {
        self.state.borrow().read_buffer.len()
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    /// How many times the port has been released.
    pub fn closes(&self) -> usize {
        self.state.borrow().closes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_records_frames() {
        let mut mock = MockSerial::new();
        let probe = mock.probe();

        assert_eq!(mock.write(b"Hello, ").unwrap(), 7);
        assert_eq!(mock.write(b"World!").unwrap(), 6);

        assert_eq!(probe.frames(), vec![b"Hello, ".to_vec(), b"World!".to_vec()]);
    }

    #[test]
    fn test_write_limit() {
        let mut mock = MockSerial::new();
        let probe = mock.probe();
        mock.set_write_limit(Some(5));

        assert_eq!(mock.write(&[0u8; 9]).unwrap(), 5);
        assert_eq!(mock.write(&[0u8; 3]).unwrap(), 3);
        assert_eq!(probe.frames()[0].len(), 5);
    }

    #[test]
    fn test_write_error_simulation() {
        let mut mock = MockSerial::new();
        let probe = mock.probe();
        mock.set_write_error(Some(MockSerialError::SimulatedError));

        let result = mock.write(b"test");
        assert!(matches!(result, Err(MockSerialError::SimulatedError)));
        assert!(mock.flush().is_err());
        assert!(probe.frames().is_empty());
    }

    #[test]
    fn test_reply_released_after_write() {
        let mut mock = MockSerial::new();
        mock.reply_with(&[0xAA, 0x55]);
        assert_eq!(mock.bytes_available().unwrap(), 0);

        mock.write(b"ping").unwrap();
        assert_eq!(mock.bytes_available().unwrap(), 2);

        let mut buffer = [0u8; 8];
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], &[0xAA, 0x55]);
        assert_eq!(mock.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Long response data").unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
        assert_eq!(mock.bytes_available().unwrap(), 13);
    }

    #[test]
    fn test_read_limit() {
        let mut mock = MockSerial::new();
        let probe = mock.probe();
        mock.set_read_data(&[0x42; 10]).unwrap();
        mock.set_read_limit(Some(4));

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(probe.pending_input(), 6);
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 10];

        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::Timeout)));
    }

    #[test]
    fn test_clear_input_discards_stale_bytes() {
        let mut mock = MockSerial::new();
        let probe = mock.probe();
        mock.set_read_data(b"stale").unwrap();

        mock.clear_input().unwrap();
        assert_eq!(mock.bytes_available().unwrap(), 0);
        assert_eq!(probe.input_clears(), 1);
    }

    #[test]
    fn test_set_read_data_buffer_overflow() {
        let mut mock = MockSerial::new();
        let result = mock.set_read_data(&[0u8; 2000]);
        assert!(matches!(result, Err(MockSerialError::BufferOverflow)));
    }

    #[test]
    fn test_drop_counts_close() {
        let mock = MockSerial::new();
        let probe = mock.probe();
        drop(mock);
        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockSerialError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockSerialError::BufferOverflow.kind(), embedded_io::ErrorKind::OutOfMemory));
        assert!(matches!(MockSerialError::NotFound.kind(), embedded_io::ErrorKind::NotFound));
        assert!(matches!(MockSerialError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
    }
}
