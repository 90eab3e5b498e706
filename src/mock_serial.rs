//! We use this mocking module in unit tests to emulate a serial port.
//!
//! A [`MockConnector`] and every [`MockSerial`] it opens share one [`MockState`], so a test
//! can keep the connector, hand a clone to the transport, and inspect what happened on the
//! wire afterwards.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    channel::{Connector, SerialChannel},
    serial::SerialConfig,
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSerialError {
    /// Simulated timeout error
    #[error("Simulated timeout")]
    Timeout,
    /// Generic simulated error for testing
    #[error("Simulated error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    /// Everything written, across all connections.
    write_buffer: Vec<u8>,
    /// Bytes on their way in, each chunk readable from its instant on.
    inbound: VecDeque<(Instant, Vec<u8>)>,
    /// Replies queued for the next writes, with the delay after each write.
    replies: VecDeque<(Duration, Vec<u8>)>,
    open: bool,
    connects: usize,
    flushes: usize,
    input_clears: usize,
    output_clears: usize,
    read_attempts: usize,
    dtr_history: Vec<bool>,
    should_error_on_connect: bool,
    should_error_on_write: bool,
    should_error_on_read: bool,
    should_error_on_clear: bool,
    should_error_on_dtr: bool,
}

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    state: Rc<RefCell<MockState>>,
}

impl Drop for MockSerial {
    fn drop(&mut self) {
        self.state.borrow_mut().open = false;
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        state.write_buffer.extend_from_slice(buf);

        if buf.contains(&b'\n')
            && let Some((delay, reply)) = state.replies.pop_front()
        {
            state.inbound.push_back((Instant::now() + delay, reply));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        state.flushes += 1;
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.read_attempts += 1;
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        let now = Instant::now();
        let Some((ready_at, chunk)) = state.inbound.front_mut() else {
            return Err(MockSerialError::Timeout);
        };
        if *ready_at > now {
            return Err(MockSerialError::Timeout);
        }

        let bytes_to_read = buf.len().min(chunk.len());
        buf[..bytes_to_read].copy_from_slice(&chunk[..bytes_to_read]);
        chunk.drain(..bytes_to_read);
        if chunk.is_empty() {
            state.inbound.pop_front();
        }
        Ok(bytes_to_read)
    }
}

impl SerialChannel for MockSerial {
    fn clear_input(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_clear {
            return Err(MockSerialError::SimulatedError);
        }
        state.input_clears += 1;
        // Only what has already arrived can be discarded.
        let now = Instant::now();
        state.inbound.retain(|(ready_at, _)| *ready_at > now);
        Ok(())
    }

    fn clear_output(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_clear {
            return Err(MockSerialError::SimulatedError);
        }
        state.output_clears += 1;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_dtr {
            return Err(MockSerialError::SimulatedError);
        }
        state.dtr_history.push(level);
        Ok(())
    }
}

/// Opens [`MockSerial`] channels and exposes their shared state.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Rc<RefCell<MockState>>,
}

impl Connector for MockConnector {
    type Channel = MockSerial;

    fn connect(&mut self, _config: &SerialConfig) -> Result<MockSerial, MockSerialError> {
        let mut state = self.state.borrow_mut();
        if state.should_error_on_connect {
            return Err(MockSerialError::SimulatedError);
        }
        state.connects += 1;
        state.open = true;
        Ok(MockSerial {
            state: Rc::clone(&self.state),
        })
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `data` readable right away, as if it arrived before anyone asked.
    pub fn preload(&self, data: &[u8]) {
        self.state
            .borrow_mut()
            .inbound
            .push_back((Instant::now(), data.to_vec()));
    }

    /// Answer the next written line with `data`, `delay` after the write.
    pub fn reply_after(&self, delay: Duration, data: &[u8]) {
        self.state
            .borrow_mut()
            .replies
            .push_back((delay, data.to_vec()));
    }

    /// Get a copy of the data that was written to the mock serial port
    pub fn written_data(&self) -> Vec<u8> {
        self.state.borrow().write_buffer.clone()
    }

    /// Clear the write buffer
    pub fn clear_written_data(&self) {
        self.state.borrow_mut().write_buffer.clear();
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn input_clears(&self) -> usize {
        self.state.borrow().input_clears
    }

    pub fn output_clears(&self) -> usize {
        self.state.borrow().output_clears
    }

    pub fn read_attempts(&self) -> usize {
        self.state.borrow().read_attempts
    }

    pub fn dtr_history(&self) -> Vec<bool> {
        self.state.borrow().dtr_history.clone()
    }

    pub fn set_connect_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_connect = should_error;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_read = should_error;
    }

    pub fn set_clear_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_clear = should_error;
    }

    pub fn set_dtr_error(&self, should_error: bool) {
        self.state.borrow_mut().should_error_on_dtr = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error as _, Read, Write};

    fn open(connector: &mut MockConnector) -> MockSerial {
        connector.connect(&SerialConfig::new("MOCK0")).unwrap()
    }

    #[test]
    fn test_write_data() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);
        mock.write_all(b"Hello, ").unwrap();
        mock.write_all(b"World!").unwrap();
        assert_eq!(connector.written_data(), b"Hello, World!");

        connector.clear_written_data();
        assert!(connector.written_data().is_empty());
    }

    #[test]
    fn test_read_partial_data() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);
        connector.preload(b"Hello World");

        let mut buffer1 = [0u8; 5];
        let mut buffer2 = [0u8; 10];
        assert_eq!(mock.read(&mut buffer1).unwrap(), 5);
        assert_eq!(mock.read(&mut buffer2).unwrap(), 6);
        assert_eq!(&buffer1, b"Hello");
        assert_eq!(&buffer2[..6], b" World");
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);
        let mut buffer = [0u8; 10];
        let err = mock.read(&mut buffer).unwrap_err();
        assert_eq!(err, MockSerialError::Timeout);
        assert!(matches!(err.kind(), embedded_io::ErrorKind::TimedOut));
    }

    #[test]
    fn test_reply_arrives_after_delay() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);
        connector.reply_after(Duration::from_millis(20), b"OK\n");
        mock.write_all(b"PING\n").unwrap();

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer), Err(MockSerialError::Timeout));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(mock.read(&mut buffer), Ok(3));
        assert_eq!(&buffer[..3], b"OK\n");
    }

    #[test]
    fn test_clear_input_keeps_future_data() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);
        connector.preload(b"old\n");
        connector.reply_after(Duration::from_millis(20), b"new\n");
        mock.write_all(b"Q\n").unwrap();
        mock.clear_input().unwrap();

        std::thread::sleep(Duration::from_millis(30));
        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer), Ok(4));
        assert_eq!(&buffer[..4], b"new\n");
    }

    #[test]
    fn test_error_flags_toggle() {
        let mut connector = MockConnector::new();
        let mut mock = open(&mut connector);

        connector.set_write_error(true);
        assert!(mock.write(b"test").is_err());
        assert!(mock.flush().is_err());
        connector.set_write_error(false);
        assert!(mock.write(b"test").is_ok());

        connector.preload(b"data");
        connector.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer), Err(MockSerialError::SimulatedError));
        connector.set_read_error(false);
        assert_eq!(mock.read(&mut buffer), Ok(4));

        connector.set_dtr_error(true);
        assert!(mock.set_dtr(true).is_err());
        assert!(connector.dtr_history().is_empty());
    }

    #[test]
    fn test_drop_closes() {
        let mut connector = MockConnector::new();
        let mock = open(&mut connector);
        assert!(connector.is_open());
        drop(mock);
        assert!(!connector.is_open());
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockSerialError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockSerialError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
    }
}
