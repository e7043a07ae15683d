//! We use this mocking module in unit tests to emulate the link to a signal generator.

use alloc::vec::Vec;

/// Our mock type used to emulate a serial port or socket.
pub struct MockSerial {
    /// Everything written to the mock, segment uploads can be large.
    write_buffer: Vec<u8>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, 256>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Writes fail once this many newline terminated commands went through.
    fail_after_lines: Option<usize>,
    /// Newline terminated commands written so far.
    lines_written: usize,
}

#[derive(Debug)]
pub enum MockSerialError {
    /// No response data left to read
    Timeout,
    /// Simulated buffer overflow
    BufferOverflow,
    /// Generic simulated error for testing
    SimulatedError,
}

impl core::fmt::Display for MockSerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl core::error::Error for MockSerialError {}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        if self
            .fail_after_lines
            .is_some_and(|limit| self.lines_written >= limit)
        {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer.extend_from_slice(buf);
        self.lines_written += buf.iter().filter(|&&byte| byte == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);

        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_error_on_read: false,
            fail_after_lines: None,
            lines_written: 0,
        }
    }

    /// Set the data that will be returned when read() is called
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Complete commands written so far, without their terminators.
    pub fn lines(&self) -> Vec<&str> {
        let text = core::str::from_utf8(&self.write_buffer).unwrap_or_default();
        let mut lines: Vec<&str> = text.split('\n').collect();
        // Whatever follows the last terminator is not a complete command.
        lines.pop();
        lines
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Let `lines` commands through, then fail every write.
    pub fn fail_after_lines(&mut self, lines: usize) {
        self.fail_after_lines = Some(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        let test_data = b"Hello, World!";

        let result = mock.write(test_data);
        assert_eq!(result.unwrap(), test_data.len());
        assert_eq!(mock.written_data(), test_data);
    }

    #[test]
    fn test_lines() {
        let mut mock = MockSerial::new();
        mock.write_all(b"*RST\nOUTP ON\nDATA:A").unwrap();
        assert_eq!(mock.lines(), ["*RST", "OUTP ON"]);
    }

    #[test]
    fn test_fail_after_lines() {
        let mut mock = MockSerial::new();
        mock.fail_after_lines(1);
        mock.write_all(b"*RST").unwrap();
        mock.write_all(b"\n").unwrap();
        assert!(matches!(
            mock.write(b"OUTP ON\n"),
            Err(MockSerialError::SimulatedError)
        ));
        assert_eq!(mock.lines(), ["*RST"]);
    }

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Long response data").unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
    }

    #[test]
    fn test_read_timeout_after_data_exhausted() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Hi").unwrap();

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::Timeout)
        ));
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(
            mock.write(b"test"),
            Err(MockSerialError::SimulatedError)
        ));
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty());

        mock.set_read_data(b"data").unwrap();
        mock.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockSerialError::SimulatedError)
        ));
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        ));
        assert!(matches!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::Other
        ));
    }

    #[test]
    fn test_set_read_data_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = [0u8; 300];
        assert!(matches!(
            mock.set_read_data(&large_data),
            Err(MockSerialError::BufferOverflow)
        ));
    }
}
