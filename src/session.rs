//! A blocking SCPI session over any byte stream.
//!
//! Only queries read anything back, everything else is write and flush.

use alloc::format;

use embedded_io::Error as _;

use crate::{
    block::EncodedBlock,
    error::{Error, Result},
    segment::Segment,
    types::Channel,
};

/// You can create a ScpiSession using any interface which implements [embedded_io::Read] & [embedded_io::Write].
///
/// Commands are newline terminated ASCII. Every call blocks until the interface has accepted
/// (and flushed) the whole command; timeouts are the interface's business.
///
/// `L` is the capacity of the buffer used for query responses.
pub struct ScpiSession<S: embedded_io::Read + embedded_io::Write, const L: usize = 256> {
    interface: S,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> ScpiSession<S, L> {
    /// Create a new session on an already connected interface.
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    /// Give back the underlying interface.
    pub fn into_inner(self) -> S {
        self.interface
    }

    /// Send a command, no response is read.
    pub fn send(&mut self, command: &str) -> Result<(), S::Error> {
        log::trace!("> {}", command);
        self.write_all(command.as_bytes())?;
        self.finish_line()
    }

    /// Send a command and read back one response line, without the terminator.
    pub fn query(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.send(command)?;

        let mut buff: heapless::Vec<u8, L> = heapless::Vec::new();
        // One byte at a time so nothing past the terminator is consumed.
        let mut temp_buf = [0u8; 1];
        loop {
            match self.interface.read(&mut temp_buf) {
                Ok(0) => {
                    if buff.is_empty() {
                        return Err(Error::Timeout);
                    }
                    break;
                }
                Ok(_) => {
                    if temp_buf[0] == b'\n' {
                        break;
                    }
                    buff.push(temp_buf[0]).map_err(|_| Error::BufferError)?;
                }
                Err(e) => {
                    // Some interfaces report a drained buffer rather than waiting for the terminator.
                    if matches!(
                        e.kind(),
                        embedded_io::ErrorKind::Other | embedded_io::ErrorKind::TimedOut
                    ) && !buff.is_empty()
                    {
                        break;
                    }
                    if e.kind() == embedded_io::ErrorKind::TimedOut {
                        return Err(Error::Timeout);
                    }
                    return Err(Error::SerialError(e));
                }
            }
        }
        if buff.last() == Some(&b'\r') {
            buff.pop();
        }

        let response =
            heapless::String::from_utf8(buff).map_err(|_| Error::InvalidResponse)?;
        log::trace!("< {}", response);
        Ok(response)
    }

    /// Send `<command> <block>`, e.g. a `DATA:SEQ` upload.
    pub fn send_block(&mut self, command: &str, block: &EncodedBlock) -> Result<(), S::Error> {
        log::trace!("> {} #{}{}...", command, block.length_of_length(), block.length());
        self.write_all(command.as_bytes())?;
        self.write_all(b" ")?;
        self.write_all(block.as_bytes())?;
        self.finish_line()
    }

    /// Upload a segment as `<source>DATA:ARB <name>,<v1>,<v2>,...`.
    ///
    /// Values are streamed straight to the interface, the full command is never held in memory.
    pub fn upload_segment(&mut self, channel: Channel, segment: &Segment) -> Result<(), S::Error> {
        let header = format!("{}DATA:ARB {}", channel.prefix(), segment.name());
        log::trace!("> {},<{} points>", header, segment.len());
        self.write_all(header.as_bytes())?;
        for value in segment.formatted() {
            self.write_all(b",")?;
            self.write_all(value.as_bytes())?;
        }
        self.finish_line()
    }

    /// Ask the instrument who it is.
    pub fn identify(&mut self) -> Result<heapless::String<L>, S::Error> {
        self.query("*IDN?")
    }

    /// Return the instrument to its power-on state.
    pub fn reset(&mut self) -> Result<(), S::Error> {
        self.send("*RST")
    }

    /// Clear the status and error queue.
    pub fn clear_status(&mut self) -> Result<(), S::Error> {
        self.send("*CLS")
    }

    /// Switch a channel's output off.
    pub fn output_off(&mut self, channel: Channel) -> Result<(), S::Error> {
        self.send(&format!("OUTP{} OFF", channel.suffix()))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), S::Error> {
        self.interface.write_all(bytes).map_err(Error::SerialError)
    }

    fn finish_line(&mut self) -> Result<(), S::Error> {
        self.write_all(b"\n")?;
        self.interface.flush().map_err(Error::SerialError)
    }
}
