//! SCPI definite-length block data, `#<n><length><payload>`.
//!
//! `<length>` is the payload byte count in ASCII decimal and `<n>` is a single digit giving the
//! number of characters in `<length>`. The instrument silently misparses a block whose header
//! is off by one, so every encode is checked by decoding it again.

use alloc::{format, string::String};

use crate::error::EncodingError;

/// An encoded block, ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    wire: String,
    header_len: usize,
}

impl EncodedBlock {
    /// Frame `payload` as a definite-length block.
    pub fn encode(payload: &str) -> Result<Self, EncodingError> {
        let length = format!("{}", payload.len());
        if length.len() > 9 {
            return Err(EncodingError::LengthOverflow(payload.len()));
        }
        let wire = format!("#{}{}{}", length.len(), length, payload);
        let header_len = 2 + length.len();

        let decoded = decode(&wire)?;
        if decoded.len() != payload.len() {
            return Err(EncodingError::LengthMismatch {
                declared: decoded.len(),
                actual: payload.len(),
            });
        }
        Ok(Self { wire, header_len })
    }

    /// Number of digits in the length field.
    pub fn length_of_length(&self) -> usize {
        self.header_len - 2
    }

    /// The length field, ASCII decimal.
    pub fn length(&self) -> &str {
        &self.wire[2..self.header_len]
    }

    pub fn payload(&self) -> &str {
        &self.wire[self.header_len..]
    }

    /// Header and payload.
    pub fn as_str(&self) -> &str {
        &self.wire
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.wire.as_bytes()
    }
}

/// Parse a block header and return the payload.
///
/// The payload must be exactly as long as the header declares.
pub fn decode(wire: &str) -> Result<&str, EncodingError> {
    let (header_len, declared) = parse_header(wire.as_bytes())?;
    let actual = wire.len() - header_len;
    if actual != declared {
        return Err(EncodingError::LengthMismatch { declared, actual });
    }
    Ok(&wire[header_len..])
}

/// Returns the header length and the declared payload length.
fn parse_header(bytes: &[u8]) -> Result<(usize, usize), EncodingError> {
    if bytes.first() != Some(&b'#') {
        return Err(EncodingError::MissingHeader);
    }
    let digits = match bytes.get(1) {
        Some(digit @ b'1'..=b'9') => (digit - b'0') as usize,
        _ => return Err(EncodingError::InvalidLengthDigit),
    };
    let header_len = 2 + digits;
    let field = bytes
        .get(2..header_len)
        .ok_or(EncodingError::InvalidLengthDigit)?;

    let mut declared = 0usize;
    for &byte in field {
        if !byte.is_ascii_digit() {
            return Err(EncodingError::InvalidLengthDigit);
        }
        declared = declared * 10 + (byte - b'0') as usize;
    }
    Ok((header_len, declared))
}
