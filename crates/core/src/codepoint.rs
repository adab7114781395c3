//! Self-describing datastream fields.
//!
//! Host reply packets carry their payload as a sequence of codepoints: a
//! 4-byte big-endian total length, a 2-byte identifier, then the raw data.
//! The identifier namespace is owned by each subsystem (print, transaction);
//! this type only knows the framing.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Framing overhead of one codepoint: 4-byte length plus 2-byte id.
const HEADER_LEN: usize = 6;

/// One self-describing field inside a reply datastream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codepoint {
    id: u16,
    data: Vec<u8>,
}

impl Codepoint {
    /// Create a codepoint from an identifier and raw payload bytes.
    pub fn new(id: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// The 2-byte codepoint identifier.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// The raw payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload decoded as UTF-8 text, trailing blanks trimmed.
    ///
    /// Host text fields are fixed-width and blank-padded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).trim_end().to_string()
    }

    /// Append the wire form of this codepoint to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        let mut header = [0u8; HEADER_LEN];
        BigEndian::write_u32(&mut header[0..4], (self.data.len() + HEADER_LEN) as u32);
        BigEndian::write_u16(&mut header[4..6], self.id);
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.data);
    }

    /// Decode one codepoint from the front of `buf`.
    ///
    /// Returns the codepoint and the number of bytes consumed.
    ///
    /// # Errors
    /// `Error::Internal` when the buffer is truncated or the declared length
    /// is smaller than the framing header.
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Internal(format!(
                "codepoint header truncated: {} bytes",
                buf.len()
            )));
        }
        let total = BigEndian::read_u32(&buf[0..4]) as usize;
        let id = BigEndian::read_u16(&buf[4..6]);
        if total < HEADER_LEN {
            return Err(Error::Internal(format!(
                "codepoint {:#06x} declares length {} below header size",
                id, total
            )));
        }
        if buf.len() < total {
            return Err(Error::Internal(format!(
                "codepoint {:#06x} truncated: need {}, have {}",
                id,
                total,
                buf.len()
            )));
        }
        let data = buf[HEADER_LEN..total].to_vec();
        Ok((Self { id, data }, total))
    }
}
