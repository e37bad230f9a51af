//! Primitive codec: bounded reads and mirrored writes over in-memory buffers.
//!
//! Every read on [`ByteReader`] is checked against the remaining length. A read that
//! cannot be satisfied returns [`RbxError::Truncated`] and leaves the cursor exactly
//! where it was, so a caller can report the failing offset or try another layout.
//!
//! [`ByteWriter`] mirrors each read bit-for-bit (same byte order, same length
//! prefixes), which keeps decode -> encode -> decode lossless for every primitive.

use crate::error::{RbxError, Result};

/// A forward-only cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(RbxError::Truncated {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..self.pos])
    }

    /// Reads up to `len` bytes, returning fewer if the buffer runs out.
    pub fn read_up_to(&mut self, len: usize) -> &'a [u8] {
        let take = len.min(self.remaining());
        let start = self.pos;
        self.pos += take;
        &self.data[start..self.pos]
    }

    /// Consumes everything that is left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let start = self.pos;
        self.pos = self.data.len();
        &self.data[start..]
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32_le(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64_le(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Reads a little-endian `f32`.
    pub fn read_f32_le(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_le_bytes)
    }

    /// Reads a little-endian `f64`.
    pub fn read_f64_le(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Reads one byte as a boolean. Anything but `0x00`/`0x01` is rejected and the
    /// cursor does not advance.
    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.pos;
        match self.data.get(offset).copied() {
            Some(0) => {
                self.pos += 1;
                Ok(false)
            }
            Some(1) => {
                self.pos += 1;
                Ok(true)
            }
            Some(byte) => Err(RbxError::InvalidBoolByte { offset, byte }),
            None => Err(RbxError::Truncated {
                offset,
                needed: 1,
                available: 0,
            }),
        }
    }

    /// Reads a 4-byte little-endian length followed by that many bytes.
    pub fn read_n_bytes(&mut self) -> Result<&'a [u8]> {
        let start = self.pos;
        let len = self.read_u32_le()? as usize;
        self.read_bytes(len).inspect_err(|_| self.pos = start)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_n_string(&mut self, what: &'static str) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.read_n_bytes()?;
        std::str::from_utf8(bytes).map_err(|_| {
            self.pos = start;
            RbxError::InvalidUtf8(what)
        })
    }

    /// Reads a fixed-length UTF-8 string.
    pub fn read_string(&mut self, len: usize, what: &'static str) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| {
            self.pos = start;
            RbxError::InvalidUtf8(what)
        })
    }
}

/// A growable output buffer with write operations mirroring [`ByteReader`].
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer, returning the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Appends `data` verbatim.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Appends one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16_le(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32_le(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `i32`.
    pub fn write_i32_le(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64_le(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `i64`.
    pub fn write_i64_le(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `f32`.
    pub fn write_f32_le(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends a little-endian `f64`.
    pub fn write_f64_le(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Appends `0x01` or `0x00`.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Writes a 4-byte little-endian length prefix followed by `data`.
    ///
    /// # Errors
    /// Returns [`RbxError::Unrepresentable`] if `data` is longer than `u32::MAX`.
    pub fn write_n_bytes(&mut self, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            RbxError::Unrepresentable(format!("byte string of {} bytes", data.len()))
        })?;
        self.write_u32_le(len);
        self.write_bytes(data);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_n_string(&mut self, value: &str) -> Result<()> {
        self.write_n_bytes(value.as_bytes())
    }

    /// Writes a fixed-length string without a prefix.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn short_read_does_not_advance() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.read_u32_le().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_bytes(2).unwrap(), &[2, 3]);
    }

    #[test]
    fn bool_rejects_other_bytes_in_place() {
        let mut r = ByteReader::new(&[0x00, 0x01, 0x02]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        let err = r.read_bool().unwrap_err();
        assert!(matches!(
            err,
            RbxError::InvalidBoolByte {
                offset: 2,
                byte: 0x02
            }
        ));
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn n_string_rewinds_past_prefix_on_short_body() {
        // Prefix claims 10 bytes but only 3 follow.
        let mut data = 10u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_n_bytes().unwrap_err().kind(), ErrorKind::Truncated);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn writer_mirrors_reader() {
        let mut w = ByteWriter::new();
        w.write_u8(7);
        w.write_u16_le(0xBEEF);
        w.write_i32_le(-5);
        w.write_u64_le(u64::MAX - 1);
        w.write_bool(true);
        w.write_n_string("Workspace").unwrap();
        w.write_string("END\0");
        w.write_f64_le(0.25);
        let bytes = w.into_inner();

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16_le().unwrap(), 0xBEEF);
        assert_eq!(r.read_i32_le().unwrap(), -5);
        assert_eq!(r.read_u64_le().unwrap(), u64::MAX - 1);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_n_string("name").unwrap(), "Workspace");
        assert_eq!(r.read_string(4, "tag").unwrap(), "END\0");
        assert_eq!(r.read_f64_le().unwrap(), 0.25);
        assert!(r.is_empty());
    }

    #[test]
    fn read_up_to_clamps() {
        let mut r = ByteReader::new(&[9; 6]);
        assert_eq!(r.read_up_to(4).len(), 4);
        assert_eq!(r.read_up_to(4).len(), 2);
        assert!(r.read_up_to(4).is_empty());
    }
}
