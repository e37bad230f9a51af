//! Chunk payload compression.
//!
//! The container knows two storage modes, selected by the chunk header's
//! compressed size: stored (size 0) and a raw LZ4 block without frame header.
//! Both are expressed through the [`Compressor`] trait so the reader and the
//! writer pick a strategy in one place.

use std::borrow::Cow;

use crate::error::{RbxError, Result};

/// Interface for the payload storage strategies.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Compresses the data.
    ///
    /// Returns a `Cow<[u8]>` which borrows the input if no compression is performed.
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;

    /// Restores a payload that must expand to exactly `uncompressed_size` bytes.
    fn decompress<'a>(&self, data: &'a [u8], uncompressed_size: usize) -> Result<Cow<'a, [u8]>>;
}

/// Payloads stored as-is (compressed size 0 on the wire).
#[derive(Debug, Clone, Copy)]
pub struct NoCompression;

impl Compressor for NoCompression {
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }

    fn decompress<'a>(&self, data: &'a [u8], uncompressed_size: usize) -> Result<Cow<'a, [u8]>> {
        if data.len() != uncompressed_size {
            return Err(RbxError::layout(format!(
                "stored payload is {} bytes, header declares {uncompressed_size}",
                data.len()
            )));
        }
        Ok(Cow::Borrowed(data))
    }
}

/// Raw LZ4 blocks (no frame, no size prefix).
#[derive(Debug, Clone, Copy)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Owned(lz4_flex::block::compress(data)))
    }

    fn decompress<'a>(&self, data: &'a [u8], uncompressed_size: usize) -> Result<Cow<'a, [u8]>> {
        let mut output = vec![0u8; uncompressed_size];
        let written = lz4_flex::block::decompress_into(data, &mut output)
            .map_err(|e| RbxError::layout(format!("LZ4 block does not expand cleanly: {e}")))?;
        if written != uncompressed_size {
            return Err(RbxError::layout(format!(
                "LZ4 block expanded to {written} bytes, header declares {uncompressed_size}"
            )));
        }
        Ok(Cow::Owned(output))
    }
}

/// Expands a stored chunk payload according to its declared sizes.
///
/// `compressed_size == 0` selects [`NoCompression`], anything else [`Lz4Compressor`].
pub fn expand(stored: &[u8], compressed_size: u32, uncompressed_size: u32) -> Result<Cow<'_, [u8]>> {
    if compressed_size == 0 {
        NoCompression.decompress(stored, uncompressed_size as usize)
    } else {
        Lz4Compressor.decompress(stored, uncompressed_size as usize)
    }
}

/// Compresses a payload for writing. Returns `None` when LZ4 would not make it smaller,
/// in which case the chunk is stored raw.
pub fn shrink(payload: &[u8]) -> Result<Option<Vec<u8>>> {
    if payload.is_empty() {
        return Ok(None);
    }
    let compressed = Lz4Compressor.compress(payload)?;
    if compressed.len() < payload.len() {
        Ok(Some(compressed.into_owned()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn lz4_block_round_trip() {
        let payload = vec![7u8; 4096];
        let packed = shrink(&payload).unwrap().expect("repetitive data compresses");
        assert!(packed.len() < payload.len());
        let unpacked = expand(&packed, packed.len() as u32, payload.len() as u32).unwrap();
        assert_eq!(unpacked.as_ref(), payload.as_slice());
    }

    #[test]
    fn wrong_declared_size_is_a_layout_error() {
        let payload = vec![1u8; 512];
        let packed = shrink(&payload).unwrap().unwrap();
        let err = expand(&packed, packed.len() as u32, 511).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadChunkLayout);
        let err = expand(&packed, packed.len() as u32, 600).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadChunkLayout);
    }

    #[test]
    fn garbage_block_is_rejected() {
        let err = expand(&[0xF0, 0xFF, 0xFF], 3, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadChunkLayout);
    }

    #[test]
    fn stored_payload_borrows() {
        let payload = b"abc";
        match expand(payload, 0, 3).unwrap() {
            Cow::Borrowed(b) => assert_eq!(b, payload),
            Cow::Owned(_) => panic!("stored payload should not be copied"),
        }
        assert!(shrink(b"xy").unwrap().is_none());
    }
}
