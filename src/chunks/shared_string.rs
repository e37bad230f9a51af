use crate::error::{ErrorKind, RbxError, Result};
use crate::io::{ByteReader, ByteWriter};

const SHARED_STRING_CHUNK_VERSION: u32 = 0;

/// A deduplicated string value, keyed by a 16-byte digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SharedString {
    digest: [u8; 16],
    content: Vec<u8>,
}

impl SharedString {
    /// Wraps a digest and its content.
    pub fn new(digest: [u8; 16], content: Vec<u8>) -> Self {
        Self { digest, content }
    }

    /// The digest as stored in the file. It is not verified against the content.
    pub fn digest(&self) -> &[u8; 16] {
        &self.digest
    }

    /// The string itself.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// The `SSTR` chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStringChunk {
    /// Table entries; a shared-string property value indexes into this.
    pub strings: Vec<SharedString>,
}

impl SharedStringChunk {
    /// Parses the table.
    ///
    /// Stops after the declared count or when the buffer runs out, whichever comes
    /// first; a trailing short entry ends the table rather than failing.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let version = r.read_u32_le()?;
        if version != SHARED_STRING_CHUNK_VERSION {
            return Err(RbxError::UnsupportedVersion {
                what: "shared string chunk",
                version,
            });
        }
        let count = r.read_u32_le()? as usize;

        let mut strings = Vec::with_capacity(count.min(r.remaining() / 20));
        for _ in 0..count {
            match Self::read_entry(&mut r) {
                Ok(entry) => strings.push(entry),
                Err(e) if e.kind() == ErrorKind::Truncated => break,
                Err(e) => return Err(e),
            }
        }
        Ok(Self { strings })
    }

    fn read_entry(r: &mut ByteReader<'_>) -> Result<SharedString> {
        let start = r.clone();
        let digest = r.read_array::<16>()?;
        let content = r.read_n_bytes().inspect_err(|_| *r = start)?;
        Ok(SharedString::new(digest, content.to_vec()))
    }

    /// Serializes the table.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.strings.len())
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX shared strings".into()))?;
        let mut w = ByteWriter::new();
        w.write_u32_le(SHARED_STRING_CHUNK_VERSION);
        w.write_u32_le(count);
        for s in &self.strings {
            w.write_bytes(&s.digest);
            w.write_n_bytes(&s.content)?;
        }
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SharedStringChunk {
        SharedStringChunk {
            strings: vec![
                SharedString::new([1; 16], b"terrain blob".to_vec()),
                SharedString::new([2; 16], Vec::new()),
            ],
        }
    }

    #[test]
    fn parse_encoded() {
        let t = table();
        assert_eq!(SharedStringChunk::parse(&t.encode().unwrap()).unwrap(), t);
    }

    #[test]
    fn empty_table() {
        let bytes = SharedStringChunk::default().encode().unwrap();
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(SharedStringChunk::parse(&bytes).unwrap().strings.is_empty());
    }

    #[test]
    fn short_tail_ends_the_table() {
        let mut bytes = table().encode().unwrap();
        bytes.truncate(bytes.len() - 10);
        let parsed = SharedStringChunk::parse(&bytes).unwrap();
        assert_eq!(parsed.strings.len(), 1);
        assert_eq!(parsed.strings[0].content(), b"terrain blob");
    }

    #[test]
    fn version_must_be_zero() {
        let mut bytes = table().encode().unwrap();
        bytes[0] = 1;
        assert!(SharedStringChunk::parse(&bytes).is_err());
    }
}
