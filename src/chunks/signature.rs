use crate::error::{RbxError, Result};
use crate::io::{ByteReader, ByteWriter};

/// One record of a `SIGN` chunk. Only the id and content are surfaced; the two
/// four-byte words around the id are opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Signature id.
    pub id: u32,
    /// Signature bytes.
    pub content: Vec<u8>,
}

/// The `SIGN` chunk. Retained for callers; never consumed by graph assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureChunk {
    /// Records in file order.
    pub signatures: Vec<Signature>,
}

impl SignatureChunk {
    /// Parses a decompressed payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let count = r.read_u32_le()? as usize;
        let mut signatures = Vec::with_capacity(count.min(r.remaining() / 16));
        for _ in 0..count {
            r.read_bytes(4)?;
            let id = r.read_u32_le()?;
            r.read_bytes(4)?;
            let content = r.read_n_bytes()?.to_vec();
            signatures.push(Signature { id, content });
        }
        Ok(Self { signatures })
    }

    /// Writes the records back with the opaque words zeroed.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u32::try_from(self.signatures.len())
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX signatures".into()))?;
        let mut w = ByteWriter::new();
        w.write_u32_le(count);
        for s in &self.signatures {
            w.write_u32_le(0);
            w.write_u32_le(s.id);
            w.write_u32_le(0);
            w.write_n_bytes(&s.content)?;
        }
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn records_survive() {
        let chunk = SignatureChunk {
            signatures: vec![Signature {
                id: 0x1234,
                content: vec![9; 64],
            }],
        };
        assert_eq!(SignatureChunk::parse(&chunk.encode().unwrap()).unwrap(), chunk);
    }

    #[test]
    fn truncated_record_fails() {
        let mut bytes = SignatureChunk {
            signatures: vec![Signature {
                id: 1,
                content: vec![1, 2, 3],
            }],
        }
        .encode()
        .unwrap();
        bytes.pop();
        assert_eq!(
            SignatureChunk::parse(&bytes).unwrap_err().kind(),
            ErrorKind::Truncated
        );
    }
}
