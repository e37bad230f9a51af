use std::sync::Arc;

use crate::error::Result;
use crate::io::{ByteReader, ByteWriter};
use crate::value::PropertyType;

/// A `PROP` chunk: one property column for the instances of one class.
///
/// The value column is kept verbatim; [`crate::value::decode_value`] interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChunk {
    /// Class id of the `INST` chunk this column belongs to.
    pub class_id: u32,
    /// Property name.
    pub name: String,
    /// Type of every value in the column.
    pub kind: PropertyType,
    /// Everything after the type byte.
    pub raw: Arc<[u8]>,
}

impl PropertyChunk {
    /// Parses a decompressed payload. Unknown type codes are kept, not rejected.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let class_id = r.read_u32_le()?;
        let name = r.read_n_string("property name")?.to_owned();
        let kind = PropertyType::from_code(r.read_u8()?);
        let raw = Arc::from(r.read_rest());
        Ok(Self {
            class_id,
            name,
            kind,
            raw,
        })
    }

    /// Serializes the header fields followed by the raw column.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::with_capacity(9 + self.name.len() + self.raw.len());
        w.write_u32_le(self.class_id);
        w.write_n_string(&self.name)?;
        w.write_u8(self.kind.code());
        w.write_bytes(&self.raw);
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn keeps_unknown_types_and_raw_bytes() {
        let original = PropertyChunk {
            class_id: 7,
            name: "Mystery".into(),
            kind: PropertyType::Unknown(0x42),
            raw: Arc::from(&[1u8, 2, 3, 4][..]),
        };
        let bytes = original.encode().unwrap();
        assert_eq!(PropertyChunk::parse(&bytes).unwrap(), original);
    }

    #[test]
    fn empty_column_is_allowed() {
        let original = PropertyChunk {
            class_id: 0,
            name: "Tags".into(),
            kind: PropertyType::String,
            raw: Arc::from(&[][..]),
        };
        let parsed = PropertyChunk::parse(&original.encode().unwrap()).unwrap();
        assert!(parsed.raw.is_empty());
    }

    #[test]
    fn missing_type_byte_is_truncated() {
        let mut w = ByteWriter::new();
        w.write_u32_le(0);
        w.write_n_string("Name").unwrap();
        let err = PropertyChunk::parse(&w.into_inner()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }
}
