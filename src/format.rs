//! Defines the physical binary layout of the container.
//!
//! # Layout
//! The file is a fixed 32-byte header followed by a sequence of chunks, terminated
//! by an `END` chunk:
//!
//! `[File Header] [Chunk 0] [Chunk 1] ... [END Chunk]`
//!
//! ## Chunk Anatomy
//! Each chunk is a 16-byte header and its payload:
//! `[ Tag(4) | CompressedSize(4) | UncompressedSize(4) | Reserved(4) ] [ Payload ]`
//!
//! A compressed size of zero means the payload is stored as-is and is
//! `UncompressedSize` bytes long. Otherwise it is a raw LZ4 block of
//! `CompressedSize` bytes that expands to exactly `UncompressedSize` bytes.
//! All integers are little-endian.

use std::fmt;

use crate::error::{RbxError, Result};
use crate::io::{ByteReader, ByteWriter};

/// Magic bytes opening every binary file.
pub const MAGIC_BYTES: [u8; 8] = *b"<roblox!";

/// Fixed signature following the magic.
pub const SIGNATURE_BYTES: [u8; 6] = [0x89, 0xFF, 0x0D, 0x0A, 0x1A, 0x0A];

/// The only known container version.
pub const FORMAT_VERSION: u16 = 0;

/// Magic(8) + Signature(6) + Version(2) + ClassCount(4) + InstanceCount(4) + Reserved(8) = 32
pub const FILE_HEADER_SIZE: usize = 32;

/// Tag(4) + CompressedSize(4) + UncompressedSize(4) + Reserved(4) = 16
pub const CHUNK_HEADER_SIZE: usize = 16;

/// Payload written into the terminating chunk by the encoder.
pub const END_CHUNK_PAYLOAD: &[u8] = b"</roblox>";

/// The validated file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Number of distinct classes (instance chunks) the writer declared.
    pub class_count: i32,
    /// Number of instances the writer declared.
    pub instance_count: i32,
    /// Reserved trailing bytes, kept verbatim.
    pub reserved: [u8; 8],
}

impl FileHeader {
    /// Creates a header with zeroed reserved bytes.
    pub fn new(class_count: i32, instance_count: i32) -> Self {
        Self {
            class_count,
            instance_count,
            reserved: [0; 8],
        }
    }

    /// Reads and validates the 32-byte preamble.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let raw = reader.read_bytes(FILE_HEADER_SIZE)?;
        let mut r = ByteReader::new(raw);

        if r.read_array::<8>()? != MAGIC_BYTES {
            return Err(RbxError::BadMagic);
        }
        if r.read_array::<6>()? != SIGNATURE_BYTES {
            return Err(RbxError::BadSignature);
        }
        let version = r.read_u16_le()?;
        if version != FORMAT_VERSION {
            return Err(RbxError::UnsupportedVersion {
                what: "file",
                version: u32::from(version),
            });
        }

        Ok(Self {
            class_count: r.read_i32_le()?,
            instance_count: r.read_i32_le()?,
            reserved: r.read_array()?,
        })
    }

    /// Writes the 32-byte preamble.
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&MAGIC_BYTES);
        writer.write_bytes(&SIGNATURE_BYTES);
        writer.write_u16_le(FORMAT_VERSION);
        writer.write_i32_le(self.class_count);
        writer.write_i32_le(self.instance_count);
        writer.write_bytes(&self.reserved);
    }
}

/// The type tag of a chunk.
///
/// Recognised tags get their own variant; anything else is kept as
/// [`ChunkTag::Unknown`] with the raw four bytes so it can be written back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// `SSTR`: the shared-string table.
    SharedString,
    /// `INST`: one class and the referents of its instances.
    Instance,
    /// `PROP`: one property column for one class.
    Property,
    /// `PRNT`: parent/child links.
    Parent,
    /// `SIGN`: signing metadata.
    Signature,
    /// `END\0`: terminates the chunk stream.
    End,
    /// Any tag this decoder does not interpret.
    Unknown([u8; 4]),
}

impl ChunkTag {
    /// Classifies a raw tag. Trailing NUL padding is ignored.
    pub fn from_bytes(raw: [u8; 4]) -> Self {
        let len = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        match &raw[..len] {
            b"SSTR" => Self::SharedString,
            b"INST" => Self::Instance,
            b"PROP" => Self::Property,
            b"PRNT" => Self::Parent,
            b"SIGN" => Self::Signature,
            b"END" => Self::End,
            _ => Self::Unknown(raw),
        }
    }

    /// The four bytes written on the wire.
    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::SharedString => *b"SSTR",
            Self::Instance => *b"INST",
            Self::Property => *b"PROP",
            Self::Parent => *b"PRNT",
            Self::Signature => *b"SIGN",
            Self::End => *b"END\0",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns true for tags with a dedicated variant.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.to_bytes();
        let trimmed = raw
            .iter()
            .rposition(|&b| b != 0)
            .map_or(&raw[..0], |end| &raw[..=end]);
        for &b in trimmed {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// The 16-byte header preceding each chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Type tag.
    pub tag: ChunkTag,
    /// Size of the stored LZ4 block, or 0 when the payload is stored raw.
    pub compressed_size: u32,
    /// Size of the payload once decompressed.
    pub uncompressed_size: u32,
    /// Reserved bytes, kept verbatim.
    pub reserved: [u8; 4],
}

impl ChunkHeader {
    /// Returns true if the payload is an LZ4 block.
    pub fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// Number of payload bytes stored after the header.
    pub fn stored_size(&self) -> usize {
        if self.is_compressed() {
            self.compressed_size as usize
        } else {
            self.uncompressed_size as usize
        }
    }

    /// Reads the fixed 16-byte chunk header.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let raw = reader.read_bytes(CHUNK_HEADER_SIZE)?;
        let mut r = ByteReader::new(raw);
        Ok(Self {
            tag: ChunkTag::from_bytes(r.read_array()?),
            compressed_size: r.read_u32_le()?,
            uncompressed_size: r.read_u32_le()?,
            reserved: r.read_array()?,
        })
    }

    /// Writes the header in wire layout.
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.tag.to_bytes());
        writer.write_u32_le(self.compressed_size);
        writer.write_u32_le(self.uncompressed_size);
        writer.write_bytes(&self.reserved);
    }
}
