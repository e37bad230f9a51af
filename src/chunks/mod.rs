//! Chunk payload parsers.
//!
//! One decoder (and its mirrored encoder) per recognised chunk type. Parsers are
//! independent of each other and of chunk order; joining them into a graph is the
//! job of [`crate::dom`].

/// `INST` chunks.
pub mod instance;
/// `PRNT` chunks.
pub mod parent;
/// `PROP` chunks.
pub mod property;
/// `SSTR` chunks.
pub mod shared_string;
/// `SIGN` chunks.
pub mod signature;

pub use instance::InstanceChunk;
pub use parent::ParentChunk;
pub use property::PropertyChunk;
pub use shared_string::{SharedString, SharedStringChunk};
pub use signature::{Signature, SignatureChunk};

use crate::error::Result;
use crate::format::ChunkTag;
use crate::reader::Chunk;

/// A chunk payload decoded according to its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkPayload {
    /// `INST`.
    Instance(InstanceChunk),
    /// `PROP`.
    Property(PropertyChunk),
    /// `PRNT`.
    Parent(ParentChunk),
    /// `SSTR`.
    SharedString(SharedStringChunk),
    /// `SIGN`.
    Signature(SignatureChunk),
    /// The terminator; its payload is not interpreted.
    End,
    /// A tag this decoder does not know. The raw payload stays on the [`Chunk`].
    Unknown([u8; 4]),
}

impl ChunkPayload {
    /// Decodes a chunk's payload. Errors carry the chunk index and tag.
    pub fn parse(chunk: &Chunk<'_>) -> Result<Self> {
        let payload = chunk.payload();
        let parsed = match chunk.tag() {
            ChunkTag::Instance => InstanceChunk::parse(payload).map(Self::Instance),
            ChunkTag::Property => PropertyChunk::parse(payload).map(Self::Property),
            ChunkTag::Parent => ParentChunk::parse(payload).map(Self::Parent),
            ChunkTag::SharedString => SharedStringChunk::parse(payload).map(Self::SharedString),
            ChunkTag::Signature => SignatureChunk::parse(payload).map(Self::Signature),
            ChunkTag::End => Ok(Self::End),
            ChunkTag::Unknown(raw) => Ok(Self::Unknown(raw)),
        };
        parsed.map_err(|e| e.in_chunk(chunk.index(), chunk.tag()))
    }

    /// The tag this payload is written under.
    pub fn tag(&self) -> ChunkTag {
        match self {
            Self::Instance(_) => ChunkTag::Instance,
            Self::Property(_) => ChunkTag::Property,
            Self::Parent(_) => ChunkTag::Parent,
            Self::SharedString(_) => ChunkTag::SharedString,
            Self::Signature(_) => ChunkTag::Signature,
            Self::End => ChunkTag::End,
            Self::Unknown(raw) => ChunkTag::Unknown(*raw),
        }
    }
}
