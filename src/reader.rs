//! The Read-Side Engine.
//!
//! Splits a fully buffered file into its header and ordered chunk list, expanding
//! compressed payloads along the way. Payloads stored raw are borrowed straight from
//! the input buffer; only LZ4 blocks allocate.

use std::borrow::Cow;

use rayon::prelude::*;
use tracing::debug;

use crate::compression;
use crate::error::{RbxError, Result};
use crate::format::{ChunkHeader, ChunkTag, FileHeader};
use crate::io::ByteReader;
use crate::options::DecodeOptions;

/// One record of the container with its payload already decompressed.
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    index: usize,
    header: ChunkHeader,
    payload: Cow<'a, [u8]>,
}

impl<'a> Chunk<'a> {
    /// Creates a chunk for writing. Position and sizes are assigned by the writer.
    pub fn new(tag: ChunkTag, payload: impl Into<Cow<'a, [u8]>>) -> Self {
        let payload = payload.into();
        Self {
            index: 0,
            header: ChunkHeader {
                tag,
                compressed_size: 0,
                uncompressed_size: u32::try_from(payload.len()).unwrap_or(u32::MAX),
                reserved: [0; 4],
            },
            payload,
        }
    }

    /// Position of the chunk in the container.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The chunk type.
    pub fn tag(&self) -> ChunkTag {
        self.header.tag
    }

    /// The header as it was read from the file.
    pub fn header(&self) -> &ChunkHeader {
        &self.header
    }

    /// The decompressed payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Detaches the chunk from the input buffer.
    pub fn into_owned(self) -> Chunk<'static> {
        Chunk {
            index: self.index,
            header: self.header,
            payload: Cow::Owned(self.payload.into_owned()),
        }
    }
}

/// A parsed container: header plus every chunk up to and including `END`.
#[derive(Debug, Clone)]
pub struct Container<'a> {
    header: FileHeader,
    chunks: Vec<Chunk<'a>>,
}

/// A chunk located in the input but not yet expanded.
struct StoredChunk<'a> {
    index: usize,
    header: ChunkHeader,
    stored: &'a [u8],
}

impl<'a> Container<'a> {
    /// Parses a container with default options.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        Self::parse_with(data, &DecodeOptions::default())
    }

    /// Parses a container.
    ///
    /// The chunk loop stops after the `END` chunk. Running out of input before it is
    /// reached fails with [`RbxError::Truncated`]; bytes after it are ignored.
    pub fn parse_with(data: &'a [u8], options: &DecodeOptions) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let header = FileHeader::read(&mut reader)?;

        // 1. Locate every chunk (cheap, sequential).
        let mut stored = Vec::new();
        loop {
            let index = stored.len();
            let chunk_header = ChunkHeader::read(&mut reader)?;
            if chunk_header.uncompressed_size as usize > options.max_chunk_size {
                return Err(RbxError::layout(format!(
                    "chunk declares {} bytes, limit is {}",
                    chunk_header.uncompressed_size, options.max_chunk_size
                ))
                .in_chunk(index, chunk_header.tag));
            }
            let bytes = reader
                .read_bytes(chunk_header.stored_size())
                .map_err(|e| e.in_chunk(index, chunk_header.tag))?;

            debug!(
                index,
                tag = %chunk_header.tag,
                compressed = chunk_header.compressed_size,
                uncompressed = chunk_header.uncompressed_size,
                "located chunk"
            );

            stored.push(StoredChunk {
                index,
                header: chunk_header,
                stored: bytes,
            });
            if chunk_header.tag == ChunkTag::End {
                break;
            }
        }

        // 2. Expand payloads, in parallel when allowed.
        let chunks = if options.parallel {
            stored.into_par_iter().map(StoredChunk::expand).collect::<Result<Vec<_>>>()?
        } else {
            stored.into_iter().map(StoredChunk::expand).collect::<Result<Vec<_>>>()?
        };

        Ok(Self { header, chunks })
    }

    /// Assembles a container from parts, for writing.
    pub fn from_parts(header: FileHeader, chunks: Vec<Chunk<'a>>) -> Self {
        let chunks = chunks
            .into_iter()
            .enumerate()
            .map(|(index, mut chunk)| {
                chunk.index = index;
                chunk
            })
            .collect();
        Self { header, chunks }
    }

    /// The parsed file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// All chunks in file order, `END` included.
    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    /// Chunks carrying the given tag, in file order.
    pub fn chunks_of(&self, tag: ChunkTag) -> impl Iterator<Item = &Chunk<'a>> + '_ {
        self.chunks.iter().filter(move |c| c.tag() == tag)
    }

    /// Returns true if the stream ended with an `END` chunk.
    pub fn is_terminated(&self) -> bool {
        self.chunks.last().is_some_and(|c| c.tag() == ChunkTag::End)
    }

    /// Detaches every chunk from the input buffer.
    pub fn into_owned(self) -> Container<'static> {
        Container {
            header: self.header,
            chunks: self.chunks.into_iter().map(Chunk::into_owned).collect(),
        }
    }
}

impl<'a> StoredChunk<'a> {
    fn expand(self) -> Result<Chunk<'a>> {
        let payload = compression::expand(
            self.stored,
            self.header.compressed_size,
            self.header.uncompressed_size,
        )
        .map_err(|e| e.in_chunk(self.index, self.header.tag))?;
        Ok(Chunk {
            index: self.index,
            header: self.header,
            payload,
        })
    }
}
