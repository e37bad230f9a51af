//! Reading and writing container files on disk.
//!
//! [`Rbx`] opens files through a memory map and saves through a buffered writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::dom::Graph;
use crate::error::{RbxError, Result};
use crate::format::FILE_HEADER_SIZE;
use crate::options::{DecodeOptions, EncodeOptions};

/// File-level entry points.
#[derive(Debug)]
pub struct Rbx;

impl Rbx {
    /// Memory-maps a file and decodes it with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Graph> {
        Self::open_with(path, &DecodeOptions::default())
    }

    /// Memory-maps a file and decodes it.
    ///
    /// The graph owns all of its data; the mapping is released before returning.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<Graph> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < FILE_HEADER_SIZE as u64 {
            return Err(RbxError::Truncated {
                offset: 0,
                needed: FILE_HEADER_SIZE,
                available: file_size as usize,
            });
        }

        // Safety: the file could be modified by another process while mapped.
        // Decoding copies everything it keeps, so the map only lives for this call.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        debug!(path = %path.display(), file_size, "decoding file");
        crate::decode_with(&mmap, options)
    }

    /// Encodes a graph and writes it to `path` with default options.
    pub fn save<P: AsRef<Path>>(path: P, graph: &Graph) -> Result<()> {
        Self::save_with(path, graph, &EncodeOptions::default())
    }

    /// Encodes a graph and writes it to `path`, truncating any existing file.
    pub fn save_with<P: AsRef<Path>>(path: P, graph: &Graph, options: &EncodeOptions) -> Result<()> {
        let path = path.as_ref();

        // 1. Encode fully in memory so a failed encode leaves no partial file behind.
        let bytes = crate::encode_with(graph, options)?;

        // 2. Write and flush.
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        writer.flush()?;

        debug!(path = %path.display(), bytes = bytes.len(), "saved file");
        Ok(())
    }
}
