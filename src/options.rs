//! Decode and encode configuration.
//!
//! Both option structs are plain data with `serde` support so a host application
//! can keep them in its own configuration file.

use serde::{Deserialize, Serialize};

/// Default upper bound on a single chunk's uncompressed size (256 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 256 * 1024 * 1024;

/// Settings for [`crate::decode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Decompress and parse chunk payloads on the rayon pool.
    pub parallel: bool,
    /// Chunks declaring a larger uncompressed size are rejected before allocation.
    pub max_chunk_size: usize,
    /// Check the header's class and instance counts against the instance chunks.
    pub verify_header_counts: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            verify_header_counts: false,
        }
    }
}

impl DecodeOptions {
    /// Toggles the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Caps the declared size of a single chunk payload.
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    /// Rejects files whose header counts disagree with the decoded graph.
    pub fn with_verify_header_counts(mut self, verify: bool) -> Self {
        self.verify_header_counts = verify;
        self
    }
}

/// Settings for [`crate::encode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// LZ4-compress chunk payloads when that makes them smaller.
    pub compress: bool,
    /// Compress chunks on the rayon pool.
    pub parallel: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            compress: true,
            parallel: true,
        }
    }
}

impl EncodeOptions {
    /// Toggles LZ4 compression of payloads.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Toggles the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
