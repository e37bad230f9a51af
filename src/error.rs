//! Centralized error handling for rbxbin.
//!
//! Every failure in the decode and encode pipelines is represented as a [`RbxError`]
//! value. Nothing in the library panics on malformed input: a truncated buffer, a
//! corrupt LZ4 block or a dangling referent all surface as a structured error that
//! the caller can inspect.
//!
//! ## Error Categories
//!
//! - **Primitive reads** ([`RbxError::Truncated`], [`RbxError::InvalidBoolByte`],
//!   [`RbxError::InvalidUtf8`]): the cursor could not satisfy a bounded read.
//! - **Header validation** ([`RbxError::BadMagic`], [`RbxError::BadSignature`],
//!   [`RbxError::UnsupportedVersion`]).
//! - **Container layout** ([`RbxError::BadChunkLayout`], [`RbxError::Compression`]).
//! - **Payload post-conditions** ([`RbxError::CountMismatch`]).
//! - **Graph integrity** ([`RbxError::MissingRequiredChunk`],
//!   [`RbxError::DanglingReference`], [`RbxError::ReservedReferent`],
//!   [`RbxError::CyclicParent`], [`RbxError::NotFound`]).
//!
//! Failures raised while parsing a chunk payload are wrapped in
//! [`RbxError::InChunk`], which records the chunk index and tag. Use
//! [`RbxError::kind`] to match on the category regardless of that wrapping:
//!
//! ```rust
//! use rbxbin::{ErrorKind, decode};
//!
//! let err = decode(&[0u8; 48]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::BadMagic);
//!
//! let err = decode(b"<roblox!").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Truncated);
//! ```

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::format::ChunkTag;
use crate::referent::Referent;

/// A specialized `Result` type for rbxbin operations.
pub type Result<T> = std::result::Result<T, RbxError>;

/// The master error enum covering all failure domains.
///
/// The type is `Clone` so a failure captured on a rayon worker can be handed back
/// to the calling thread. I/O errors are wrapped in `Arc` for that reason.
#[derive(Debug, Clone, Error)]
pub enum RbxError {
    /// A bounded read asked for more bytes than remain in the buffer.
    /// The cursor is left where it was.
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        /// Cursor position at the time of the read.
        offset: usize,
        /// Bytes requested.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// The file does not start with the `<roblox!` magic literal.
    #[error("invalid magic bytes")]
    BadMagic,

    /// The six signature bytes following the magic are wrong.
    #[error("invalid file signature")]
    BadSignature,

    /// A versioned structure declared a version this decoder does not know.
    #[error("unsupported {what} version {version}")]
    UnsupportedVersion {
        /// Which structure carried the version field.
        what: &'static str,
        /// The version found.
        version: u32,
    },

    /// The declared chunk sizes disagree with the actual payload.
    #[error("bad chunk layout: {reason}")]
    BadChunkLayout {
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// A decoded element count disagrees with the declared count.
    #[error("{what}: expected {expected} entries, decoded {actual}")]
    CountMismatch {
        /// Which list failed the check.
        what: &'static str,
        /// Count declared on the wire.
        expected: usize,
        /// Count actually decoded.
        actual: usize,
    },

    /// A chunk the graph cannot be assembled without is absent.
    #[error("malformed file: no {0} chunk present")]
    MissingRequiredChunk(ChunkTag),

    /// A referent was used before (or without) being declared by an instance chunk.
    #[error("dangling reference to {referent} in {context}")]
    DanglingReference {
        /// The unresolved referent.
        referent: Referent,
        /// Where it was encountered.
        context: &'static str,
    },

    /// The root sentinel appeared where a real instance was expected.
    #[error("reserved referent {0} used as an instance identity")]
    ReservedReferent(Referent),

    /// Linking a child under a parent would make the parent chain loop.
    #[error("linking {child} under {parent} creates a parent cycle")]
    CyclicParent {
        /// The child being linked.
        child: Referent,
        /// The would-be parent.
        parent: Referent,
    },

    /// A boolean primitive held something other than `0x00` or `0x01`.
    #[error("cannot interpret byte {byte:#04x} at offset {offset} as bool")]
    InvalidBoolByte {
        /// Offset of the offending byte.
        offset: usize,
        /// The byte itself.
        byte: u8,
    },

    /// A string field that must be UTF-8 was not.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// A referent string could not be parsed as hex.
    #[error("invalid referent string {0:?}")]
    InvalidReferent(String),

    /// A lookup by referent found nothing.
    #[error("no instance with referent {0}")]
    NotFound(Referent),

    /// A value cannot be expressed in the wire format (encode side).
    #[error("cannot encode {0}")]
    Unrepresentable(String),

    /// The LZ4 block codec rejected the data.
    #[error("compression error: {0}")]
    Compression(String),

    /// Low-level I/O failure while opening or writing a file.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// A failure raised while parsing the payload of one chunk.
    #[error("chunk #{index} ({tag}): {source}")]
    InChunk {
        /// Position of the chunk in the container.
        index: usize,
        /// The chunk's type tag.
        tag: ChunkTag,
        /// The underlying failure.
        #[source]
        source: Box<RbxError>,
    },
}

/// Flat failure category of a [`RbxError`], with [`RbxError::InChunk`] unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`RbxError::Truncated`].
    Truncated,
    /// See [`RbxError::BadMagic`].
    BadMagic,
    /// See [`RbxError::BadSignature`].
    BadSignature,
    /// See [`RbxError::UnsupportedVersion`].
    UnsupportedVersion,
    /// See [`RbxError::BadChunkLayout`].
    BadChunkLayout,
    /// See [`RbxError::CountMismatch`].
    CountMismatch,
    /// See [`RbxError::MissingRequiredChunk`].
    MissingRequiredChunk,
    /// See [`RbxError::DanglingReference`].
    DanglingReference,
    /// See [`RbxError::ReservedReferent`].
    ReservedReferent,
    /// See [`RbxError::CyclicParent`].
    CyclicParent,
    /// See [`RbxError::InvalidBoolByte`].
    InvalidBoolByte,
    /// See [`RbxError::InvalidUtf8`].
    InvalidUtf8,
    /// See [`RbxError::InvalidReferent`].
    InvalidReferent,
    /// See [`RbxError::NotFound`].
    NotFound,
    /// See [`RbxError::Unrepresentable`].
    Unrepresentable,
    /// See [`RbxError::Compression`].
    Compression,
    /// See [`RbxError::Io`].
    Io,
}

impl RbxError {
    /// Returns the failure category, looking through chunk context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::BadMagic => ErrorKind::BadMagic,
            Self::BadSignature => ErrorKind::BadSignature,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::BadChunkLayout { .. } => ErrorKind::BadChunkLayout,
            Self::CountMismatch { .. } => ErrorKind::CountMismatch,
            Self::MissingRequiredChunk(_) => ErrorKind::MissingRequiredChunk,
            Self::DanglingReference { .. } => ErrorKind::DanglingReference,
            Self::ReservedReferent(_) => ErrorKind::ReservedReferent,
            Self::CyclicParent { .. } => ErrorKind::CyclicParent,
            Self::InvalidBoolByte { .. } => ErrorKind::InvalidBoolByte,
            Self::InvalidUtf8(_) => ErrorKind::InvalidUtf8,
            Self::InvalidReferent(_) => ErrorKind::InvalidReferent,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unrepresentable(_) => ErrorKind::Unrepresentable,
            Self::Compression(_) => ErrorKind::Compression,
            Self::Io(_) => ErrorKind::Io,
            Self::InChunk { source, .. } => source.kind(),
        }
    }

    /// Attaches chunk context to an error raised while parsing a payload.
    pub(crate) fn in_chunk(self, index: usize, tag: ChunkTag) -> Self {
        match self {
            // Already carries context; keep the innermost.
            Self::InChunk { .. } => self,
            other => Self::InChunk {
                index,
                tag,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn layout(reason: impl Into<String>) -> Self {
        Self::BadChunkLayout {
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for RbxError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
