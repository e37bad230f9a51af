//! # rbxbin
//!
//! A decoder and encoder for the chunked binary container used to persist place and
//! model files: a tree of typed instances with named properties.
//!
//! ## Overview
//!
//! A file is a 32-byte header followed by a sequence of chunks. Each chunk carries a
//! four-byte tag, its sizes and a payload that is either stored raw or as a single
//! LZ4 block. Decoding runs in three layers:
//!
//! 1. **Container** ([`Container`]): validates the header, walks the chunk stream up
//!    to the `END` chunk and decompresses payloads, on the rayon pool by default.
//! 2. **Payload parsers** ([`chunks`]): one parser per chunk type. `INST` declares a
//!    class and its instances, `PROP` carries one property column for a class,
//!    `PRNT` holds the parent links and `SSTR` the shared-string table.
//! 3. **Graph assembly** ([`Graph`]): instances are created first, then properties
//!    are attached by class id, then parent links are wired in list order.
//!
//! Integer arrays throughout the format use the same transform: byte planes are
//! interleaved, values are zigzag-encoded and identifier lists are delta-encoded.
//! See [`interleave`].
//!
//! ## Storage Contract
//!
//! Property values are kept as the raw column bytes of their chunk, shared between
//! the instances of a class. [`Property::value`] decodes one instance's slot for the
//! types the [`value`] module understands; everything else stays available raw.
//! Unknown chunk tags and property type codes are never fatal: they are retained
//! and reported through [`Graph::warnings`].
//!
//! ## Quick Start
//!
//! ```rust
//! use rbxbin::{Graph, Property, PropertyValue, Referent, decode, encode};
//!
//! let mut graph = Graph::new();
//! let part = Referent::new(1);
//! graph.insert(part, "Part", Some(Referent::ROOT))?;
//! let name = Property::from_value(&PropertyValue::String(b"Baseplate".to_vec()))?;
//! graph.set_property(part, "Name", name)?;
//!
//! let bytes = encode(&graph)?;
//! let decoded = decode(&bytes)?;
//!
//! let root = decoded.root();
//! assert_eq!(root.child_ids().len(), 1);
//! let child = decoded.get_instance(part)?;
//! assert_eq!(
//!     decoded.property_value(child, "Name")?,
//!     Some(PropertyValue::String(b"Baseplate".to_vec()))
//! );
//! # Ok::<(), rbxbin::RbxError>(())
//! ```
//!
//! ## Concurrency
//!
//! A decode shares no state with any other decode, so separate files can be decoded
//! on separate threads freely. Within one decode, chunk decompression and payload
//! parsing are independent per chunk; the assembly passes run strictly in order.
//! Set [`DecodeOptions::parallel`] to `false` for a fully sequential decode.
//!
//! ## Logging
//!
//! The crate emits `tracing` events (`debug` per chunk, `trace` per assembly pass,
//! `warn` for retained-but-unrecognised data) and never installs a subscriber.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic, missing_docs))]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod chunks;
pub mod compression;
pub mod dom;
pub mod error;
pub mod format;
pub mod inspector;
pub mod interleave;
pub mod options;
pub mod reader;
pub mod referent;
pub mod value;
pub mod writer;

// --- INTERNAL IMPLEMENTATION MODULES (Hidden from Docs) ---
#[doc(hidden)]
pub mod io;

// --- RE-EXPORTS ---

pub use api::Rbx;
pub use compression::{Compressor, Lz4Compressor, NoCompression};
pub use dom::{DecodeWarning, Graph, Instance, InstanceId, Property};
pub use error::{ErrorKind, RbxError, Result};
pub use format::{ChunkTag, FileHeader};
pub use inspector::{ContainerReport, Inspector};
pub use options::{DecodeOptions, EncodeOptions};
pub use reader::{Chunk, Container};
pub use referent::Referent;
pub use value::{PropertyType, PropertyValue};
pub use writer::{encode, encode_with};

/// Decodes a fully buffered file with default options.
pub fn decode(bytes: &[u8]) -> Result<Graph> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decodes a fully buffered file.
///
/// Any structural failure rejects the whole file; there is no partial graph.
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<Graph> {
    let container = Container::parse_with(bytes, options)?;
    dom::assemble::assemble(&container, options)
}
