//! The Write-Side Engine.
//!
//! Turns a [`Graph`] back into a container and a container back into bytes. Chunk
//! payloads are built sequentially (they depend on a shared class numbering), then
//! compressed independently on the rayon pool, then written in order.

use std::collections::HashMap;
use std::io::Write;

use rayon::prelude::*;
use tracing::debug;

use crate::chunks::{InstanceChunk, ParentChunk, PropertyChunk, SharedStringChunk};
use crate::compression;
use crate::dom::{Graph, Instance, Property};
use crate::error::{RbxError, Result};
use crate::format::{CHUNK_HEADER_SIZE, ChunkHeader, ChunkTag, END_CHUNK_PAYLOAD, FILE_HEADER_SIZE, FileHeader};
use crate::io::ByteWriter;
use crate::options::EncodeOptions;
use crate::reader::{Chunk, Container};
use crate::value::{PropertyValue, encode_column};

/// A chunk ready to be written: header sizes filled in, payload possibly compressed.
struct PackedChunk {
    header: ChunkHeader,
    stored: Vec<u8>,
}

impl Container<'_> {
    /// Serialises the container, compressing payloads per `options`.
    ///
    /// The `END` chunk is always stored raw.
    pub fn to_bytes(&self, options: &EncodeOptions) -> Result<Vec<u8>> {
        let packed = pack_chunks(self.chunks(), options)?;

        let total = FILE_HEADER_SIZE
            + packed
                .iter()
                .map(|p| CHUNK_HEADER_SIZE + p.stored.len())
                .sum::<usize>();
        let mut w = ByteWriter::with_capacity(total);
        self.header().write(&mut w);
        for chunk in &packed {
            chunk.header.write(&mut w);
            w.write_bytes(&chunk.stored);
        }
        Ok(w.into_inner())
    }

    /// Serialises the container into `out`.
    pub fn write_to<W: Write>(&self, out: &mut W, options: &EncodeOptions) -> Result<()> {
        let bytes = self.to_bytes(options)?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

fn pack_chunks(chunks: &[Chunk<'_>], options: &EncodeOptions) -> Result<Vec<PackedChunk>> {
    let pack = |chunk: &Chunk<'_>| pack_one(chunk, options.compress);
    if options.parallel {
        chunks.par_iter().map(pack).collect()
    } else {
        chunks.iter().map(pack).collect()
    }
}

fn pack_one(chunk: &Chunk<'_>, compress: bool) -> Result<PackedChunk> {
    let payload = chunk.payload();
    let uncompressed_size = u32::try_from(payload.len())
        .map_err(|_| RbxError::Unrepresentable(format!("{} chunk over 4 GiB", chunk.tag())))?;

    let packed = if compress && chunk.tag() != ChunkTag::End {
        compression::shrink(payload).map_err(|e| e.in_chunk(chunk.index(), chunk.tag()))?
    } else {
        None
    };

    let (compressed_size, stored) = match packed {
        // Smaller than the payload, so it fits in u32 as well.
        Some(block) => (block.len() as u32, block),
        None => (0, payload.to_vec()),
    };
    Ok(PackedChunk {
        header: ChunkHeader {
            tag: chunk.tag(),
            compressed_size,
            uncompressed_size,
            reserved: [0; 4],
        },
        stored,
    })
}

/// Encodes a graph with default options.
pub fn encode(graph: &Graph) -> Result<Vec<u8>> {
    encode_with(graph, &EncodeOptions::default())
}

/// Encodes a graph into a complete file.
///
/// One instance chunk is written per class name, in the order classes first appear
/// in the graph. Every instance of a class must carry the same property names.
/// Signature records are not written.
pub fn encode_with(graph: &Graph, options: &EncodeOptions) -> Result<Vec<u8>> {
    build_container(graph)?.to_bytes(options)
}

/// Builds the chunk list for a graph.
pub fn build_container(graph: &Graph) -> Result<Container<'static>> {
    // 1. Group instances by class name, keeping first-appearance order.
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Instance>> = HashMap::new();
    for instance in graph.instances() {
        groups
            .entry(instance.class_name())
            .or_insert_with(|| {
                order.push(instance.class_name());
                Vec::new()
            })
            .push(instance);
    }

    let mut instance_chunks = Vec::with_capacity(order.len());
    let mut property_chunks = Vec::new();
    for (class_id, class_name) in order.iter().enumerate() {
        let members = &groups[class_name];
        let class_id = u32::try_from(class_id)
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX classes".into()))?;

        // 2. Declare the class.
        let is_service = members.iter().any(|m| m.is_service());
        let inst = InstanceChunk {
            class_id,
            class_name: (*class_name).to_owned(),
            is_service,
            referents: members.iter().map(|m| m.referent()).collect(),
            service_markers: if is_service {
                members.iter().map(|m| m.is_service()).collect()
            } else {
                Vec::new()
            },
        };
        instance_chunks.push(Chunk::new(ChunkTag::Instance, inst.encode()?));

        // 3. One column per property name.
        for name in property_names(members) {
            let prop = property_column(class_id, class_name, &name, members)?;
            property_chunks.push(Chunk::new(ChunkTag::Property, prop.encode()?));
        }
    }

    // 4. Links, parent by parent so sibling order survives.
    let mut links = ParentChunk::default();
    for parent in std::iter::once(graph.root()).chain(graph.instances()) {
        for child in graph.children(parent) {
            links.children.push(child.referent());
            links.parents.push(parent.referent());
        }
    }

    let shared = SharedStringChunk {
        strings: graph.shared_strings().to_vec(),
    };

    let header = FileHeader {
        class_count: i32::try_from(order.len())
            .map_err(|_| RbxError::Unrepresentable("class count over i32::MAX".into()))?,
        instance_count: i32::try_from(graph.len())
            .map_err(|_| RbxError::Unrepresentable("instance count over i32::MAX".into()))?,
        reserved: graph.header().reserved,
    };

    let mut chunks = Vec::with_capacity(instance_chunks.len() + property_chunks.len() + 3);
    chunks.push(Chunk::new(ChunkTag::SharedString, shared.encode()?));
    chunks.extend(instance_chunks);
    chunks.extend(property_chunks);
    chunks.push(Chunk::new(ChunkTag::Parent, links.encode()?));
    chunks.push(Chunk::new(ChunkTag::End, END_CHUNK_PAYLOAD));

    debug!(
        classes = order.len(),
        instances = graph.len(),
        chunks = chunks.len(),
        "built container"
    );
    Ok(Container::from_parts(header, chunks))
}

/// Union of the members' property names, in first-seen order.
fn property_names(members: &[&Instance]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for member in members {
        for (name, _) in member.properties() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
    }
    names
}

fn property_column(class_id: u32, class_name: &str, name: &str, members: &[&Instance]) -> Result<PropertyChunk> {
    let props = members
        .iter()
        .map(|m| {
            m.get_property(name).ok_or_else(|| {
                RbxError::Unrepresentable(format!(
                    "{class_name} {} has no {name} but others of its class do",
                    m.referent()
                ))
            })
        })
        .collect::<Result<Vec<&Property>>>()?;

    let first = props[0];
    if let Some(other) = props.iter().find(|p| p.kind() != first.kind()) {
        return Err(RbxError::Unrepresentable(format!(
            "{class_name}.{name} mixes {} and {} values",
            first.kind(),
            other.kind()
        )));
    }

    // Columns that came from one chunk in slot order are written back verbatim.
    let verbatim = props
        .iter()
        .enumerate()
        .all(|(i, p)| p.shares_column(first) && p.slot() == i);
    let raw = if verbatim {
        first.column().clone()
    } else {
        let values = props
            .iter()
            .map(|p| {
                p.value()?.ok_or_else(|| {
                    RbxError::Unrepresentable(format!(
                        "{class_name}.{name}: {} values cannot be regrouped",
                        p.kind()
                    ))
                })
            })
            .collect::<Result<Vec<PropertyValue>>>()?;
        encode_column(first.kind(), &values)?.into()
    };

    Ok(PropertyChunk {
        class_id,
        name: name.to_owned(),
        kind: first.kind(),
        raw,
    })
}
