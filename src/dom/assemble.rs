use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::chunks::{ChunkPayload, InstanceChunk, ParentChunk, PropertyChunk, SharedStringChunk, SignatureChunk};
use crate::dom::{Graph, InstanceId, Property};
use crate::error::{RbxError, Result};
use crate::format::ChunkTag;
use crate::options::DecodeOptions;
use crate::reader::Container;

/// A recoverable condition met while decoding. The data involved is kept raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// A chunk with a tag this decoder does not recognise. Its payload is retained
    /// on the [`Container`] but not interpreted.
    UnknownChunkType {
        /// Position of the chunk in the file.
        index: usize,
        /// The raw tag.
        tag: [u8; 4],
    },
    /// A property column whose type code is not recognised.
    UnknownPropertyType {
        /// Class the column belongs to.
        class_name: String,
        /// Property name.
        property: String,
        /// The unrecognised type code.
        code: u8,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChunkType { index, tag } => {
                write!(f, "chunk {index}: unknown chunk type {}", ChunkTag::Unknown(*tag))
            }
            Self::UnknownPropertyType {
                class_name,
                property,
                code,
            } => write!(f, "{class_name}.{property}: unknown property type 0x{code:02x}"),
        }
    }
}

/// Chunk payloads sorted by role.
#[derive(Default)]
struct Parts {
    instances: Vec<InstanceChunk>,
    properties: Vec<PropertyChunk>,
    parent: Option<ParentChunk>,
    shared_strings: Option<SharedStringChunk>,
    signatures: Option<SignatureChunk>,
    unknown: Vec<(usize, [u8; 4])>,
}

/// The instances of each class id. A member's index is its slot in the class's columns.
type ClassIndex = HashMap<u32, ClassEntry>;

struct ClassEntry {
    class_name: Arc<str>,
    members: Vec<InstanceId>,
}

/// Builds the instance graph from a parsed container.
///
/// Payloads are parsed first (on the rayon pool when `options.parallel` is set), then
/// the identity, property and linkage passes run strictly in that order.
pub(crate) fn assemble(container: &Container<'_>, options: &DecodeOptions) -> Result<Graph> {
    let payloads = if options.parallel {
        container
            .chunks()
            .par_iter()
            .map(ChunkPayload::parse)
            .collect::<Result<Vec<_>>>()?
    } else {
        container
            .chunks()
            .iter()
            .map(ChunkPayload::parse)
            .collect::<Result<Vec<_>>>()?
    };

    let parts = partition(container, payloads);
    let parent = parts.parent.ok_or(RbxError::MissingRequiredChunk(ChunkTag::Parent))?;
    let shared_strings = parts
        .shared_strings
        .ok_or(RbxError::MissingRequiredChunk(ChunkTag::SharedString))?;

    let mut graph = Graph::new();
    graph.set_header(*container.header());
    for (index, tag) in parts.unknown {
        warn!(index, tag = %ChunkTag::Unknown(tag), "retaining chunk with unknown type");
        graph.push_warning(DecodeWarning::UnknownChunkType { index, tag });
    }

    let classes = identity_pass(&mut graph, &parts.instances)?;
    if options.verify_header_counts {
        verify_header_counts(&graph, parts.instances.len())?;
    }
    property_pass(&mut graph, &classes, parts.properties);
    linkage_pass(&mut graph, &parent)?;

    graph.set_shared_strings(shared_strings.strings);
    if let Some(signatures) = parts.signatures {
        graph.set_signatures(signatures.signatures);
    }

    debug!(
        instances = graph.len(),
        classes = classes.len(),
        links = parent.len(),
        "assembled graph"
    );
    Ok(graph)
}

fn partition(container: &Container<'_>, payloads: Vec<ChunkPayload>) -> Parts {
    let mut parts = Parts::default();
    for (chunk, payload) in container.chunks().iter().zip(payloads) {
        match payload {
            ChunkPayload::Instance(inst) => parts.instances.push(inst),
            ChunkPayload::Property(prop) => parts.properties.push(prop),
            ChunkPayload::Parent(prnt) => {
                if parts.parent.replace(prnt).is_some() {
                    warn!(index = chunk.index(), "multiple parent chunks, keeping the last");
                }
            }
            ChunkPayload::SharedString(sstr) => {
                if parts.shared_strings.replace(sstr).is_some() {
                    warn!(index = chunk.index(), "multiple shared string chunks, keeping the last");
                }
            }
            ChunkPayload::Signature(sign) => parts.signatures = Some(sign),
            ChunkPayload::End => {}
            ChunkPayload::Unknown(tag) => parts.unknown.push((chunk.index(), tag)),
        }
    }
    parts
}

/// Creates one instance per new referent and indexes it under its chunk's class id.
///
/// Chunks sharing a class id extend one list; a referent's column slot is its
/// position in that list. Referents already declared are skipped entirely.
fn identity_pass(graph: &mut Graph, chunks: &[InstanceChunk]) -> Result<ClassIndex> {
    let mut classes = ClassIndex::with_capacity(chunks.len());
    for chunk in chunks {
        let entry = classes.entry(chunk.class_id).or_insert_with(|| ClassEntry {
            class_name: Arc::from(chunk.class_name.as_str()),
            members: Vec::with_capacity(chunk.referents.len()),
        });
        let class_name: Arc<str> = Arc::from(chunk.class_name.as_str());

        for &referent in &chunk.referents {
            if referent.is_root() {
                return Err(RbxError::ReservedReferent(referent));
            }
            if graph.resolve(referent).is_some() {
                trace!(%referent, class = %class_name, "referent already declared");
                continue;
            }
            let id = graph.add_instance(referent, Arc::clone(&class_name))?;
            graph.instance_mut(id).is_service = chunk.is_service;
            entry.members.push(id);
        }

        trace!(
            class_id = chunk.class_id,
            class = %class_name,
            count = entry.members.len(),
            "identity pass"
        );
    }
    Ok(classes)
}

fn verify_header_counts(graph: &Graph, instance_chunks: usize) -> Result<()> {
    let header = graph.header();
    let checks = [
        ("header class count", header.class_count, instance_chunks),
        ("header instance count", header.instance_count, graph.len()),
    ];
    for (what, declared, actual) in checks {
        let expected = usize::try_from(declared).unwrap_or(usize::MAX);
        if expected != actual {
            return Err(RbxError::CountMismatch {
                what,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Attaches each property column to every instance of its class.
fn property_pass(graph: &mut Graph, classes: &ClassIndex, chunks: Vec<PropertyChunk>) {
    for chunk in chunks {
        let Some(entry) = classes.get(&chunk.class_id) else {
            trace!(class_id = chunk.class_id, property = %chunk.name, "no instances for class id");
            continue;
        };

        if !chunk.kind.is_known() {
            let code = chunk.kind.code();
            warn!(class = %entry.class_name, property = %chunk.name, code, "unknown property type");
            graph.push_warning(DecodeWarning::UnknownPropertyType {
                class_name: entry.class_name.to_string(),
                property: chunk.name.clone(),
                code,
            });
        }

        let name: Arc<str> = Arc::from(chunk.name);
        for (slot, &id) in entry.members.iter().enumerate() {
            let property = Property::from_column(chunk.kind, Arc::clone(&chunk.raw), slot);
            graph.instance_mut(id).set_property(Arc::clone(&name), property);
        }
    }
}

/// Wires parent and child lists in link order.
fn linkage_pass(graph: &mut Graph, chunk: &ParentChunk) -> Result<()> {
    for (child, parent) in chunk.links() {
        if child.is_root() {
            return Err(RbxError::ReservedReferent(child));
        }
        let child_id = graph.resolve(child).ok_or(RbxError::DanglingReference {
            referent: child,
            context: "parent chunk child",
        })?;
        let parent_id = graph.resolve(parent).ok_or(RbxError::DanglingReference {
            referent: parent,
            context: "parent chunk parent",
        })?;
        graph.link(parent_id, child_id)?;
    }
    trace!(links = chunk.len(), "linkage pass");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::SharedString;
    use crate::error::ErrorKind;
    use crate::format::FileHeader;
    use crate::reader::Chunk;
    use crate::referent::Referent;
    use crate::value::{PropertyType, PropertyValue};

    fn inst(class_id: u32, class_name: &str, referents: &[u128]) -> Chunk<'static> {
        let chunk = InstanceChunk {
            class_id,
            class_name: class_name.into(),
            is_service: false,
            referents: referents.iter().map(|r| Referent::new(*r)).collect(),
            service_markers: Vec::new(),
        };
        Chunk::new(ChunkTag::Instance, chunk.encode().unwrap())
    }

    fn prop(class_id: u32, name: &str, kind: PropertyType, raw: Vec<u8>) -> Chunk<'static> {
        let chunk = PropertyChunk {
            class_id,
            name: name.into(),
            kind,
            raw: raw.into(),
        };
        Chunk::new(ChunkTag::Property, chunk.encode().unwrap())
    }

    fn prnt(links: &[(u128, u128)]) -> Chunk<'static> {
        let chunk = ParentChunk {
            children: links.iter().map(|(c, _)| Referent::new(*c)).collect(),
            parents: links.iter().map(|(_, p)| Referent::new(*p)).collect(),
        };
        Chunk::new(ChunkTag::Parent, chunk.encode().unwrap())
    }

    fn sstr() -> Chunk<'static> {
        let chunk = SharedStringChunk {
            strings: vec![SharedString::new([3; 16], b"shared".to_vec())],
        };
        Chunk::new(ChunkTag::SharedString, chunk.encode().unwrap())
    }

    fn end() -> Chunk<'static> {
        Chunk::new(ChunkTag::End, &b"</roblox>"[..])
    }

    fn build(chunks: Vec<Chunk<'static>>) -> Result<Graph> {
        let container = Container::from_parts(FileHeader::new(0, 0), chunks);
        assemble(&container, &DecodeOptions::default().with_parallel(false))
    }

    const ROOT: u128 = u128::MAX;

    #[test]
    fn three_passes_join_by_class_id() {
        let names = encode_strings(&[b"Floor", b"Wall"]);
        let graph = build(vec![
            sstr(),
            prop(5, "Name", PropertyType::String, names),
            inst(5, "Part", &[10, 11]),
            inst(6, "Model", &[20]),
            prnt(&[(20, ROOT), (10, 20), (11, 20)]),
            end(),
        ])
        .unwrap();

        assert_eq!(graph.len(), 3);
        let model = graph.get_instance(Referent::new(20)).unwrap();
        assert_eq!(graph.parent(model).unwrap().referent(), Referent::ROOT);
        let kids: Vec<_> = graph.children(model).map(|i| i.referent().as_u128()).collect();
        assert_eq!(kids, [10, 11]);

        let wall = graph.get_instance(Referent::new(11)).unwrap();
        assert_eq!(
            graph.property_value(wall, "Name").unwrap(),
            Some(PropertyValue::String(b"Wall".to_vec()))
        );
        assert_eq!(graph.shared_strings().len(), 1);
        assert!(graph.warnings().is_empty());
    }

    fn encode_strings(values: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for v in values {
            out.extend_from_slice(&(v.len() as u32).to_le_bytes());
            out.extend_from_slice(v);
        }
        out
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let chunks = vec![inst(0, "Folder", &[1, 2]), prnt(&[(1, ROOT), (2, 1)]), sstr(), end()];
        let container = Container::from_parts(FileHeader::new(1, 2), chunks);
        let a = assemble(&container, &DecodeOptions::default().with_parallel(true)).unwrap();
        let b = assemble(&container, &DecodeOptions::default().with_parallel(false)).unwrap();
        let order = |g: &Graph| g.descendants(g.root()).map(|i| i.referent()).collect::<Vec<_>>();
        assert_eq!(order(&a), order(&b));
    }

    #[test]
    fn required_chunks() {
        let err = build(vec![inst(0, "Part", &[1]), sstr(), end()]).unwrap_err();
        assert!(matches!(err, RbxError::MissingRequiredChunk(ChunkTag::Parent)));

        let err = build(vec![inst(0, "Part", &[1]), prnt(&[]), end()]).unwrap_err();
        assert!(matches!(err, RbxError::MissingRequiredChunk(ChunkTag::SharedString)));
    }

    #[test]
    fn unknown_tags_become_warnings() {
        let graph = build(vec![
            inst(0, "Part", &[1]),
            prop(0, "Mystery", PropertyType::Unknown(0x7F), vec![1, 2, 3]),
            Chunk::new(ChunkTag::Unknown(*b"META"), vec![0u8; 4]),
            prnt(&[(1, ROOT)]),
            sstr(),
            end(),
        ])
        .unwrap();

        assert_eq!(
            graph.warnings(),
            [
                DecodeWarning::UnknownChunkType {
                    index: 2,
                    tag: *b"META"
                },
                DecodeWarning::UnknownPropertyType {
                    class_name: "Part".into(),
                    property: "Mystery".into(),
                    code: 0x7F,
                },
            ]
        );
        let part = graph.get_instance(Referent::new(1)).unwrap();
        assert_eq!(part.get_property("Mystery").unwrap().raw(), [1, 2, 3]);
        assert_eq!(graph.property_value(part, "Mystery").unwrap(), None);
    }

    #[test]
    fn orphan_property_chunk_is_ignored() {
        let graph = build(vec![
            inst(0, "Part", &[1]),
            prop(9, "Name", PropertyType::String, encode_strings(&[b"x"])),
            prnt(&[]),
            sstr(),
            end(),
        ])
        .unwrap();
        let part = graph.get_instance(Referent::new(1)).unwrap();
        assert!(part.get_property("Name").is_none());
        assert!(graph.parent(part).is_none());
    }

    #[test]
    fn dangling_links_fail() {
        let err = build(vec![inst(0, "Part", &[1]), prnt(&[(1, 99)]), sstr(), end()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);

        let err = build(vec![inst(0, "Part", &[1]), prnt(&[(42, ROOT)]), sstr(), end()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DanglingReference);
    }

    #[test]
    fn integrity_rejections() {
        let err = build(vec![inst(0, "Part", &[1]), prnt(&[(ROOT, 1)]), sstr(), end()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReservedReferent);

        let err = build(vec![inst(0, "Part", &[1, ROOT]), prnt(&[]), sstr(), end()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReservedReferent);

        let err = build(vec![inst(0, "Part", &[1, 2]), prnt(&[(1, 2), (2, 1)]), sstr(), end()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicParent);
    }

    #[test]
    fn duplicate_referent_keeps_first_declaration() {
        let graph = build(vec![
            inst(0, "Part", &[1]),
            inst(1, "Model", &[1, 2]),
            prnt(&[(1, ROOT), (2, ROOT)]),
            sstr(),
            end(),
        ])
        .unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get_instance(Referent::new(1)).unwrap().class_name(), "Part");

        let graph = build(vec![
            inst(0, "Part", &[1]),
            inst(1, "Model", &[1, 2]),
            prop(1, "ModelOnly", PropertyType::String, encode_strings(&[b"m1", b"m2"])),
            prnt(&[]),
            sstr(),
            end(),
        ])
        .unwrap();
        let part = graph.get_instance(Referent::new(1)).unwrap();
        assert!(part.get_property("ModelOnly").is_none());
        let model = graph.get_instance(Referent::new(2)).unwrap();
        assert_eq!(
            graph.property_value(model, "ModelOnly").unwrap(),
            Some(PropertyValue::String(b"m1".to_vec()))
        );
    }

    #[test]
    fn instance_chunks_sharing_a_class_id_merge() {
        let graph = build(vec![
            inst(0, "Part", &[1]),
            inst(0, "Part", &[2]),
            prop(0, "Name", PropertyType::String, encode_strings(&[b"a", b"b"])),
            prnt(&[(1, ROOT), (2, ROOT)]),
            sstr(),
            end(),
        ])
        .unwrap();

        for (referent, name) in [(1, b"a"), (2, b"b")] {
            let part = graph.get_instance(Referent::new(referent)).unwrap();
            assert_eq!(
                graph.property_value(part, "Name").unwrap(),
                Some(PropertyValue::String(name.to_vec()))
            );
        }
    }

    #[test]
    fn later_property_chunk_wins() {
        let graph = build(vec![
            inst(0, "Part", &[1]),
            prop(0, "Name", PropertyType::String, encode_strings(&[b"first"])),
            prop(0, "Name", PropertyType::String, encode_strings(&[b"second"])),
            prnt(&[]),
            sstr(),
            end(),
        ])
        .unwrap();
        let part = graph.get_instance(Referent::new(1)).unwrap();
        assert_eq!(
            graph.property_value(part, "Name").unwrap(),
            Some(PropertyValue::String(b"second".to_vec()))
        );
        assert_eq!(part.properties().count(), 1);
    }

    #[test]
    fn header_counts_checked_on_request() {
        let chunks = vec![inst(0, "Part", &[1, 2]), prnt(&[]), sstr(), end()];
        let container = Container::from_parts(FileHeader::new(1, 3), chunks);
        let options = DecodeOptions::default().with_verify_header_counts(true);
        let err = assemble(&container, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CountMismatch);

        assert!(assemble(&container, &DecodeOptions::default()).is_ok());
    }
}
