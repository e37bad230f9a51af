// src/inspector.rs

//! Tools for inspecting the physical structure of container files.
//! Useful for debugging writers and checking what a file actually carries.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::Path;

use serde::Serialize;

use crate::chunks::ChunkPayload;
use crate::dom::{Graph, Instance};
use crate::error::Result;
use crate::options::DecodeOptions;
use crate::reader::{Chunk, Container};

/// A structural report of a container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    /// Total size of the input.
    pub file_size: u64,
    /// Class count declared by the header.
    pub class_count: i32,
    /// Instance count declared by the header.
    pub instance_count: i32,
    /// Every chunk in file order.
    pub chunks: Vec<ChunkInfo>,
}

/// Metadata for a single chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkInfo {
    /// Position in the file, counting from 0.
    pub index: usize,
    /// Tag with padding trimmed.
    pub tag: String,
    /// "None" or "LZ4".
    pub compression: String,
    /// Bytes stored in the file (0 for raw payloads, as on the wire).
    pub compressed_size: u32,
    /// Payload size after decompression.
    pub uncompressed_size: u32,
    /// Short description of the payload, e.g. `Part x3` or `Part.Name: String`.
    pub summary: String,
}

/// The container inspector.
#[derive(Debug)]
pub struct Inspector;

impl Inspector {
    /// Analyzes a buffered file and returns a structural report.
    ///
    /// Chunk payloads that fail to parse are reported in their summary rather than
    /// failing the whole report; a broken header or chunk layout still fails.
    pub fn inspect(data: &[u8]) -> Result<ContainerReport> {
        let container = Container::parse_with(data, &DecodeOptions::default().with_parallel(false))?;

        let parsed: Vec<Result<ChunkPayload>> = container.chunks().iter().map(ChunkPayload::parse).collect();
        let class_names: HashMap<u32, &str> = parsed
            .iter()
            .filter_map(|p| match p {
                Ok(ChunkPayload::Instance(inst)) => Some((inst.class_id, inst.class_name.as_str())),
                _ => None,
            })
            .collect();

        let chunks = container
            .chunks()
            .iter()
            .zip(&parsed)
            .map(|(chunk, payload)| Self::inspect_chunk(chunk, payload, &class_names))
            .collect();

        Ok(ContainerReport {
            file_size: data.len() as u64,
            class_count: container.header().class_count,
            instance_count: container.header().instance_count,
            chunks,
        })
    }

    /// Reads a file and inspects it.
    pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<ContainerReport> {
        let data = std::fs::read(path)?;
        Self::inspect(&data)
    }

    fn inspect_chunk(chunk: &Chunk<'_>, payload: &Result<ChunkPayload>, class_names: &HashMap<u32, &str>) -> ChunkInfo {
        let header = chunk.header();
        let compression = if header.is_compressed() { "LZ4" } else { "None" };
        ChunkInfo {
            index: chunk.index(),
            tag: chunk.tag().to_string(),
            compression: compression.to_string(),
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            summary: Self::summarize(payload, class_names),
        }
    }

    fn summarize(payload: &Result<ChunkPayload>, class_names: &HashMap<u32, &str>) -> String {
        let payload = match payload {
            Ok(p) => p,
            Err(e) => return format!("unparseable: {e}"),
        };
        match payload {
            ChunkPayload::Instance(inst) => {
                let service = if inst.is_service { " (service)" } else { "" };
                format!("{} x{}{service}", inst.class_name, inst.referents.len())
            }
            ChunkPayload::Property(prop) => {
                let class = class_names
                    .get(&prop.class_id)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("class#{}", prop.class_id));
                format!("{class}.{}: {}", prop.name, prop.kind)
            }
            ChunkPayload::Parent(prnt) => format!("{} links", prnt.len()),
            ChunkPayload::SharedString(sstr) => format!("{} shared strings", sstr.strings.len()),
            ChunkPayload::Signature(sign) => format!("{} signatures", sign.signatures.len()),
            ChunkPayload::End => "end of chunks".to_string(),
            ChunkPayload::Unknown(_) => "unrecognised, kept raw".to_string(),
        }
    }

    /// Renders the instance hierarchy below the root, one `ClassName [referent]`
    /// line per instance.
    ///
    /// Indentation stops growing after 64 levels; deeper lines are
    /// suffixed with their depth instead.
    pub fn tree(graph: &Graph) -> String {
        let mut out = String::new();
        let root = graph.root();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{} [{}]", root.class_name(), root.referent());

        let mut stack = Vec::new();
        Self::push_children(graph, root, String::new(), 1, &mut stack);
        while let Some(TreeEntry {
            node,
            prefix,
            depth,
            is_last,
        }) = stack.pop()
        {
            let connector = if is_last { "└── " } else { "├── " };
            let _ = write!(out, "{prefix}{connector}{} [{}]", node.class_name(), node.referent());
            if depth > MAX_DRAWN_DEPTH {
                let _ = write!(out, " (depth {depth})");
            }
            out.push('\n');

            let child_prefix = if depth < MAX_DRAWN_DEPTH {
                let segment = if is_last { "    " } else { "│   " };
                format!("{prefix}{segment}")
            } else {
                prefix
            };
            Self::push_children(graph, node, child_prefix, depth + 1, &mut stack);
        }
        out
    }

    /// Pushes `node`'s children so that the first child is popped first.
    fn push_children<'g>(
        graph: &'g Graph,
        node: &'g Instance,
        prefix: String,
        depth: usize,
        stack: &mut Vec<TreeEntry<'g>>,
    ) {
        let children: Vec<&Instance> = graph.children(node).collect();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate().rev() {
            stack.push(TreeEntry {
                node: child,
                prefix: prefix.clone(),
                depth,
                is_last: i == last,
            });
        }
    }
}

/// Indentation levels drawn by [`Inspector::tree`].
const MAX_DRAWN_DEPTH: usize = 64;

/// A pending line of [`Inspector::tree`] output.
struct TreeEntry<'g> {
    node: &'g Instance,
    prefix: String,
    depth: usize,
    is_last: bool,
}

impl fmt::Display for ContainerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CONTAINER INSPECTOR REPORT ===")?;
        writeln!(f, "File Size:      {}", self.file_size)?;
        writeln!(f, "Classes:        {}", self.class_count)?;
        writeln!(f, "Instances:      {}", self.instance_count)?;
        writeln!(f, "\n[CHUNKS]")?;
        for (i, chunk) in self.chunks.iter().enumerate() {
            chunk.fmt_line(f, i == self.chunks.len() - 1)?;
        }
        Ok(())
    }
}

impl ChunkInfo {
    fn fmt_line(&self, f: &mut fmt::Formatter<'_>, is_last: bool) -> fmt::Result {
        let connector = if is_last { "└── " } else { "├── " };
        writeln!(
            f,
            "{connector}#{} {:<4} Size: {}b | Stored: {}b | Algo: {} | {}",
            self.index,
            self.tag,
            self.uncompressed_size,
            if self.compressed_size == 0 {
                self.uncompressed_size
            } else {
                self.compressed_size
            },
            self.compression,
            self.summary
        )
    }
}
