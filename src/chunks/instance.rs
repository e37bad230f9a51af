use crate::error::{RbxError, Result};
use crate::interleave::{read_referent_ints, write_referent_ints};
use crate::io::{ByteReader, ByteWriter};
use crate::referent::Referent;

/// An `INST` chunk: one class and the referents of its instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceChunk {
    /// File-local class id; the join key for property chunks.
    pub class_id: u32,
    /// Class name shared by every instance in the chunk.
    pub class_name: String,
    /// Whether the class is a service.
    pub is_service: bool,
    /// Referents in slot order. Slot `i` reads entry `i` of every property column.
    pub referents: Vec<Referent>,
    /// Per-instance service markers, present only on service classes.
    pub service_markers: Vec<bool>,
}

impl InstanceChunk {
    /// Parses a decompressed payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let class_id = r.read_u32_le()?;
        let class_name = r.read_n_string("class name")?.to_owned();
        let is_service = r.read_bool()?;
        let count = r.read_u32_le()? as usize;

        let referents: Vec<Referent> = read_referent_ints(&mut r, count)
            .into_iter()
            .map(Referent::from_wire)
            .collect();
        if referents.len() != count {
            return Err(RbxError::CountMismatch {
                what: "instance referents",
                expected: count,
                actual: referents.len(),
            });
        }

        let mut service_markers = Vec::new();
        if is_service && !r.is_empty() {
            service_markers.reserve(count.min(r.remaining()));
            for _ in 0..count {
                service_markers.push(r.read_bool()?);
            }
        }

        Ok(Self {
            class_id,
            class_name,
            is_service,
            referents,
            service_markers,
        })
    }

    /// Serializes the chunk. Service markers are written only for services.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let wire = self
            .referents
            .iter()
            .map(|r| {
                r.to_wire().ok_or_else(|| {
                    RbxError::Unrepresentable(format!("referent {r} as a 32-bit wire id"))
                })
            })
            .collect::<Result<Vec<i32>>>()?;
        let count = u32::try_from(wire.len())
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX instances".into()))?;

        let mut w = ByteWriter::with_capacity(13 + self.class_name.len() + wire.len() * 5);
        w.write_u32_le(self.class_id);
        w.write_n_string(&self.class_name)?;
        w.write_bool(self.is_service);
        w.write_u32_le(count);
        write_referent_ints(&mut w, &wire);
        if self.is_service {
            for i in 0..wire.len() {
                w.write_bool(self.service_markers.get(i).copied().unwrap_or(true));
            }
        }
        Ok(w.into_inner())
    }
}
