use crate::error::{RbxError, Result};
use crate::interleave::{read_referent_ints, write_referent_ints};
use crate::io::{ByteReader, ByteWriter};
use crate::referent::Referent;

const PARENT_CHUNK_VERSION: u8 = 0;

/// The `PRNT` chunk: parallel child and parent referent lists.
///
/// Entry `i` links `children[i]` under `parents[i]`. Order matters: it is the
/// order children appear under their parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentChunk {
    /// Child of each link.
    pub children: Vec<Referent>,
    /// Parent of each link; [`Referent::ROOT`] for top-level instances.
    pub parents: Vec<Referent>,
}

impl ParentChunk {
    /// Parses a decompressed payload.
    ///
    /// # Errors
    /// [`RbxError::UnsupportedVersion`] for any version byte other than 0.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(payload);
        let version = r.read_u8()?;
        if version != PARENT_CHUNK_VERSION {
            return Err(RbxError::UnsupportedVersion {
                what: "parent chunk",
                version: u32::from(version),
            });
        }
        let count = r.read_u32_le()? as usize;

        let children: Vec<Referent> = read_referent_ints(&mut r, count)
            .into_iter()
            .map(Referent::from_wire)
            .collect();
        let parents: Vec<Referent> = read_referent_ints(&mut r, count)
            .into_iter()
            .map(Referent::from_wire)
            .collect();

        for (what, actual) in [("child referents", children.len()), ("parent referents", parents.len())] {
            if actual != count {
                return Err(RbxError::CountMismatch {
                    what,
                    expected: count,
                    actual,
                });
            }
        }

        Ok(Self { children, parents })
    }

    /// `(child, parent)` pairs in link order.
    pub fn links(&self) -> impl Iterator<Item = (Referent, Referent)> + '_ {
        self.children.iter().copied().zip(self.parents.iter().copied())
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when the chunk carries no links.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Serializes the links in order.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.children.len() != self.parents.len() {
            return Err(RbxError::CountMismatch {
                what: "parent referents",
                expected: self.children.len(),
                actual: self.parents.len(),
            });
        }
        let to_wire = |list: &[Referent]| {
            list.iter()
                .map(|r| {
                    r.to_wire().ok_or_else(|| {
                        RbxError::Unrepresentable(format!("referent {r} as a 32-bit wire id"))
                    })
                })
                .collect::<Result<Vec<i32>>>()
        };
        let children = to_wire(&self.children)?;
        let parents = to_wire(&self.parents)?;
        let count = u32::try_from(children.len())
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX links".into()))?;

        let mut w = ByteWriter::with_capacity(5 + children.len() * 8);
        w.write_u8(PARENT_CHUNK_VERSION);
        w.write_u32_le(count);
        write_referent_ints(&mut w, &children);
        write_referent_ints(&mut w, &parents);
        Ok(w.into_inner())
    }
}
