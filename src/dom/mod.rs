//! The instance graph.
//!
//! [`Graph`] is an arena: every [`Instance`] lives in one `Vec`, addressed by a dense
//! [`InstanceId`], with a side table from [`Referent`] to id. Parent and child fields
//! hold ids, never owning pointers, so the arena is the single owner of every node.
//! The synthetic root container always occupies id 0.

/// Builds a graph from decoded chunk payloads.
pub(crate) mod assemble;
/// Defines `Instance`, `Property` and `InstanceId`.
pub mod instance;

pub use assemble::DecodeWarning;
pub use instance::{Instance, InstanceId, Property};

use std::collections::HashMap;
use std::sync::Arc;

use crate::chunks::{SharedString, Signature};
use crate::error::{RbxError, Result};
use crate::format::FileHeader;
use crate::referent::Referent;
use crate::value::PropertyValue;

/// Class name of the synthetic root container.
pub const ROOT_CLASS_NAME: &str = "DataModel";

/// A fully linked instance graph.
#[derive(Debug, Clone)]
pub struct Graph {
    header: FileHeader,
    instances: Vec<Instance>,
    by_referent: HashMap<Referent, InstanceId>,
    shared_strings: Vec<SharedString>,
    signatures: Vec<Signature>,
    warnings: Vec<DecodeWarning>,
}

impl Graph {
    /// Creates a graph holding only the root.
    pub fn new() -> Self {
        let root = Instance::new(InstanceId::ROOT, Referent::ROOT, Arc::from(ROOT_CLASS_NAME));
        Self {
            header: FileHeader::new(0, 0),
            instances: vec![root],
            by_referent: HashMap::new(),
            shared_strings: Vec::new(),
            signatures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The synthetic top-level container.
    pub fn root(&self) -> &Instance {
        &self.instances[InstanceId::ROOT.index()]
    }

    /// Looks up an instance by referent. [`Referent::ROOT`] yields the root.
    ///
    /// # Errors
    /// [`RbxError::NotFound`] for any other referent not in the graph.
    pub fn get_instance(&self, referent: Referent) -> Result<&Instance> {
        self.resolve(referent)
            .map(|id| &self.instances[id.index()])
            .ok_or(RbxError::NotFound(referent))
    }

    /// Looks up an instance by arena id.
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.index())
    }

    /// Number of decoded instances, root excluded.
    pub fn len(&self) -> usize {
        self.instances.len() - 1
    }

    /// True when only the root is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every decoded instance in creation order, root excluded.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> + '_ {
        self.instances.iter().skip(1)
    }

    /// Children of `instance`, in order.
    pub fn children<'g>(&'g self, instance: &'g Instance) -> impl Iterator<Item = &'g Instance> + 'g {
        instance
            .child_ids()
            .iter()
            .filter_map(move |id| self.instance(*id))
    }

    /// Parent of `instance`, or `None` for the root and orphans.
    pub fn parent(&self, instance: &Instance) -> Option<&Instance> {
        instance.parent_id().and_then(|id| self.instance(id))
    }

    /// Depth-first, pre-order walk below `instance` (not including it).
    pub fn descendants<'g>(&'g self, instance: &Instance) -> Descendants<'g> {
        Descendants {
            graph: self,
            stack: instance.child_ids().iter().rev().copied().collect(),
        }
    }

    /// Decodes one property of one instance.
    ///
    /// `Ok(None)` if the instance has no such property or its type is kept raw.
    pub fn property_value(&self, instance: &Instance, name: &str) -> Result<Option<PropertyValue>> {
        match instance.get_property(name) {
            Some(property) => property.value(),
            None => Ok(None),
        }
    }

    /// The shared-string table.
    pub fn shared_strings(&self) -> &[SharedString] {
        &self.shared_strings
    }

    /// Resolves a [`PropertyValue::SharedString`] index.
    pub fn shared_string(&self, index: u32) -> Option<&SharedString> {
        self.shared_strings.get(index as usize)
    }

    /// Records from the signature chunk, if the file had one.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Recoverable oddities met while decoding.
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// The file header the graph was decoded from.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    // --- construction ---

    /// Adds an instance under `parent` ([`Referent::ROOT`] for top level, `None` for
    /// an orphan).
    pub fn insert(
        &mut self,
        referent: Referent,
        class_name: &str,
        parent: Option<Referent>,
    ) -> Result<InstanceId> {
        let id = self.add_instance(referent, Arc::from(class_name))?;
        if let Some(parent) = parent {
            let parent_id = self.resolve(parent).ok_or(RbxError::DanglingReference {
                referent: parent,
                context: "insert",
            })?;
            self.link(parent_id, id)?;
        }
        Ok(id)
    }

    /// Sets a property on an instance; the last write for a name wins.
    pub fn set_property(&mut self, referent: Referent, name: &str, property: Property) -> Result<()> {
        let id = self.resolve(referent).ok_or(RbxError::NotFound(referent))?;
        self.instances[id.index()].set_property(Arc::from(name), property);
        Ok(())
    }

    /// Marks an instance as a service.
    pub fn set_service(&mut self, referent: Referent, is_service: bool) -> Result<()> {
        let id = self.resolve(referent).ok_or(RbxError::NotFound(referent))?;
        self.instances[id.index()].is_service = is_service;
        Ok(())
    }

    /// Replaces the shared-string table.
    pub fn set_shared_strings(&mut self, strings: Vec<SharedString>) {
        self.shared_strings = strings;
    }

    // --- arena internals ---

    pub(crate) fn resolve(&self, referent: Referent) -> Option<InstanceId> {
        if referent.is_root() {
            Some(InstanceId::ROOT)
        } else {
            self.by_referent.get(&referent).copied()
        }
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> &mut Instance {
        &mut self.instances[id.index()]
    }

    /// Creates a node. The referent must be new and must not be the root sentinel.
    pub(crate) fn add_instance(&mut self, referent: Referent, class_name: Arc<str>) -> Result<InstanceId> {
        if referent.is_root() {
            return Err(RbxError::ReservedReferent(referent));
        }
        if self.by_referent.contains_key(&referent) {
            return Err(RbxError::Unrepresentable(format!("duplicate referent {referent}")));
        }
        let raw = u32::try_from(self.instances.len())
            .map_err(|_| RbxError::Unrepresentable("more than u32::MAX instances".into()))?;
        let id = InstanceId::new(raw);
        self.instances.push(Instance::new(id, referent, class_name));
        self.by_referent.insert(referent, id);
        Ok(id)
    }

    /// Appends `child` to `parent`'s children, detaching it from any earlier parent.
    pub(crate) fn link(&mut self, parent: InstanceId, child: InstanceId) -> Result<()> {
        if child == InstanceId::ROOT {
            return Err(RbxError::ReservedReferent(Referent::ROOT));
        }

        // Refuse links that would make the parent chain loop back to the child.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(RbxError::CyclicParent {
                    child: self.instances[child.index()].referent,
                    parent: self.instances[parent.index()].referent,
                });
            }
            cursor = self.instances[id.index()].parent;
        }

        if let Some(old) = self.instances[child.index()].parent.take() {
            self.instances[old.index()].children.retain(|c| *c != child);
        }
        self.instances[child.index()].parent = Some(parent);
        self.instances[parent.index()].children.push(child);
        Ok(())
    }

    pub(crate) fn set_header(&mut self, header: FileHeader) {
        self.header = header;
    }

    pub(crate) fn set_signatures(&mut self, signatures: Vec<Signature>) {
        self.signatures = signatures;
    }

    pub(crate) fn push_warning(&mut self, warning: DecodeWarning) {
        self.warnings.push(warning);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`Graph::descendants`].
#[derive(Debug)]
pub struct Descendants<'g> {
    graph: &'g Graph,
    stack: Vec<InstanceId>,
}

impl<'g> Iterator for Descendants<'g> {
    type Item = &'g Instance;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let instance = self.graph.instance(id)?;
        self.stack.extend(instance.child_ids().iter().rev().copied());
        Some(instance)
    }
}
