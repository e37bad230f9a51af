//! Instance nodes and their property storage.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::referent::Referent;
use crate::value::{PropertyType, PropertyValue, decode_value, encode_column};

/// A strong type for an instance's position in the graph arena.
///
/// Ids are dense and only meaningful for the [`crate::Graph`] that issued them.
/// The root is always id 0.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    pub(crate) const ROOT: Self = Self(0);

    pub(crate) fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw arena index.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property as stored on an instance: the type code, the raw column it came from
/// and this instance's slot in that column.
///
/// Instances of one class share the same column allocation; [`Property::raw`]
/// returns the whole column exactly as it appeared in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    kind: PropertyType,
    column: Arc<[u8]>,
    slot: usize,
}

impl Property {
    /// Wraps a raw column.
    pub fn from_column(kind: PropertyType, column: Arc<[u8]>, slot: usize) -> Self {
        Self { kind, column, slot }
    }

    /// Builds a single-entry column holding `value`.
    pub fn from_value(value: &PropertyValue) -> Result<Self> {
        let kind = value.property_type();
        let column = encode_column(kind, std::slice::from_ref(value))?;
        Ok(Self {
            kind,
            column: column.into(),
            slot: 0,
        })
    }

    /// The column's value type.
    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    /// The raw column bytes, verbatim.
    pub fn raw(&self) -> &[u8] {
        &self.column
    }

    /// This instance's position in the column.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Decodes this instance's value, or `None` if the type is kept raw.
    pub fn value(&self) -> Result<Option<PropertyValue>> {
        decode_value(self.kind, &self.column, self.slot)
    }

    pub(crate) fn shares_column(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.column, &other.column)
    }

    pub(crate) fn column(&self) -> &Arc<[u8]> {
        &self.column
    }
}

/// A node of the instance graph.
///
/// Identity and class are fixed at creation. Parent and children are arena ids;
/// resolve them through the owning [`crate::Graph`].
#[derive(Debug, Clone)]
pub struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) referent: Referent,
    pub(crate) class_name: Arc<str>,
    pub(crate) is_service: bool,
    pub(crate) properties: Vec<(Arc<str>, Property)>,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) children: Vec<InstanceId>,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, referent: Referent, class_name: Arc<str>) -> Self {
        Self {
            id,
            referent,
            class_name,
            is_service: false,
            properties: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Arena id within the owning graph.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// File-level identity.
    pub fn referent(&self) -> Referent {
        self.referent
    }

    /// Class name, e.g. `Part`.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Whether the declaring instance chunk flagged the class as a service.
    pub fn is_service(&self) -> bool {
        self.is_service
    }

    /// `None` for the root and for orphans.
    pub fn parent_id(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Children in display order.
    pub fn child_ids(&self) -> &[InstanceId] {
        &self.children
    }

    /// Looks up a property by name.
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, p)| p)
    }

    /// Properties in the order they were first set.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> + '_ {
        self.properties.iter().map(|(n, p)| (n.as_ref(), p))
    }

    /// Sets a property; a later write for the same name replaces the earlier one.
    pub(crate) fn set_property(&mut self, name: Arc<str>, property: Property) {
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = property,
            None => self.properties.push((name, property)),
        }
    }
}
