//! Record data model.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque description of whoever is asking for a record.
///
/// Cloning shares the same descriptor, so a record and every record reached
/// through it hold the identical accessor.
#[derive(Debug, Clone)]
pub struct Accessor(Arc<Value>);

impl Accessor {
    pub fn new(descriptor: Value) -> Self {
        Self(Arc::new(descriptor))
    }

    /// An accessor that carries no information.
    pub fn anonymous() -> Self {
        Self::new(Value::Null)
    }

    pub fn descriptor(&self) -> &Value {
        &self.0
    }

    /// Look up a top-level field of the descriptor.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether both handles point at the same descriptor.
    pub fn same_as(&self, other: &Accessor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Accessor {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Relation names from the serialization root to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelationChain(Vec<String>);

impl RelationChain {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The chain one hop further along `name`.
    pub fn join(&self, name: &str) -> Self {
        let mut names = self.0.clone();
        names.push(name.to_string());
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(Value::String).collect())
    }
}

impl fmt::Display for RelationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for RelationChain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A populated relation slot.
///
/// A relation that has not been loaded has no slot at all.
#[derive(Debug, Clone)]
pub enum Relation {
    /// A to-one relation that was loaded and points at nothing.
    Null,
    One(Box<Record>),
    Many(RecordCollection),
}

impl Relation {
    pub fn one(record: Record) -> Self {
        Relation::One(Box::new(record))
    }

    fn stamp(&mut self, accessor: &Accessor, chain: &RelationChain) {
        match self {
            Relation::Null => {}
            Relation::One(record) => record.stamp(accessor, chain.clone()),
            Relation::Many(collection) => {
                for record in collection.iter_mut() {
                    record.stamp(accessor, chain.clone());
                }
            }
        }
    }
}

/// An ordered list of records sharing one type tag.
#[derive(Debug, Clone, Default)]
pub struct RecordCollection {
    records: Vec<Record>,
}

impl RecordCollection {
    /// Build a collection, rejecting mixed record types.
    pub fn new(records: Vec<Record>) -> Result<Self> {
        if let Some(first) = records.first() {
            if let Some(other) = records.iter().find(|r| r.type_tag != first.type_tag) {
                return Err(Error::MixedCollection {
                    expected: first.type_tag.clone(),
                    found: other.type_tag.clone(),
                });
            }
        }
        Ok(Self { records })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn type_tag(&self) -> Option<&str> {
        self.records.first().map(|r| r.type_tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.iter_mut()
    }
}

impl IntoIterator for RecordCollection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// A node of a record graph: attributes plus named relations.
///
/// `accessor` and `relation_chain` are stamped when a record becomes a root
/// ([`Record::as_root`]) and re-stamped on every record attached through
/// [`Record::set_relation`], so the chain always grows by exactly one name
/// per hop and the accessor is shared across the whole graph.
#[derive(Debug, Clone)]
pub struct Record {
    type_tag: String,
    id: Option<Value>,
    attributes: Map<String, Value>,
    relations: BTreeMap<String, Relation>,
    accessor: Accessor,
    relation_chain: RelationChain,
}

impl Record {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            id: None,
            attributes: Map::new(),
            relations: BTreeMap::new(),
            accessor: Accessor::anonymous(),
            relation_chain: RelationChain::root(),
        }
    }

    /// Set the identity value. The identity is also readable as the `id`
    /// attribute unless an attribute of that name is set explicitly.
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        let id = id.into();
        self.attributes
            .entry("id".to_string())
            .or_insert_with(|| id.clone());
        self.id = Some(id);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.set_relation(name, relation);
        self
    }

    /// Make this record a serialization root for `accessor`.
    pub fn as_root(mut self, accessor: Accessor) -> Self {
        self.stamp(&accessor, RelationChain::root());
        self
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    /// Whether the record has been persisted (it has an identity).
    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn relation_chain(&self) -> &RelationChain {
        &self.relation_chain
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Drop every attribute whose name fails `keep`.
    pub fn retain_attributes(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.attributes.retain(|name, _| keep(name));
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Populate relation `name`, stamping the attached records with this
    /// record's accessor and the extended relation chain.
    pub fn set_relation(&mut self, name: impl Into<String>, mut relation: Relation) {
        let name = name.into();
        relation.stamp(&self.accessor, &self.relation_chain.join(&name));
        self.relations.insert(name, relation);
    }

    pub fn remove_relation(&mut self, name: &str) -> Option<Relation> {
        self.relations.remove(name)
    }

    /// Drop every relation whose name fails `keep`.
    pub fn retain_relations(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.relations.retain(|name, _| keep(name));
    }

    /// No attributes and no populated relations.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relations.is_empty()
    }

    fn stamp(&mut self, accessor: &Accessor, chain: RelationChain) {
        self.accessor = accessor.clone();
        for (name, relation) in self.relations.iter_mut() {
            relation.stamp(accessor, &chain.join(name));
        }
        self.relation_chain = chain;
    }
}
