//! JSON import documents.
//!
//! ```json
//! {
//!   "relations": [{ "type": "user", "name": "groups", "kind": "many" }],
//!   "records": [
//!     { "type": "user", "id": 1, "attributes": { "name": "Ada" } },
//!     { "type": "group", "id": 10, "attributes": { "title": "Core" } }
//!   ],
//!   "links": [
//!     { "from": { "type": "user", "id": 1 }, "name": "groups", "to": { "type": "group", "id": 10 } }
//!   ]
//! }
//! ```

use crate::error::Result;
use records::{Record, RelationKind, SqliteStore};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Document {
    #[serde(default)]
    relations: Vec<RelationDef>,
    #[serde(default)]
    records: Vec<RecordDef>,
    #[serde(default)]
    links: Vec<LinkDef>,
}

#[derive(Debug, Deserialize)]
struct RelationDef {
    #[serde(rename = "type")]
    type_tag: String,
    name: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RecordDef {
    #[serde(rename = "type")]
    type_tag: String,
    id: Value,
    #[serde(default)]
    attributes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RecordRef {
    #[serde(rename = "type")]
    type_tag: String,
    id: Value,
}

impl RecordRef {
    fn record(&self) -> Record {
        Record::new(self.type_tag.as_str()).with_id(self.id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct LinkDef {
    from: RecordRef,
    name: String,
    to: RecordRef,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub links: usize,
}

impl Document {
    /// Write everything in the document to `store`.
    ///
    /// Relations are declared first so links can be validated against them.
    pub fn apply(&self, store: &SqliteStore) -> Result<Summary> {
        for def in &self.relations {
            let kind: RelationKind = def.kind.parse()?;
            store.define_relation(&def.type_tag, &def.name, kind)?;
        }

        for def in &self.records {
            let mut record = Record::new(def.type_tag.as_str()).with_id(def.id.clone());
            for (name, value) in &def.attributes {
                record.set_attribute(name.as_str(), value.clone());
            }
            store.insert(&record)?;
        }

        for link in &self.links {
            store.link(&link.from.record(), &link.name, &link.to.record())?;
        }

        Ok(Summary {
            records: self.records.len(),
            links: self.links.len(),
        })
    }
}
