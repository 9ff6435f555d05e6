//! Record graph model and data-access boundary.
//!
//! This crate defines the records the serialization engine walks and the
//! collaborator interface it uses to populate relations on demand.
//!
//! # Core Concepts
//!
//! ## Record
//!
//! A [`Record`] has a type tag, an optional identity, an attribute map and a
//! map of populated [`Relation`]s. Every record also carries the
//! [`Accessor`] it is being viewed by and the [`RelationChain`] it was
//! reached through. Both are stamped structurally: attaching a relation with
//! [`Record::set_relation`] propagates the accessor and extends the chain.
//!
//! ## RecordSource
//!
//! A [`RecordSource`] loads a named relation of a record. The engine only
//! depends on this trait; [`SqliteStore`] is a concrete implementation.
//!
//! # Example
//!
//! ```no_run
//! use records::{Accessor, Record, RelationKind, SqliteStore};
//! use serde_json::json;
//!
//! let store = SqliteStore::open("records.db")?;
//! store.define_relation("user", "groups", RelationKind::Many)?;
//!
//! let alice = Record::new("user").with_id(1).with_attribute("name", "alice");
//! let staff = Record::new("group").with_id(10).with_attribute("title", "staff");
//! store.insert(&alice)?;
//! store.insert(&staff)?;
//! store.link(&alice, "groups", &staff)?;
//!
//! let root = store.fetch("user", &json!(1), Accessor::new(json!({ "id": 1 })))?;
//! assert!(root.relation_chain().is_root());
//! # Ok::<(), records::Error>(())
//! ```

mod error;
mod record;
mod source;
mod store;

pub use error::{Error, Result};
pub use record::{Accessor, Record, RecordCollection, Relation, RelationChain};
pub use source::{BoxError, RecordSource};
pub use store::{RelationKind, SqliteStore};
