//! Permission-aware serialization of record graphs.
//!
//! Given a root record and the accessor viewing it, the [`Engine`] decides
//! which attributes and relations that accessor may see, loads only the
//! relations needed for that decision and produces a pruned, whitelist-only
//! JSON value.
//!
//! # Overview
//!
//! - **Registry**: per-type [`RoleDeterminer`] plus role visibility table.
//! - **Context designation**: an optional [`ContextDesignator`] labels a
//!   record by the relation path it was reached through; label-keyed tables
//!   narrow visibility per label.
//! - **Relation loading**: requested relations are made available by a
//!   [`RelationEnsurer`], by default straight from the [`RecordSource`].
//! - **Pruning**: relations outside the visible set are cut before the
//!   engine recurses, so traversal depth is bounded by the tables rather
//!   than by the graph.
//!
//! A record that must not be revealed serializes to `None`. As a collection
//! member it disappears without a trace.
//!
//! # Example
//!
//! ```no_run
//! use engine::{Engine, Registry, SerializeOptions, role_fn};
//! use records::{Accessor, Record, SqliteStore};
//! use visibility::{Role, RoleTable};
//!
//! # async fn example(store: SqliteStore) -> engine::Result<()> {
//! let registry = Registry::builder()
//!     .register(
//!         "user",
//!         role_fn(|_, _| Role::from("stranger")),
//!         RoleTable::new().with_role("stranger", ["id", "public"]),
//!     )
//!     .build();
//! let engine = Engine::new(registry);
//!
//! let record = Record::new("user")
//!     .with_id(1)
//!     .with_attribute("secret", "x")
//!     .with_attribute("public", "y")
//!     .as_root(Accessor::anonymous());
//! let value = engine.serialize(&record, &SerializeOptions::new(), &store).await?;
//! assert_eq!(value, Some(serde_json::json!({ "id": 1, "public": "y" })));
//! # Ok(())
//! # }
//! ```

mod collection;
mod designator;
mod error;
mod loader;
mod options;
mod registry;
mod serializer;

#[cfg(test)]
mod testing;

pub use designator::{
    ArgumentBuilder, ChainDesignator, ContextDesignator, FnDesignator, default_arguments,
    designator_fn,
};
pub use error::{Error, Result};
pub use loader::{DefaultEnsurer, Populated, RelationEnsurer};
pub use options::{AbsentRelation, EngineConfig, SerializeOptions};
pub use registry::{
    Registry, RegistryBuilder, RoleDeterminer, RoleFn, RoleRule, RuleRoleDeterminer, TypeConfig,
    role_fn,
};
pub use serializer::{Engine, EngineBuilder, Projection};
