//! Whitelist visibility tables and resolution.
//!
//! Core principle: **a property is visible only if every applicable table
//! explicitly lists it.** Visible sets are always computed by intersecting
//! whitelists, never by subtracting a blacklist.
//!
//! # Tables
//!
//! - [`RoleVisibilityTable`]: `type -> { role -> [property] }`, the maximal
//!   set a role may ever see.
//! - [`PropertyTable`]: `type -> [property] | { label -> [property] }`, used
//!   for context-specific narrowing and for relations that must be loaded.
//!   The label form needs a context designator at serialization time.
//!
//! # Errors
//!
//! Shape problems are reported as [`ConfigurationError`]s when the tables are
//! built, so a deployment with malformed tables fails at startup.

mod config;
mod error;
mod property;
mod resolve;
mod table;

pub use config::VisibilityConfig;
pub use error::{ConfigurationError, Error, Result};
pub use property::{PropertySet, Role};
pub use resolve::Visibility;
pub use table::{PropertySpec, PropertyTable, RoleTable, RoleVisibilityTable, TableKind};
