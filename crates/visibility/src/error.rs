//! Visibility configuration errors.

use crate::TableKind;
use thiserror::Error;

/// A serialization configuration mistake.
///
/// Every variant describes incorrect setup rather than bad data, so none of
/// them is recoverable at runtime: the current serialization call is aborted
/// and the error is reported as a server-side failure.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// No access evaluator is registered for the record type.
    #[error("no role determiner configured for type '{type_tag}'")]
    MissingRoleDeterminer { type_tag: String },

    /// No role visibility table is registered for the record type.
    #[error("no role visibility table configured for type '{type_tag}'")]
    MissingVisibilityTable { type_tag: String },

    /// A role's visible set is not an array of property names.
    #[error("visible set for role '{role}' of type '{type_tag}' is not an array of property names")]
    NonArrayVisibleSet { type_tag: String, role: String },

    /// The access evaluator produced a role the table does not mention.
    #[error("role '{role}' has no visible set for type '{type_tag}'")]
    UndefinedRoleVisibility { type_tag: String, role: String },

    /// A table entry is neither a property array nor a label-keyed map.
    #[error("{table} entry for type '{type_tag}' is neither an array nor a label map")]
    NonObjectContextTable { type_tag: String, table: TableKind },

    /// A label-keyed table entry was reached without a context designator.
    #[error("{table} entry for type '{type_tag}' is keyed by context label but no context designator was supplied")]
    MissingContextDesignator { type_tag: String, table: TableKind },

    /// A label-keyed table entry has no property array for the label.
    #[error("{table} entry for type '{type_tag}' has no property array for context label '{label}'")]
    MalformedContextTableEntry {
        type_tag: String,
        table: TableKind,
        label: String,
    },
}

/// Errors raised while loading visibility configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A table has an invalid shape.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failed to parse a configuration document.
    #[error("failed to parse visibility config: {0}")]
    Parse(String),

    /// An I/O error occurred while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
