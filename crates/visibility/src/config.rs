//! Visibility configuration loaded from TOML or JSON.

use crate::{Error, PropertyTable, Result, RoleVisibilityTable, TableKind};
use serde_json::Value;
use std::path::Path;

/// All visibility tables of a deployment.
///
/// ```toml
/// [roles.user]
/// self = ["id", "name", "email", "groups"]
/// stranger = ["id", "name"]
///
/// [context.user]
/// root = ["id", "name", "email", "groups"]
/// members = ["id", "name"]
///
/// [ensure]
/// user = ["groups"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityConfig {
    pub roles: RoleVisibilityTable,
    pub context: PropertyTable,
    pub ensure: PropertyTable,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            roles: RoleVisibilityTable::new(),
            context: PropertyTable::context(),
            ensure: PropertyTable::ensure(),
        }
    }
}

impl VisibilityConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(toml: &str) -> Result<Self> {
        let value: Value = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Parse configuration from a JSON string.
    pub fn parse_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Build validated tables from a `{ roles, context, ensure }` document.
    ///
    /// Missing sections are empty tables; other top-level keys are ignored so
    /// the tables can be embedded in a larger configuration file.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(sections) = value else {
            return Err(Error::Parse("visibility config must be a table".to_string()));
        };

        let roles = match sections.get("roles") {
            Some(roles) => RoleVisibilityTable::from_value(roles)?,
            None => RoleVisibilityTable::new(),
        };
        let context = match sections.get("context") {
            Some(context) => PropertyTable::from_value(TableKind::ContextVisibility, context)?,
            None => PropertyTable::context(),
        };
        let ensure = match sections.get("ensure") {
            Some(ensure) => PropertyTable::from_value(TableKind::EnsureRelations, ensure)?,
            None => PropertyTable::ensure(),
        };

        Ok(Self {
            roles,
            context,
            ensure,
        })
    }
}
