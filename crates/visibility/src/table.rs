//! Role, context and ensure-relations tables.
//!
//! Tables are validated when they are built or parsed, so a malformed shape
//! fails at startup instead of on the first request that reaches it. The only
//! checks left for serialization time are the ones that depend on runtime
//! values: which role was produced and which context label was designated.

use crate::{ConfigurationError, Error, PropertySet, Result, Role};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Which table a lookup came from; used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Roles,
    ContextVisibility,
    EnsureRelations,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Roles => "role visibility",
            TableKind::ContextVisibility => "context visibility",
            TableKind::EnsureRelations => "ensure-relations",
        };
        f.write_str(name)
    }
}

/// `role -> [property]` for a single record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    roles: HashMap<Role, PropertySet>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the visible set of a role.
    pub fn with_role<I, S>(mut self, role: impl Into<Role>, visible: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.insert(role.into(), PropertySet::new(visible));
        self
    }

    /// The maximal set of properties `role` may ever see.
    pub fn visible_for(
        &self,
        type_tag: &str,
        role: &Role,
    ) -> std::result::Result<&PropertySet, ConfigurationError> {
        self.roles
            .get(role)
            .ok_or_else(|| ConfigurationError::UndefinedRoleVisibility {
                type_tag: type_tag.to_string(),
                role: role.to_string(),
            })
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.keys()
    }

    fn from_value(type_tag: &str, value: &Value) -> std::result::Result<Self, ConfigurationError> {
        let Value::Object(entries) = value else {
            return Err(ConfigurationError::NonObjectContextTable {
                type_tag: type_tag.to_string(),
                table: TableKind::Roles,
            });
        };

        let mut table = Self::new();
        for (role, visible) in entries {
            let set = property_array(visible).ok_or_else(|| ConfigurationError::NonArrayVisibleSet {
                type_tag: type_tag.to_string(),
                role: role.clone(),
            })?;
            table.roles.insert(Role::new(role.as_str()), set);
        }
        Ok(table)
    }
}

/// `typeTag -> { role -> [property] }` across all record types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleVisibilityTable {
    types: HashMap<String, RoleTable>,
}

impl RoleVisibilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, type_tag: impl Into<String>, table: RoleTable) -> Self {
        self.types.insert(type_tag.into(), table);
        self
    }

    pub fn get(&self, type_tag: &str) -> Option<&RoleTable> {
        self.types.get(type_tag)
    }

    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn into_types(self) -> impl Iterator<Item = (String, RoleTable)> {
        self.types.into_iter()
    }

    /// Parse `{ type: { role: [property] } }`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let entries = table_object(value, TableKind::Roles)?;
        let mut table = Self::new();
        for (type_tag, roles) in entries {
            table
                .types
                .insert(type_tag.clone(), RoleTable::from_value(type_tag, roles)?);
        }
        Ok(table)
    }
}

/// The per-type entry of a context-visibility or ensure-relations table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertySpec {
    /// One list that applies regardless of context.
    Uniform(PropertySet),
    /// Lists selected by the label a context designator produces.
    ByContext(HashMap<String, PropertySet>),
}

impl PropertySpec {
    /// Whether selecting from this entry needs a context label.
    pub fn requires_label(&self) -> bool {
        matches!(self, PropertySpec::ByContext(_))
    }

    /// Pick the property list for `label`.
    ///
    /// `label` is `None` when no context designator is available.
    pub fn select(
        &self,
        type_tag: &str,
        table: TableKind,
        label: Option<&str>,
    ) -> std::result::Result<&PropertySet, ConfigurationError> {
        match self {
            PropertySpec::Uniform(set) => Ok(set),
            PropertySpec::ByContext(by_label) => {
                let label = label.ok_or_else(|| ConfigurationError::MissingContextDesignator {
                    type_tag: type_tag.to_string(),
                    table,
                })?;
                by_label
                    .get(label)
                    .ok_or_else(|| ConfigurationError::MalformedContextTableEntry {
                        type_tag: type_tag.to_string(),
                        table,
                        label: label.to_string(),
                    })
            }
        }
    }

    fn from_value(
        type_tag: &str,
        table: TableKind,
        value: &Value,
    ) -> std::result::Result<Self, ConfigurationError> {
        match value {
            Value::Array(_) => property_array(value).map(PropertySpec::Uniform).ok_or_else(|| {
                ConfigurationError::NonObjectContextTable {
                    type_tag: type_tag.to_string(),
                    table,
                }
            }),
            Value::Object(entries) => {
                let mut by_label = HashMap::with_capacity(entries.len());
                for (label, names) in entries {
                    let set = property_array(names).ok_or_else(|| {
                        ConfigurationError::MalformedContextTableEntry {
                            type_tag: type_tag.to_string(),
                            table,
                            label: label.clone(),
                        }
                    })?;
                    by_label.insert(label.clone(), set);
                }
                Ok(PropertySpec::ByContext(by_label))
            }
            _ => Err(ConfigurationError::NonObjectContextTable {
                type_tag: type_tag.to_string(),
                table,
            }),
        }
    }
}

/// `typeTag -> [property] | { label -> [property] }`.
///
/// Used both for context-specific visibility and for the relations that must
/// be loaded before a record is serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTable {
    kind: TableKind,
    types: HashMap<String, PropertySpec>,
}

impl PropertyTable {
    /// An empty context-visibility table.
    pub fn context() -> Self {
        Self::empty(TableKind::ContextVisibility)
    }

    /// An empty ensure-relations table.
    pub fn ensure() -> Self {
        Self::empty(TableKind::EnsureRelations)
    }

    fn empty(kind: TableKind) -> Self {
        Self {
            kind,
            types: HashMap::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Use the same list for `type_tag` in every context.
    pub fn uniform<I, S>(mut self, type_tag: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types
            .insert(type_tag.into(), PropertySpec::Uniform(PropertySet::new(names)));
        self
    }

    /// Add the list for `label` to `type_tag`'s label map.
    ///
    /// A uniform entry for the same type is replaced by the map.
    pub fn by_context<I, S>(
        mut self,
        type_tag: impl Into<String>,
        label: impl Into<String>,
        names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self
            .types
            .entry(type_tag.into())
            .or_insert_with(|| PropertySpec::ByContext(HashMap::new()));
        if let PropertySpec::Uniform(_) = entry {
            *entry = PropertySpec::ByContext(HashMap::new());
        }
        if let PropertySpec::ByContext(by_label) = entry {
            by_label.insert(label.into(), PropertySet::new(names));
        }
        self
    }

    pub fn get(&self, type_tag: &str) -> Option<&PropertySpec> {
        self.types.get(type_tag)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse `{ type: [property] | { label: [property] } }`.
    pub fn from_value(kind: TableKind, value: &Value) -> Result<Self> {
        let entries = table_object(value, kind)?;
        let mut table = Self::empty(kind);
        for (type_tag, spec) in entries {
            table
                .types
                .insert(type_tag.clone(), PropertySpec::from_value(type_tag, kind, spec)?);
        }
        Ok(table)
    }
}

fn table_object(value: &Value, kind: TableKind) -> Result<&serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::Parse(format!("{kind} table must be a map keyed by type")))
}

fn property_array(value: &Value) -> Option<PropertySet> {
    let items = value.as_array()?;
    let mut names = Vec::with_capacity(items.len());
    for item in items {
        names.push(item.as_str()?.to_string());
    }
    Some(PropertySet::new(names))
}
