//! Engine configuration and per-call options.

use crate::ContextDesignator;
use records::Accessor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use visibility::PropertyTable;

/// What a single-record relation slot shows when its record is absent.
///
/// A relation whose record is an empty placeholder always shows `null`,
/// whichever policy is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentRelation {
    /// Drop the relation key from the parent entirely.
    #[default]
    Omit,
    /// Keep the relation key with an explicit `null`.
    Null,
}

/// Engine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Load every requested relation, even ones the requester cannot see.
    pub force_load_invisible_relations: bool,

    /// Do not load relations for records that have no identity yet.
    pub skip_unsaved_records: bool,

    pub absent_relation: AbsentRelation,
}

/// Options for a single serialization call.
#[derive(Clone)]
pub struct SerializeOptions {
    pub context_visible: PropertyTable,
    pub ensure_relations: PropertyTable,
    pub context_designator: Option<Arc<dyn ContextDesignator>>,
    /// Serialize on behalf of this accessor instead of the record's own.
    pub accessor: Option<Accessor>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            context_visible: PropertyTable::context(),
            ensure_relations: PropertyTable::ensure(),
            context_designator: None,
            accessor: None,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_visible(mut self, table: PropertyTable) -> Self {
        self.context_visible = table;
        self
    }

    pub fn ensure_relations(mut self, table: PropertyTable) -> Self {
        self.ensure_relations = table;
        self
    }

    pub fn designator(mut self, designator: Arc<dyn ContextDesignator>) -> Self {
        self.context_designator = Some(designator);
        self
    }

    pub fn accessor(mut self, accessor: Accessor) -> Self {
        self.accessor = Some(accessor);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_from_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
force_load_invisible_relations = true
absent_relation = "null"
"#,
        )
        .unwrap();
        assert!(config.force_load_invisible_relations);
        assert!(!config.skip_unsaved_records);
        assert_eq!(config.absent_relation, AbsentRelation::Null);
    }

    #[test]
    fn engine_config_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.absent_relation, AbsentRelation::Omit);
    }
}
