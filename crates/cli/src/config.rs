//! Configuration loading from sift.toml.

use crate::error::{Error, Result};
use engine::{
    ChainDesignator, EngineConfig, Registry, RoleDeterminer, RuleRoleDeterminer, SerializeOptions,
};
use records::Accessor;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use visibility::VisibilityConfig;

/// Top-level configuration.
///
/// ```toml
/// database = "sift.db"
///
/// [engine]
/// absent_relation = "null"
///
/// [types.user]
/// default_role = "stranger"
///
/// [[types.user.rules]]
/// role = "self"
/// attribute = "id"
/// accessor_field = "id"
///
/// [roles.user]
/// self = ["id", "name", "email"]
/// stranger = ["id", "name"]
///
/// [designator.via]
/// members = "peer"
/// ```
#[derive(Debug)]
pub struct Config {
    /// Path of the record database.
    pub database: PathBuf,

    pub engine: EngineConfig,

    /// Role rules per record type.
    pub types: HashMap<String, RuleRoleDeterminer>,

    /// Designator for label-keyed tables; `None` when no `[designator]`
    /// section is present.
    pub designator: Option<ChainDesignator>,

    /// Role, context and ensure-relations tables.
    pub visibility: VisibilityConfig,
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default = "default_database")]
    database: PathBuf,

    #[serde(default)]
    engine: EngineConfig,

    #[serde(default)]
    types: HashMap<String, RuleRoleDeterminer>,

    designator: Option<ChainDesignator>,
}

fn default_database() -> PathBuf {
    PathBuf::from("sift.db")
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let value: Value = toml::from_str(toml)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        let document: Document = serde_json::from_value(value.clone())
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?;
        let visibility = VisibilityConfig::from_value(&value)?;

        Ok(Self {
            database: document.database,
            engine: document.engine,
            types: document.types,
            designator: document.designator,
            visibility,
        })
    }

    /// Pair every role table with its rules.
    ///
    /// Fails if a type has rules but no role table, or the other way round.
    pub fn registry(&self) -> Result<Registry> {
        let determiners: HashMap<String, Arc<dyn RoleDeterminer>> = self
            .types
            .iter()
            .map(|(type_tag, rules)| {
                (type_tag.clone(), Arc::new(rules.clone()) as Arc<dyn RoleDeterminer>)
            })
            .collect();
        Ok(Registry::from_tables(self.visibility.roles.clone(), determiners)?)
    }

    /// Per-call options for `accessor`.
    pub fn options(&self, accessor: Accessor) -> SerializeOptions {
        let mut options = SerializeOptions::new()
            .context_visible(self.visibility.context.clone())
            .ensure_relations(self.visibility.ensure.clone())
            .accessor(accessor);
        if let Some(designator) = &self.designator {
            options = options.designator(Arc::new(designator.clone()));
        }
        options
    }
}
