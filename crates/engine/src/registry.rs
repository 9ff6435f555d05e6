//! Per-type capabilities: how to pick a role and what each role may see.

use async_trait::async_trait;
use records::{Accessor, BoxError, Record};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use visibility::{ConfigurationError, Role, RoleTable, RoleVisibilityTable};

/// Resolves how a requester relates to a record.
#[async_trait]
pub trait RoleDeterminer: Send + Sync {
    async fn determine(&self, record: &Record, accessor: &Accessor) -> Result<Role, BoxError>;
}

/// A role determiner backed by a plain function.
pub struct RoleFn<F>(F);

/// Wrap a synchronous function as a [`RoleDeterminer`].
pub fn role_fn<F>(f: F) -> RoleFn<F>
where
    F: Fn(&Record, &Accessor) -> Role + Send + Sync,
{
    RoleFn(f)
}

#[async_trait]
impl<F> RoleDeterminer for RoleFn<F>
where
    F: Fn(&Record, &Accessor) -> Role + Send + Sync,
{
    async fn determine(&self, record: &Record, accessor: &Accessor) -> Result<Role, BoxError> {
        Ok((self.0)(record, accessor))
    }
}

/// A role granted when a record attribute equals an accessor field.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleRule {
    pub role: Role,
    pub attribute: String,
    pub accessor_field: String,
}

impl RoleRule {
    fn matches(&self, record: &Record, accessor: &Accessor) -> bool {
        match (record.attribute(&self.attribute), accessor.get(&self.accessor_field)) {
            (Some(value), Some(field)) => !value.is_null() && value == field,
            _ => false,
        }
    }
}

/// Declarative role determiner: the first matching rule wins, otherwise the
/// default role applies.
///
/// ```toml
/// default_role = "stranger"
///
/// [[rules]]
/// role = "self"
/// attribute = "id"
/// accessor_field = "id"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRoleDeterminer {
    #[serde(default)]
    pub rules: Vec<RoleRule>,
    pub default_role: Role,
}

#[async_trait]
impl RoleDeterminer for RuleRoleDeterminer {
    async fn determine(&self, record: &Record, accessor: &Accessor) -> Result<Role, BoxError> {
        let role = self
            .rules
            .iter()
            .find(|rule| rule.matches(record, accessor))
            .map(|rule| rule.role.clone())
            .unwrap_or_else(|| self.default_role.clone());
        Ok(role)
    }
}

/// Everything the engine needs to know about one record type.
#[derive(Clone)]
pub struct TypeConfig {
    determiner: Arc<dyn RoleDeterminer>,
    roles: RoleTable,
}

impl std::fmt::Debug for TypeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeConfig")
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl TypeConfig {
    pub fn new(determiner: Arc<dyn RoleDeterminer>, roles: RoleTable) -> Self {
        Self { determiner, roles }
    }

    pub fn determiner(&self) -> &dyn RoleDeterminer {
        self.determiner.as_ref()
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }
}

/// Type capabilities keyed by type tag.
///
/// Registering a type always supplies both a role determiner and a role
/// table, so neither can be forgotten for a registered type.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<String, TypeConfig>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Pair loaded role tables with determiners supplied in code.
    ///
    /// Fails if a table has no determiner or a determiner has no table.
    pub fn from_tables(
        tables: RoleVisibilityTable,
        mut determiners: HashMap<String, Arc<dyn RoleDeterminer>>,
    ) -> Result<Self, ConfigurationError> {
        let table_tags: BTreeSet<String> = tables.type_tags().map(String::from).collect();
        let determiner_tags: BTreeSet<String> = determiners.keys().cloned().collect();

        if let Some(type_tag) = table_tags.difference(&determiner_tags).next() {
            return Err(ConfigurationError::MissingRoleDeterminer {
                type_tag: type_tag.clone(),
            });
        }
        if let Some(type_tag) = determiner_tags.difference(&table_tags).next() {
            return Err(ConfigurationError::MissingVisibilityTable {
                type_tag: type_tag.clone(),
            });
        }

        let mut types = HashMap::new();
        for (type_tag, roles) in tables.into_types() {
            if let Some(determiner) = determiners.remove(&type_tag) {
                types.insert(type_tag, TypeConfig::new(determiner, roles));
            }
        }
        Ok(Self { types })
    }

    pub fn lookup(&self, type_tag: &str) -> Result<&TypeConfig, ConfigurationError> {
        self.types
            .get(type_tag)
            .ok_or_else(|| ConfigurationError::MissingRoleDeterminer {
                type_tag: type_tag.to_string(),
            })
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.types.contains_key(type_tag)
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    types: HashMap<String, TypeConfig>,
}

impl RegistryBuilder {
    pub fn register(
        mut self,
        type_tag: impl Into<String>,
        determiner: impl RoleDeterminer + 'static,
        roles: RoleTable,
    ) -> Self {
        self.types
            .insert(type_tag.into(), TypeConfig::new(Arc::new(determiner), roles));
        self
    }

    pub fn build(self) -> Registry {
        Registry { types: self.types }
    }
}
