//! Relation loading.

use crate::{Error, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use records::{BoxError, Record, RecordSource, Relation};
use serde_json::Value;
use visibility::PropertySet;

/// What ensuring one requested name produced.
#[derive(Debug)]
pub enum Populated {
    /// Nothing to change; the record already holds what is needed.
    Unchanged,
    /// Install this value as the relation of the requested name.
    Relation(Relation),
    /// Set a derived attribute instead of loading a relation.
    Attribute { name: String, value: Value },
}

/// Makes sure a requested relation is available on a record.
///
/// Deployments can replace the default to compute derived attributes or to
/// load relations through a different path. Every requested name of one
/// record is ensured concurrently against the same record state; the
/// returned effects are applied once all of them have finished.
#[async_trait]
pub trait RelationEnsurer: Send + Sync {
    async fn ensure(
        &self,
        record: &Record,
        name: &str,
        source: &dyn RecordSource,
    ) -> std::result::Result<Populated, BoxError>;
}

/// Keeps populated relations as they are and loads the rest from the source.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEnsurer;

#[async_trait]
impl RelationEnsurer for DefaultEnsurer {
    async fn ensure(
        &self,
        record: &Record,
        name: &str,
        source: &dyn RecordSource,
    ) -> std::result::Result<Populated, BoxError> {
        if record.has_relation(name) {
            return Ok(Populated::Unchanged);
        }
        let relation = source.load_relation(record, name).await?;
        Ok(Populated::Relation(relation))
    }
}

/// Which requested relations to load for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadPlan {
    pub names: Vec<String>,
    /// Names loaded only because loading was forced.
    pub forced: Vec<String>,
}

impl LoadPlan {
    pub fn new(requested: &PropertySet, visible: &PropertySet, force: bool) -> Self {
        let (names, skipped): (Vec<String>, Vec<String>) = requested
            .iter()
            .map(String::from)
            .partition(|name| visible.contains(name));
        if force {
            Self {
                names: requested.iter().map(String::from).collect(),
                forced: skipped,
            }
        } else {
            Self {
                names,
                forced: Vec::new(),
            }
        }
    }
}

/// Ensure every name of `names` on `record`, concurrently.
pub(crate) async fn ensure_all(
    record: &mut Record,
    names: &[String],
    ensurer: &dyn RelationEnsurer,
    source: &dyn RecordSource,
) -> Result<()> {
    if names.is_empty() {
        return Ok(());
    }

    let current: &Record = record;
    let effects = try_join_all(names.iter().map(|name| async move {
        ensurer
            .ensure(current, name, source)
            .await
            .map(|populated| (name, populated))
    }))
    .await
    .map_err(Error::Source)?;

    for (name, populated) in effects {
        match populated {
            Populated::Unchanged => {}
            Populated::Relation(relation) => record.set_relation(name.as_str(), relation),
            Populated::Attribute { name, value } => record.set_attribute(name, value),
        }
    }
    Ok(())
}
