//! Context designation.
//!
//! A context designator labels a record by the path it was reached through,
//! so the same type can be projected differently at the root and deep inside
//! a relation. Label-keyed context and ensure-relations tables select their
//! property list with that label.

use async_trait::async_trait;
use records::{BoxError, Record};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Produces the context label for a record.
///
/// `args` come from the engine's [`ArgumentBuilder`]; by default they are
/// `[type_tag, relation_chain, id]`.
#[async_trait]
pub trait ContextDesignator: Send + Sync {
    async fn designate(&self, args: Vec<Value>) -> Result<String, BoxError>;
}

/// Builds the designator arguments from the record being serialized.
pub type ArgumentBuilder = Arc<dyn Fn(&Record) -> Vec<Value> + Send + Sync>;

/// `[type_tag, relation_chain, id]`, with `null` for a record without identity.
pub fn default_arguments(record: &Record) -> Vec<Value> {
    vec![
        Value::String(record.type_tag().to_string()),
        record.relation_chain().to_value(),
        record.id().cloned().unwrap_or(Value::Null),
    ]
}

/// A context designator backed by an async function.
pub struct FnDesignator<F>(F);

/// Wrap an async function as a [`ContextDesignator`].
pub fn designator_fn<F, Fut>(f: F) -> Arc<dyn ContextDesignator>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BoxError>> + Send + 'static,
{
    Arc::new(FnDesignator(f))
}

#[async_trait]
impl<F, Fut> ContextDesignator for FnDesignator<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, BoxError>> + Send,
{
    async fn designate(&self, args: Vec<Value>) -> Result<String, BoxError> {
        (self.0)(args).await
    }
}

/// Labels records by the last relation they were reached through.
///
/// A root record gets `root`; anything else gets the last relation name,
/// renamed through `via` when it has an entry there. Expects the default
/// argument layout, where the relation chain is the second argument.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainDesignator {
    #[serde(default = "default_root_label")]
    pub root: String,
    #[serde(default)]
    pub via: HashMap<String, String>,
}

fn default_root_label() -> String {
    "root".to_string()
}

impl Default for ChainDesignator {
    fn default() -> Self {
        Self {
            root: default_root_label(),
            via: HashMap::new(),
        }
    }
}

#[async_trait]
impl ContextDesignator for ChainDesignator {
    async fn designate(&self, args: Vec<Value>) -> Result<String, BoxError> {
        let chain = args
            .get(1)
            .and_then(Value::as_array)
            .ok_or("chain designator expects the relation chain as its second argument")?;
        let last = match chain.last() {
            None => return Ok(self.root.clone()),
            Some(name) => name.as_str().ok_or("relation chain entries must be strings")?,
        };
        Ok(self
            .via
            .get(last)
            .cloned()
            .unwrap_or_else(|| last.to_string()))
    }
}
