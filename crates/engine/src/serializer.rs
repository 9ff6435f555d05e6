//! The recursive per-record serialization pipeline.

use crate::designator::{ArgumentBuilder, ContextDesignator, default_arguments};
use crate::loader::{DefaultEnsurer, LoadPlan, RelationEnsurer, ensure_all};
use crate::options::{AbsentRelation, EngineConfig, SerializeOptions};
use crate::registry::Registry;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use records::{Record, RecordCollection, RecordSource, Relation};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use visibility::{PropertySet, PropertySpec, PropertyTable, Visibility};

/// A serialized record together with the pruned record it was built from.
#[derive(Debug, Clone)]
pub struct Projection {
    /// The whitelisted value; `None` when the record must not be revealed.
    pub value: Option<Value>,
    /// The record after loading and pruning, with only visible attributes
    /// and relations left. `None` exactly when `value` is.
    pub snapshot: Option<Record>,
}

impl Projection {
    fn absent() -> Self {
        Self {
            value: None,
            snapshot: None,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}

/// What a relation contributes to its parent's output.
enum Slot {
    Omit,
    Value(Value),
}

/// Permission-aware serializer for record graphs.
///
/// Serialization never mutates the caller's record: each call works on a
/// copy, loads and prunes relations there, and hands the pruned copy back
/// through [`Engine::project`].
pub struct Engine {
    registry: Registry,
    config: EngineConfig,
    argument_builder: ArgumentBuilder,
    ensurer: Arc<dyn RelationEnsurer>,
}

impl Engine {
    pub fn builder(registry: Registry) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    /// An engine with default settings.
    pub fn new(registry: Registry) -> Self {
        Self::builder(registry).build()
    }

    /// Serialize `record` for its accessor (or the options' override).
    ///
    /// Returns `None` when the record must not be revealed at all.
    pub async fn serialize(
        &self,
        record: &Record,
        options: &SerializeOptions,
        source: &dyn RecordSource,
    ) -> Result<Option<Value>> {
        Ok(self.project(record, options, source).await?.value)
    }

    /// Serialize `record` and keep the pruned snapshot alongside the value.
    pub async fn project(
        &self,
        record: &Record,
        options: &SerializeOptions,
        source: &dyn RecordSource,
    ) -> Result<Projection> {
        let record = match &options.accessor {
            Some(accessor) => record.clone().as_root(accessor.clone()),
            None => record.clone(),
        };
        debug!(
            type_tag = record.type_tag(),
            chain = %record.relation_chain(),
            "serializing record"
        );
        self.visit(record, options, source).await
    }

    /// Steps of one record visit, in order: resolve the role and the visible
    /// set, load requested relations, prune relations outside the visible
    /// set, recurse into what is left and assemble the output.
    pub(crate) fn visit<'a>(
        &'a self,
        mut record: Record,
        options: &'a SerializeOptions,
        source: &'a dyn RecordSource,
    ) -> BoxFuture<'a, Result<Projection>> {
        async move {
            let type_tag = record.type_tag().to_string();
            let config = self.registry.lookup(&type_tag)?;

            let role = config
                .determiner()
                .determine(&record, record.accessor())
                .await
                .map_err(Error::Source)?;
            let role_visible = config.roles().visible_for(&type_tag, &role)?;
            if role_visible.is_empty() {
                trace!(type_tag = %type_tag, %role, "role sees nothing");
                return Ok(Projection::absent());
            }

            let mut label =
                ContextLabel::new(options.context_designator.as_ref(), &self.argument_builder);
            let context_visible = match options.context_visible.get(&type_tag) {
                Some(spec) => Some(
                    select(spec, &options.context_visible, &type_tag, &mut label, &record).await?,
                ),
                None => None,
            };
            let visible = match Visibility::resolve(role_visible, context_visible) {
                Visibility::Absent => {
                    trace!(type_tag = %type_tag, %role, "context leaves nothing visible");
                    return Ok(Projection::absent());
                }
                Visibility::Visible(visible) => visible,
            };
            trace!(
                type_tag = %type_tag,
                %role,
                chain = %record.relation_chain(),
                visible = visible.len(),
                "resolved visibility"
            );

            if record.is_empty() {
                trace!(type_tag = %type_tag, "empty record, nothing to load");
            } else if self.config.skip_unsaved_records && !record.is_saved() {
                trace!(type_tag = %type_tag, "unsaved record, skipping relation loading");
            } else if let Some(spec) = options.ensure_relations.get(&type_tag) {
                let requested =
                    select(spec, &options.ensure_relations, &type_tag, &mut label, &record).await?;
                let plan = LoadPlan::new(
                    requested,
                    &visible,
                    self.config.force_load_invisible_relations,
                );
                if cfg!(debug_assertions) && !plan.forced.is_empty() {
                    warn!(
                        type_tag = %type_tag,
                        relations = ?plan.forced,
                        "loading relations outside the visible set because force_load_invisible_relations is enabled"
                    );
                }
                ensure_all(&mut record, &plan.names, self.ensurer.as_ref(), source).await?;
            }

            record.retain_relations(|name| visible.contains(name));
            record.retain_attributes(|name| visible.contains(name));

            let relations: Vec<(String, Relation)> = visible
                .iter()
                .filter_map(|name| record.remove_relation(name).map(|r| (name.to_string(), r)))
                .collect();
            let visited = try_join_all(relations.into_iter().map(|(name, relation)| async move {
                let (slot, kept) = self.visit_relation(relation, options, source).await?;
                Ok::<_, Error>((name, slot, kept))
            }))
            .await?;

            let mut slots = HashMap::with_capacity(visited.len());
            for (name, slot, kept) in visited {
                if let Some(kept) = kept {
                    record.set_relation(name.as_str(), kept);
                }
                slots.insert(name, slot);
            }

            let value = assemble(&record, &visible, slots);
            Ok(Projection {
                value: Some(value),
                snapshot: Some(record),
            })
        }
        .boxed()
    }

    /// Serialize one relation value. Returns the parent's slot and the
    /// pruned relation to keep on the snapshot.
    async fn visit_relation(
        &self,
        relation: Relation,
        options: &SerializeOptions,
        source: &dyn RecordSource,
    ) -> Result<(Slot, Option<Relation>)> {
        match relation {
            Relation::Null => Ok((Slot::Value(Value::Null), Some(Relation::Null))),
            Relation::One(child) => {
                let placeholder = child.is_empty();
                let projection = self.visit(*child, options, source).await?;
                let slot = match projection.value {
                    None if placeholder => Slot::Value(Value::Null),
                    None => match self.config.absent_relation {
                        AbsentRelation::Omit => Slot::Omit,
                        AbsentRelation::Null => Slot::Value(Value::Null),
                    },
                    Some(value) if is_empty_object(&value) => Slot::Value(Value::Null),
                    Some(value) => Slot::Value(value),
                };
                Ok((slot, projection.snapshot.map(Relation::one)))
            }
            Relation::Many(collection) => {
                let (values, kept) = self.visit_collection(collection, options, source).await?;
                Ok((
                    Slot::Value(Value::Array(values)),
                    Some(Relation::Many(RecordCollection::new(kept)?)),
                ))
            }
        }
    }
}

/// Memoized context label of one record visit.
///
/// The designator runs at most once per record, however many tables need
/// the label.
struct ContextLabel<'a> {
    designator: Option<&'a Arc<dyn ContextDesignator>>,
    argument_builder: &'a ArgumentBuilder,
    resolved: Option<String>,
}

impl<'a> ContextLabel<'a> {
    fn new(
        designator: Option<&'a Arc<dyn ContextDesignator>>,
        argument_builder: &'a ArgumentBuilder,
    ) -> Self {
        Self {
            designator,
            argument_builder,
            resolved: None,
        }
    }

    async fn resolve(&mut self, record: &Record) -> Result<Option<&str>> {
        let Some(designator) = self.designator else {
            return Ok(None);
        };
        if self.resolved.is_none() {
            let args = (self.argument_builder)(record);
            let label = designator.designate(args).await.map_err(Error::Source)?;
            self.resolved = Some(label);
        }
        Ok(self.resolved.as_deref())
    }
}

/// Pick the property list of `spec`, designating a label only if needed.
async fn select<'t>(
    spec: &'t PropertySpec,
    table: &PropertyTable,
    type_tag: &str,
    label: &mut ContextLabel<'_>,
    record: &Record,
) -> Result<&'t PropertySet> {
    let label = if spec.requires_label() {
        label.resolve(record).await?
    } else {
        None
    };
    Ok(spec.select(type_tag, table.kind(), label)?)
}

/// Build the output object in whitelist order.
fn assemble(record: &Record, visible: &PropertySet, mut slots: HashMap<String, Slot>) -> Value {
    let mut output = Map::new();
    for name in visible.iter() {
        match slots.remove(name) {
            Some(Slot::Value(value)) => {
                output.insert(name.to_string(), value);
            }
            Some(Slot::Omit) => {}
            None => {
                if let Some(value) = record.attribute(name) {
                    output.insert(name.to_string(), value.clone());
                }
            }
        }
    }
    Value::Object(output)
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

pub struct EngineBuilder {
    registry: Registry,
    config: EngineConfig,
    argument_builder: ArgumentBuilder,
    ensurer: Arc<dyn RelationEnsurer>,
}

impl EngineBuilder {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            argument_builder: Arc::new(default_arguments),
            ensurer: Arc::new(DefaultEnsurer),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the arguments handed to context designators.
    pub fn argument_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&Record) -> Vec<Value> + Send + Sync + 'static,
    {
        self.argument_builder = Arc::new(builder);
        self
    }

    /// Replace how requested relations are made available.
    pub fn ensurer(mut self, ensurer: impl RelationEnsurer + 'static) -> Self {
        self.ensurer = Arc::new(ensurer);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            registry: self.registry,
            config: self.config,
            argument_builder: self.argument_builder,
            ensurer: self.ensurer,
        }
    }
}
