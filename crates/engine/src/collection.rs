//! Collection fan-out.

use crate::{Engine, Result, SerializeOptions};
use futures::future::try_join_all;
use records::{Record, RecordCollection, RecordSource};
use serde_json::Value;
use tracing::debug;

impl Engine {
    /// Serialize every member of `collection`, dropping absent members.
    ///
    /// Members are serialized concurrently. The result keeps membership
    /// order and carries no trace of the members that were dropped.
    pub async fn serialize_collection(
        &self,
        collection: &RecordCollection,
        options: &SerializeOptions,
        source: &dyn RecordSource,
    ) -> Result<Vec<Value>> {
        let members = match &options.accessor {
            Some(accessor) => RecordCollection::new(
                collection
                    .iter()
                    .map(|member| member.clone().as_root(accessor.clone()))
                    .collect(),
            )?,
            None => collection.clone(),
        };
        debug!(
            type_tag = collection.type_tag().unwrap_or_default(),
            members = collection.len(),
            "serializing collection"
        );
        let (values, _) = self.visit_collection(members, options, source).await?;
        Ok(values)
    }

    pub(crate) async fn visit_collection(
        &self,
        collection: RecordCollection,
        options: &SerializeOptions,
        source: &dyn RecordSource,
    ) -> Result<(Vec<Value>, Vec<Record>)> {
        let projections = try_join_all(
            collection
                .into_iter()
                .map(|member| self.visit(member, options, source)),
        )
        .await?;

        let mut values = Vec::with_capacity(projections.len());
        let mut kept = Vec::with_capacity(projections.len());
        for projection in projections {
            if let (Some(value), Some(snapshot)) = (projection.value, projection.snapshot) {
                values.push(value);
                kept.push(snapshot);
            }
        }
        Ok((values, kept))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ChainDesignator, Engine, Registry, RuleRoleDeterminer, SerializeOptions};
    use records::{Accessor, Record, RelationKind, SqliteStore};
    use serde_json::json;
    use std::sync::Arc;
    use visibility::{PropertyTable, RoleTable};

    fn determiner(toml: &str) -> RuleRoleDeterminer {
        toml::from_str(toml).unwrap()
    }

    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.define_relation("user", "groups", RelationKind::Many).unwrap();
        store.define_relation("group", "members", RelationKind::Many).unwrap();

        let users: Vec<_> = (1..=3)
            .map(|id| {
                Record::new("user")
                    .with_id(id)
                    .with_attribute("name", format!("user-{id}"))
                    .with_attribute("email", format!("user-{id}@example.com"))
            })
            .collect();
        let core = Record::new("group").with_id(10).with_attribute("title", "core");
        for record in users.iter().chain([&core]) {
            store.insert(record).unwrap();
        }
        for user in &users {
            store.link(user, "groups", &core).unwrap();
            store.link(&core, "members", user).unwrap();
        }
        store
    }

    fn engine() -> Engine {
        let registry = Registry::builder()
            .register(
                "user",
                determiner(
                    r#"
default_role = "stranger"

[[rules]]
role = "self"
attribute = "id"
accessor_field = "id"
"#,
                ),
                RoleTable::new()
                    .with_role("self", ["id", "name", "email", "groups"])
                    .with_role("stranger", ["id", "name", "groups"]),
            )
            .register(
                "group",
                determiner(r#"default_role = "member""#),
                RoleTable::new().with_role("member", ["id", "title", "members"]),
            )
            .build();
        Engine::new(registry)
    }

    fn options() -> SerializeOptions {
        SerializeOptions::new()
            .ensure_relations(
                PropertyTable::ensure()
                    .uniform("user", ["groups"])
                    .uniform("group", ["members"]),
            )
            .context_visible(
                PropertyTable::context()
                    .by_context("user", "root", ["id", "name", "email", "groups"])
                    .by_context("user", "members", ["id", "name"])
                    .by_context("group", "groups", ["id", "title", "members"]),
            )
            .designator(Arc::new(ChainDesignator::default()))
    }

    #[tokio::test]
    async fn serializes_a_stored_graph() {
        let store = store();
        let me = Accessor::new(json!({ "id": 1 }));
        let record = store.fetch("user", &json!(1), me).unwrap();

        let value = engine()
            .serialize(&record, &options(), &store)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "user-1",
                "email": "user-1@example.com",
                "groups": [{
                    "id": 10,
                    "title": "core",
                    "members": [
                        { "id": 1, "name": "user-1" },
                        { "id": 2, "name": "user-2" },
                        { "id": 3, "name": "user-3" }
                    ]
                }]
            })
        );
    }

    #[tokio::test]
    async fn serializes_a_stored_collection_per_member_role() {
        let store = store();
        let me = Accessor::new(json!({ "id": 2 }));
        let users = store.fetch_all("user", me).unwrap();

        let values = engine()
            .serialize_collection(&users, &options(), &store)
            .await
            .unwrap();

        assert_eq!(values.len(), 3);
        assert!(values[0].get("email").is_none());
        assert_eq!(values[1]["email"], json!("user-2@example.com"));
        assert!(values[2].get("email").is_none());
    }

    #[tokio::test]
    async fn unknown_relations_surface_store_errors() {
        let store = store();
        let record = store.fetch("user", &json!(1), Accessor::anonymous()).unwrap();
        let options = SerializeOptions::new()
            .ensure_relations(PropertyTable::ensure().uniform("user", ["groups", "name"]));

        let err = engine()
            .serialize(&record, &options, &store)
            .await
            .unwrap_err();
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("no relation named 'name'"));
    }
}
