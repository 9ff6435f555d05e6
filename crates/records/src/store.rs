//! SQLite record store implementation.

use crate::source::BoxError;
use crate::{Accessor, Error, Record, RecordCollection, RecordSource, Relation, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

/// Cardinality of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    One,
    Many,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::One => "one",
            RelationKind::Many => "many",
        }
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "one" => Ok(RelationKind::One),
            "many" => Ok(RelationKind::Many),
            other => Err(Error::InvalidRelationKind(other.to_string())),
        }
    }
}

/// SQLite-backed record store.
///
/// Records are stored as JSON attribute documents keyed by `(type, id)`;
/// relations are declared per type and linked by identity.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a record store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory record store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                type_tag TEXT NOT NULL,
                id TEXT NOT NULL,
                attributes TEXT NOT NULL,
                PRIMARY KEY (type_tag, id)
            );
            CREATE TABLE IF NOT EXISTS relation_defs (
                type_tag TEXT NOT NULL,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                PRIMARY KEY (type_tag, name)
            );
            CREATE TABLE IF NOT EXISTS relation_links (
                parent_type TEXT NOT NULL,
                parent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                child_type TEXT NOT NULL,
                child_id TEXT NOT NULL,
                position INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_links_parent
                ON relation_links(parent_type, parent_id, name, position);
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace a record's attributes. Relations are not stored;
    /// use [`SqliteStore::link`].
    pub fn insert(&self, record: &Record) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| Error::Unsaved(record.type_tag().to_string()))?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO records (type_tag, id, attributes) VALUES (?1, ?2, ?3)",
            params![
                record.type_tag(),
                id_key(id)?,
                serde_json::to_string(record.attributes())?,
            ],
        )?;
        Ok(())
    }

    /// Declare relation `name` on `type_tag`.
    pub fn define_relation(&self, type_tag: &str, name: &str, kind: RelationKind) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO relation_defs (type_tag, name, kind) VALUES (?1, ?2, ?3)",
            params![type_tag, name, kind.as_str()],
        )?;
        Ok(())
    }

    /// Append `child` to relation `name` of `parent`.
    ///
    /// For a to-one relation the new link replaces any existing one.
    pub fn link(&self, parent: &Record, name: &str, child: &Record) -> Result<()> {
        let parent_id = id_key(
            parent
                .id()
                .ok_or_else(|| Error::Unsaved(parent.type_tag().to_string()))?,
        )?;
        let child_id = id_key(
            child
                .id()
                .ok_or_else(|| Error::Unsaved(child.type_tag().to_string()))?,
        )?;

        let conn = self.conn()?;
        if relation_kind(&conn, parent.type_tag(), name)? == RelationKind::One {
            conn.execute(
                "DELETE FROM relation_links
                 WHERE parent_type = ?1 AND parent_id = ?2 AND name = ?3",
                params![parent.type_tag(), parent_id, name],
            )?;
        }
        let position: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relation_links
             WHERE parent_type = ?1 AND parent_id = ?2 AND name = ?3",
            params![parent.type_tag(), parent_id, name],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO relation_links (parent_type, parent_id, name, child_type, child_id, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                parent.type_tag(),
                parent_id,
                name,
                child.type_tag(),
                child_id,
                position
            ],
        )?;
        Ok(())
    }

    /// Fetch one record as a serialization root for `accessor`.
    pub fn fetch(&self, type_tag: &str, id: &Value, accessor: Accessor) -> Result<Record> {
        let conn = self.conn()?;
        let record = load_record(&conn, type_tag, &id_key(id)?)?
            .ok_or_else(|| Error::NotFound(format!("{type_tag} {id}")))?;
        Ok(record.as_root(accessor))
    }

    /// Fetch every record of a type, in insertion order.
    pub fn fetch_all(&self, type_tag: &str, accessor: Accessor) -> Result<RecordCollection> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, attributes FROM records WHERE type_tag = ?1 ORDER BY rowid")?;
        let rows = stmt
            .query_map([type_tag], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, attributes) in rows {
            records.push(decode_record(type_tag, &id, &attributes)?.as_root(accessor.clone()));
        }
        RecordCollection::new(records)
    }

    fn load(&self, record: &Record, name: &str) -> Result<Relation> {
        let parent_id = id_key(
            record
                .id()
                .ok_or_else(|| Error::Unsaved(record.type_tag().to_string()))?,
        )?;

        let conn = self.conn()?;
        let kind = relation_kind(&conn, record.type_tag(), name)?;
        let mut stmt = conn.prepare(
            "SELECT child_type, child_id FROM relation_links
             WHERE parent_type = ?1 AND parent_id = ?2 AND name = ?3
             ORDER BY position",
        )?;
        let links = stmt
            .query_map(params![record.type_tag(), parent_id, name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut children = Vec::with_capacity(links.len());
        for (child_type, child_id) in links {
            let child = load_record(&conn, &child_type, &child_id)?
                .ok_or_else(|| Error::NotFound(format!("{child_type} {child_id}")))?;
            children.push(child);
        }

        match kind {
            RelationKind::One => Ok(children
                .into_iter()
                .next()
                .map(Relation::one)
                .unwrap_or(Relation::Null)),
            RelationKind::Many => Ok(Relation::Many(RecordCollection::new(children)?)),
        }
    }
}

#[async_trait]
impl RecordSource for SqliteStore {
    async fn load_relation(
        &self,
        record: &Record,
        name: &str,
    ) -> std::result::Result<Relation, BoxError> {
        Ok(self.load(record, name)?)
    }
}

fn relation_kind(conn: &Connection, type_tag: &str, name: &str) -> Result<RelationKind> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT kind FROM relation_defs WHERE type_tag = ?1 AND name = ?2",
            params![type_tag, name],
            |row| row.get(0),
        )
        .optional()?;
    match kind {
        Some(kind) => kind.parse(),
        None => Err(Error::UnknownRelation {
            type_tag: type_tag.to_string(),
            name: name.to_string(),
        }),
    }
}

fn load_record(conn: &Connection, type_tag: &str, id: &str) -> Result<Option<Record>> {
    let attributes: Option<String> = conn
        .query_row(
            "SELECT attributes FROM records WHERE type_tag = ?1 AND id = ?2",
            params![type_tag, id],
            |row| row.get(0),
        )
        .optional()?;
    attributes
        .map(|attributes| decode_record(type_tag, id, &attributes))
        .transpose()
}

fn decode_record(type_tag: &str, id: &str, attributes: &str) -> Result<Record> {
    let id: Value = serde_json::from_str(id)?;
    let attributes: Map<String, Value> = serde_json::from_str(attributes)?;
    let mut record = Record::new(type_tag).with_id(id);
    for (name, value) in attributes {
        record.set_attribute(name, value);
    }
    Ok(record)
}

fn id_key(id: &Value) -> Result<String> {
    Ok(serde_json::to_string(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.define_relation("user", "groups", RelationKind::Many).unwrap();
        store.define_relation("user", "manager", RelationKind::One).unwrap();

        let alice = Record::new("user").with_id(1).with_attribute("name", "alice");
        let bob = Record::new("user").with_id(2).with_attribute("name", "bob");
        let admins = Record::new("group").with_id(10).with_attribute("title", "admins");
        let staff = Record::new("group").with_id(11).with_attribute("title", "staff");
        for record in [&alice, &bob, &admins, &staff] {
            store.insert(record).unwrap();
        }
        store.link(&alice, "groups", &staff).unwrap();
        store.link(&alice, "groups", &admins).unwrap();
        store.link(&alice, "manager", &bob).unwrap();
        store
    }

    #[test]
    fn fetch_stamps_root() {
        let store = seeded();
        let accessor = Accessor::new(json!({ "id": 1 }));
        let alice = store.fetch("user", &json!(1), accessor.clone()).unwrap();
        assert_eq!(alice.attribute("name"), Some(&json!("alice")));
        assert!(alice.relation_chain().is_root());
        assert!(alice.accessor().same_as(&accessor));
    }

    #[test]
    fn fetch_missing_record() {
        let store = seeded();
        let err = store.fetch("user", &json!(99), Accessor::anonymous()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn fetch_all_keeps_insertion_order() {
        let store = seeded();
        let users = store.fetch_all("user", Accessor::anonymous()).unwrap();
        let ids: Vec<_> = users.iter().map(|u| u.id().cloned()).collect();
        assert_eq!(ids, [Some(json!(1)), Some(json!(2))]);
    }

    #[tokio::test]
    async fn load_many_in_link_order() {
        let store = seeded();
        let alice = store.fetch("user", &json!(1), Accessor::anonymous()).unwrap();
        let Relation::Many(groups) = store.load_relation(&alice, "groups").await.unwrap() else {
            panic!("expected a collection");
        };
        let titles: Vec<_> = groups.iter().map(|g| g.attribute("title").cloned()).collect();
        assert_eq!(titles, [Some(json!("staff")), Some(json!("admins"))]);
    }

    #[tokio::test]
    async fn load_one_without_link_is_null() {
        let store = seeded();
        let bob = store.fetch("user", &json!(2), Accessor::anonymous()).unwrap();
        let relation = store.load_relation(&bob, "manager").await.unwrap();
        assert!(matches!(relation, Relation::Null));
    }

    #[tokio::test]
    async fn undefined_relation_is_an_error() {
        let store = seeded();
        let alice = store.fetch("user", &json!(1), Accessor::anonymous()).unwrap();
        let err = store.load_relation(&alice, "friends").await.unwrap_err();
        assert!(err.to_string().contains("friends"));
    }

    #[tokio::test]
    async fn relinking_one_relation_replaces_the_link() {
        let store = seeded();
        let carol = Record::new("user").with_id(3).with_attribute("name", "carol");
        store.insert(&carol).unwrap();
        let alice = store.fetch("user", &json!(1), Accessor::anonymous()).unwrap();

        store.link(&alice, "manager", &carol).unwrap();

        let Relation::One(manager) = store.load_relation(&alice, "manager").await.unwrap() else {
            panic!("expected a single record");
        };
        assert_eq!(manager.id(), Some(&json!(3)));
        let links: i64 = store
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM relation_links WHERE parent_id = '1' AND name = 'manager'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 1);
    }

    #[test]
    fn unknown_relation_kind_is_rejected() {
        let err = "several".parse::<RelationKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidRelationKind(ref kind) if kind == "several"));
    }

    #[test]
    fn unsaved_records_cannot_be_inserted() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.insert(&Record::new("user")).unwrap_err();
        assert!(matches!(err, Error::Unsaved(_)));
    }
}
