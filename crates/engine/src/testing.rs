//! Test doubles shared by the engine's unit tests.

use async_trait::async_trait;
use records::{BoxError, Record, RecordSource, Relation};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A record source serving canned relations and counting every load.
#[derive(Default)]
pub struct CountingSource {
    relations: HashMap<(String, String), Relation>,
    loads: AtomicUsize,
    loaded: Mutex<Vec<String>>,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `relation` for relation `name` of every `type_tag` record.
    pub fn with_relation(mut self, type_tag: &str, name: &str, relation: Relation) -> Self {
        self.relations
            .insert((type_tag.to_string(), name.to_string()), relation);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for CountingSource {
    async fn load_relation(&self, record: &Record, name: &str) -> Result<Relation, BoxError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded.lock().unwrap().push(name.to_string());
        self.relations
            .get(&(record.type_tag().to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| format!("no relation '{name}' on '{}'", record.type_tag()).into())
    }
}

/// An in-memory log sink for `tracing_subscriber::fmt`.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a warn-level subscriber writing here for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
