//! Data-access boundary consumed by the serialization engine.

use crate::{Record, Relation};
use async_trait::async_trait;

/// Error type returned by collaborators; the engine propagates it verbatim.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can populate named relations of a record.
///
/// Implementations return the relation value; attaching it (and stamping the
/// accessor and relation chain onto the loaded records) is the caller's job
/// via [`Record::set_relation`].
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load relation `name` of `record`.
    async fn load_relation(&self, record: &Record, name: &str) -> Result<Relation, BoxError>;
}
