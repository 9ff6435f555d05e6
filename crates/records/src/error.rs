use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("type '{type_tag}' has no relation named '{name}'")]
    UnknownRelation { type_tag: String, name: String },

    #[error("invalid relation kind '{0}', expected 'one' or 'many'")]
    InvalidRelationKind(String),

    #[error("record of type '{0}' has no identity")]
    Unsaved(String),

    #[error("collection mixes record types '{expected}' and '{found}'")]
    MixedCollection { expected: String, found: String },

    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, Error>;
