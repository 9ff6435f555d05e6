use records::BoxError;
use thiserror::Error;
use visibility::ConfigurationError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The engine or the call options are set up incorrectly.
    #[error("serialization configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A role determiner, context designator or relation loader failed.
    #[error("{0}")]
    Source(#[source] BoxError),

    #[error(transparent)]
    Records(#[from] records::Error),
}

impl Error {
    /// Whether the failure is a setup mistake rather than a data fault.
    ///
    /// At a network boundary these should surface as server-side failures.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
