use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown abbreviation or algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Unknown {kind} plugin: {name}")]
    UnknownPlugin { kind: &'static str, name: String },

    #[error("Invalid argument for {plugin}: {message}")]
    InvalidArgument { plugin: String, message: String },

    #[error("Failed to parse expression '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Algorithm '{0}' has no distance")]
    MissingDistance(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
