//! Error taxonomy shared by every module.

use crate::types::TypeId;

/// Errors surfaced by the relationship index.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The requested edge is not indexed.
    #[error("not found")]
    NotFound,
    /// A type id was used that the registry never issued.
    #[error("unknown relationship type id {0}")]
    UnknownType(TypeId),
    /// Growing or pre-sizing a slot array failed to allocate.
    #[error("resource exhausted: could not allocate {requested_slots} slots")]
    ResourceExhausted {
        /// Number of slots the failed allocation asked for.
        requested_slots: usize,
    },
    /// An argument or configuration value is out of range.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// A configuration document could not be parsed.
    #[error("config: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexError>;
