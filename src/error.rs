//! Error types for registry analysis

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry analysis errors
///
/// Every variant is fatal: the tables are either built completely or not at all.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing <{element}> in {context}")]
    MissingElement { element: String, context: String },

    #[error("Extension {extension} references unknown platform {platform}")]
    UnknownPlatform { extension: String, platform: String },

    #[error("Structure {name} extends {extends} but has no structure type tag")]
    StructExtendsWithoutTag { name: String, extends: String },

    #[error("Unknown bitmask storage type for {name}: {storage}")]
    UnknownBitmaskStorage { name: String, storage: String },

    #[error("Bitmask alias {name} references unresolved type {target}")]
    UnresolvedBitmaskAlias { name: String, target: String },

    #[error("Cannot parse externsync path {path:?} on {command}::{param}")]
    UnparseableSyncPath {
        command: String,
        param: String,
        path: String,
    },

    #[error("Command {name} registered in more than one chain scope list")]
    DuplicateScopedCommand { name: String },

    #[error("Handle parent cycle involving {name}")]
    HandleCycle { name: String },

    #[error("Invalid API version: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
