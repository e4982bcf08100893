//! threadwalk: a resumable forum thread archiver
//!
//! This crate discovers discussion threads on a forum index page, walks each
//! thread page by page in fair rounds, and writes the extracted posts into
//! numbered, navigable HTML part files. Progress is persisted after every
//! page so an interrupted job resumes where it stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for threadwalk operations
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Root page could not be fetched: {url}")]
    RootUnavailable { url: String },

    #[error("No threads on {url} matched pattern '{pattern}'")]
    NoThreads { url: String, pattern: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read recipe book: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in recipe: {0}")]
    InvalidUrl(String),

    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),

    #[error("No recipe has been used yet")]
    NoLatestRecipe,
}

/// Result type alias for threadwalk operations
pub type Result<T> = std::result::Result<T, WalkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{FetchPolicy, JobOptions, Recipe, RecipeBook};
pub use crawler::{Coordinator, JobReport};
pub use state::{PostRecord, ThreadSeed, ThreadState, ThreadStatus};
