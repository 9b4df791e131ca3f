//! Error types for firecheck.
//!
//! This module defines all error types used throughout the firecheck crate.
//! Most user-driven failures (cancelled dialogs, malformed sessions, corrupt
//! history) never become errors at all; what remains here is what a caller
//! must actually see.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for firecheck operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// Writing a value would exceed the configured storage quota.
    #[error("storage quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Total bytes the store would hold after the write.
        needed: usize,
        /// Configured quota in bytes.
        quota: usize,
    },

    /// An inspection with this id is already stored.
    #[error("inspection {0} already exists")]
    DuplicateRecord(i64),

    /// Every inspection id up to `i64::MAX` has been used.
    #[error("no inspection id left after {last}")]
    IdsExhausted {
        /// The last id handed out.
        last: i64,
    },

    /// No inspection with this id is stored.
    #[error("inspection {0} not found")]
    RecordNotFound(i64),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Delivery Errors ===
    /// A delivery strategy failed while handing over a document.
    #[error("delivery via '{strategy}' failed: {message}")]
    Delivery {
        /// Name of the delivery strategy.
        strategy: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Session Errors ===
    /// The requested page needs an active session.
    #[error("page '{page}' requires an active session, log in via '{login_page}'")]
    SessionRequired {
        /// The guarded page.
        page: String,
        /// Where the user is sent to log in.
        login_page: String,
    },

    // === Asset Cache Errors ===
    /// A pre-cached asset could not be read.
    #[error("asset '{path}' could not be cached: {source}")]
    AssetMissing {
        /// Relative asset path from the manifest.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for firecheck operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a delivery error for the named strategy.
    #[must_use]
    pub fn delivery(strategy: &'static str, message: impl Into<String>) -> Self {
        Self::Delivery {
            strategy,
            message: message.into(),
        }
    }

    /// Create a session-required error.
    #[must_use]
    pub fn session_required(page: impl Into<String>, login_page: impl Into<String>) -> Self {
        Self::SessionRequired {
            page: page.into(),
            login_page: login_page.into(),
        }
    }

    /// Check if this error is a storage quota failure.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Check if this error means the user has to log in first.
    #[must_use]
    pub fn is_session_required(&self) -> bool {
        matches!(self, Self::SessionRequired { .. })
    }
}
