//! Error types and handling for notechunk-core operations.
//!
//! The chunking pipeline is deliberately forgiving: malformed markdown and
//! inconsistent structural caches are recovered locally and surface as
//! [`Diagnostic`](crate::Diagnostic) entries, not errors. The only failure a
//! chunking call can return is [`Error::MissingDocumentIdentity`].
//!
//! The sync layer is the opposite: every transport failure is reported, but
//! per affected item, so a caller can retry exactly what failed.
//!
//! ## Error Categories
//!
//! - **Identity**: the document has no stable `original_id`, or chunks were
//!   synced under another document's id
//! - **Structure**: a structural cache region could not be honoured as given
//! - **Transport**: an embedding or vector-store call failed for one item
//! - **Baseline**: stored records disagree with each other
//! - **Ambient**: I/O, configuration and (de)serialization failures
//!
//! ```rust
//! use notechunk_core::Error;
//!
//! let err = Error::SyncTransport {
//!     id: "3f2a".to_string(),
//!     reason: "connection reset".to_string(),
//! };
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "transport");
//! ```

use thiserror::Error;

/// The main error type for notechunk-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller did not supply a stable document identity.
    ///
    /// Chunk ids and baseline matching are scoped by `original_id`; without
    /// it nothing produced by a chunking run could be reconciled later.
    #[error("Missing document identity: an original_id is required to chunk a note")]
    MissingDocumentIdentity,

    /// Chunks handed to a sync belong to a different document than the one
    /// being synced.
    #[error("Document mismatch: syncing '{expected}' but chunk belongs to '{found}'")]
    DocumentMismatch {
        /// Identity the sync was asked to reconcile.
        expected: String,
        /// Identity carried by the offending chunk.
        found: String,
    },

    /// A structural cache entry was inconsistent with the document text.
    ///
    /// Never returned by `chunk_note`; the affected region degrades to a
    /// best-effort paragraph and the message is recorded as a diagnostic.
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    /// An embedding or vector-store call failed for a single item.
    ///
    /// ## Recoverability
    ///
    /// Always considered recoverable: record ids are derived from chunk ids,
    /// so retrying an upsert overwrites instead of duplicating.
    #[error("Sync transport error for '{id}': {reason}")]
    SyncTransport {
        /// Chunk id or store record id the failure belongs to.
        id: String,
        /// Collaborator-supplied failure description.
        reason: String,
    },

    /// Stored baseline records disagree with each other.
    ///
    /// Duplicate chunk ids resolve deterministically (later entry wins); this
    /// variant carries the description of the anomaly for logging.
    #[error("Baseline inconsistency: {0}")]
    BaselineInconsistency(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing operation failed (markdown grammar setup, frontmatter).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Build a transport error for the given chunk or record id.
    pub fn transport(id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SyncTransport {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Attribute this error to an item, keeping an existing transport error
    /// as is.
    #[must_use]
    pub fn into_transport(self, id: impl Into<String>) -> Self {
        match self {
            Self::SyncTransport { .. } => self,
            other => Self::transport(id, other),
        }
    }

    /// Check if the error might be recoverable through retry logic.
    ///
    /// Transport failures and temporary I/O conditions are retryable; missing
    /// identity, configuration and baseline problems need caller action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SyncTransport { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Used as a structured logging field and in per-item sync reports.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::MissingDocumentIdentity | Self::DocumentMismatch { .. } => "identity",
            Self::MalformedStructure(_) => "structure",
            Self::SyncTransport { .. } => "transport",
            Self::BaselineInconsistency(_) => "baseline",
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
