//! Record identifiers.
//!
//! OrthoMed identifies patients and attachments with *opaque* strings. Snapshots written by
//! earlier versions of the application carry ids in whatever shape the browser generated
//! (for example `1718200000000` or `1718200000000k3j9x0a1b`), so an id is only required to
//! be non-empty once trimmed. Nothing parses meaning out of an id.
//!
//! Freshly allocated ids do have a fixed shape:
//! - patients: [`RecordId::generate`] gives 32 lowercase hex characters (a v4 UUID in simple
//!   form), e.g. `550e8400e29b41d4a716446655440000`
//! - attachments: [`TimestampId::generate`] gives `YYYYMMDDTHHMMSS.mmmZ-<uuid>`, which sorts
//!   by upload time and stays strictly monotonic when handed the previous id.

mod service;

pub use service::{RecordId, TimestampId};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
