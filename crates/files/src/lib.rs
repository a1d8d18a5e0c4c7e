//! OrthoMed attachments
//!
//! Attachments (X-rays, prescriptions, lab reports, referrals) belong to exactly one patient
//! record and travel inside it: the file content is embedded as a `data:` URL rather than
//! stored by reference, so a patient snapshot is self-contained.
//!
//! ## Acceptance rules
//!
//! - MIME type must be JPEG, PNG or PDF
//! - Size must not exceed 10 MiB
//! - A patient carries at most 10 attachments; surplus files are rejected one by one
//!
//! Rejected files are reported and never produce a partial entry.
//!
//! ## Example Usage
//!
//! ```no_run
//! use orthomed_files::{AttachmentLimits, FileCategory, FileIngestor};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ingestor = FileIngestor::new(AttachmentLimits::default());
//! let file = ingestor.ingest_path(Path::new("knee-ap.png"), FileCategory::Xray, None)?;
//! println!("{} ({})", file.name, file.display_size());
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::{ALLOWED_MIME_TYPES, MAX_FILES_PER_PATIENT, MAX_FILE_SIZE_BYTES};
pub use files::{
    is_allowed_mime_type, AttachmentLimits, FileCategory, FileIngestor, IngestReport,
    UploadedFile,
};

/// Errors that can occur during attachment ingestion and validation
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// MIME type is not one of the accepted attachment types
    #[error("File type {mime_type} of {name} is not supported. Please upload JPEG, PNG, or PDF files.")]
    UnsupportedType { name: String, mime_type: String },

    /// File exceeds the per-file size limit
    #[error("File {name} is too large ({size_bytes} bytes). Maximum size is {limit_bytes} bytes.")]
    TooLarge {
        name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },

    /// Accepting the file would exceed the per-patient attachment cap
    #[error("Cannot attach {name}: a patient may carry at most {limit} files")]
    TooManyFiles { name: String, limit: usize },

    /// File name missing or unusable
    #[error("Invalid file name: {0}")]
    InvalidName(String),

    /// Embedded payload is not a base64 `data:` URL
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results that can fail with a [`FilesError`].
pub type FilesResult<T> = Result<T, FilesError>;
