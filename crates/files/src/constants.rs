/// Largest accepted attachment, in bytes (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Soft cap on the number of attachments one patient record may carry.
pub const MAX_FILES_PER_PATIENT: usize = 10;

/// MIME types accepted for attachments. `image/jpg` is a non-standard alias some platforms
/// report for JPEG files.
pub const ALLOWED_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "application/pdf"];
