//! Input validation utilities.

use crate::constants::MAX_STORAGE_KEY_LEN;
use crate::{PatientError, PatientResult};

/// Validates that a storage key is safe to use as a file stem.
///
/// File-backed storage writes one `<key>.json` per key, so the key must not be able to
/// escape the data directory:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length
/// - Restricts characters to ASCII alphanumerics, `.`, `-` and `_`, and rejects `.`/`..`
///
/// # Errors
///
/// Returns a `PatientError::InvalidInput` if the key is invalid.
pub fn validate_storage_key(key: &str) -> PatientResult<()> {
    if key.trim().is_empty() {
        return Err(PatientError::InvalidInput(
            "storage key cannot be empty".into(),
        ));
    }

    if key.len() > MAX_STORAGE_KEY_LEN {
        return Err(PatientError::InvalidInput(format!(
            "storage key exceeds maximum length of {} characters",
            MAX_STORAGE_KEY_LEN
        )));
    }

    if key == "." || key == ".." {
        return Err(PatientError::InvalidInput(
            "storage key cannot be '.' or '..'".into(),
        ));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(PatientError::InvalidInput(
            "storage key contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    Ok(())
}
