//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! an `Arc<CoreConfig>`. Nothing in the core reads environment variables itself.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_STORAGE_KEY};
use crate::validation::validate_storage_key;
use crate::{NonEmptyText, PatientResult};
use orthomed_files::AttachmentLimits;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    storage_key: NonEmptyText,
    attachment_limits: AttachmentLimits,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with the default attachment limits.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `storage_key` is not safe to use as a file stem.
    pub fn new(data_dir: PathBuf, storage_key: NonEmptyText) -> PatientResult<Self> {
        validate_storage_key(storage_key.as_str())?;

        Ok(Self {
            data_dir,
            storage_key,
            attachment_limits: AttachmentLimits::default(),
        })
    }

    /// Replaces the attachment limits.
    pub fn with_attachment_limits(mut self, limits: AttachmentLimits) -> Self {
        self.attachment_limits = limits;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn storage_key(&self) -> &str {
        self.storage_key.as_str()
    }

    pub fn attachment_limits(&self) -> AttachmentLimits {
        self.attachment_limits
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            storage_key: default_storage_key(),
            attachment_limits: AttachmentLimits::default(),
        }
    }
}

fn default_storage_key() -> NonEmptyText {
    match NonEmptyText::new(DEFAULT_STORAGE_KEY) {
        Ok(key) => key,
        Err(_) => unreachable!("DEFAULT_STORAGE_KEY is a non-empty literal"),
    }
}

/// Parse the storage key from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default key.
///
/// # Errors
///
/// Returns `PatientError::InvalidInput` if the supplied key is not safe to use.
pub fn storage_key_from_env_value(value: Option<String>) -> PatientResult<NonEmptyText> {
    match value.and_then(NonEmptyText::optional) {
        Some(key) => {
            validate_storage_key(key.as_str())?;
            Ok(key)
        }
        None => Ok(default_storage_key()),
    }
}

/// Resolve the data directory from an optional string value, falling back to
/// [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .and_then(NonEmptyText::optional)
        .map(|dir| PathBuf::from(dir.as_str()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatientError;

    #[test]
    fn storage_key_defaults_when_missing_or_blank() {
        assert_eq!(
            storage_key_from_env_value(None).unwrap().as_str(),
            DEFAULT_STORAGE_KEY
        );
        assert_eq!(
            storage_key_from_env_value(Some("  ".into()))
                .unwrap()
                .as_str(),
            DEFAULT_STORAGE_KEY
        );
    }

    #[test]
    fn storage_key_is_trimmed_and_validated() {
        assert_eq!(
            storage_key_from_env_value(Some(" clinic-a ".into()))
                .unwrap()
                .as_str(),
            "clinic-a"
        );
        assert!(matches!(
            storage_key_from_env_value(Some("../escape".into())),
            Err(PatientError::InvalidInput(_))
        ));
    }

    #[test]
    fn new_rejects_unsafe_key() {
        let key = NonEmptyText::new("a/b").unwrap();
        assert!(CoreConfig::new(PathBuf::from("data"), key).is_err());
    }

    #[test]
    fn data_dir_falls_back_to_default() {
        assert_eq!(data_dir_from_env_value(None), PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(
            data_dir_from_env_value(Some("/srv/ortho".into())),
            PathBuf::from("/srv/ortho")
        );
    }

    #[test]
    fn with_attachment_limits_overrides_defaults() {
        let limits = AttachmentLimits {
            max_files: 2,
            max_file_bytes: 64,
        };
        let cfg = CoreConfig::default().with_attachment_limits(limits);
        assert_eq!(cfg.attachment_limits(), limits);
        assert_eq!(cfg.storage_key(), DEFAULT_STORAGE_KEY);
    }
}
