//! Constants used throughout the OrthoMed core crate.

/// Default directory for snapshot storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "patient_data";

/// Key under which the whole patient collection is stored.
pub const DEFAULT_STORAGE_KEY: &str = "orthomed-patients";

/// File extension used by file-backed storage for each key.
pub const SNAPSHOT_FILE_EXTENSION: &str = "json";

/// Number of patients shown in the "recent patients" list.
pub const RECENT_PATIENTS_LIMIT: usize = 5;

/// Longest accepted storage key.
pub const MAX_STORAGE_KEY_LEN: usize = 128;

/// Calendar format of `dateOfVisit`.
pub const VISIT_DATE_FORMAT: &str = "%Y-%m-%d";
