use crate::diagnosis::DiagnosisCategory;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("required field missing: {0}")]
    MissingField(&'static str),
    #[error("unknown diagnosis category: {0}")]
    UnknownCategory(String),
    #[error("'{label}' is not a {category} subcategory")]
    UnknownSubcategory {
        category: DiagnosisCategory,
        label: String,
    },
    #[error("unknown sex: {0} (expected Male, Female or Other)")]
    UnknownSex(String),
    #[error("invalid visit date '{value}': {source}")]
    InvalidVisitDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("snapshot schema mismatch: {0}")]
    Snapshot(String),
    #[error("failed to serialize patients: {0}")]
    Serialization(serde_json::Error),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write snapshot file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read snapshot file: {0}")]
    FileRead(std::io::Error),
    #[error("storage backend failure: {0}")]
    Storage(String),
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
