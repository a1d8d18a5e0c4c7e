//! # OrthoMed Core
//!
//! Core business logic for the OrthoMed patient record system.
//!
//! This crate contains pure data operations over an insertion-ordered patient collection:
//! - The patient model and the two-level orthopedic diagnosis taxonomy
//! - Checked intake of form values ([`PatientDraft`])
//! - The [`PatientStore`], which writes the whole collection through to a [`KeyValueStore`]
//!   after every mutation
//! - Filtering ([`filter`], [`filter_by_path`]) and dashboard aggregates
//!
//! **No front-end concerns**: argument parsing, output formatting and environment handling
//! belong in `orthomed-cli`.

pub mod config;
pub mod constants;
pub mod diagnosis;
mod error;
pub mod intake;
pub mod patient;
pub mod query;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod store;
pub mod validation;

pub use config::{data_dir_from_env_value, storage_key_from_env_value, CoreConfig};
pub use diagnosis::{Diagnosis, DiagnosisCategory, DiagnosisSubcategory};
pub use error::{PatientError, PatientResult};
pub use intake::PatientDraft;
pub use patient::{parse_visit_date, ClinicalHistory, Patient, Sex};
pub use query::{filter, filter_by_path, FilterCriteria};
pub use snapshot::Snapshot;
pub use stats::{
    average_age, recent_patients, visits_in_month, visits_this_month, CategoryCounts,
    DashboardSummary, PathSummary, SubcategoryCounts,
};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use store::{AttachOutcome, LoadOutcome, PatientStore};

pub use orthomed_files::{
    AttachmentLimits, FileCategory, FileIngestor, FilesError, IngestReport, UploadedFile,
};
pub use orthomed_ids::{RecordId, TimestampId};
pub use orthomed_types::NonEmptyText;
