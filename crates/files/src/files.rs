//! Attachment model and ingestion.
//!
//! An [`UploadedFile`] is the unit stored inside a patient record: metadata plus the whole
//! file content as a base64 `data:` URL. [`FileIngestor`] turns files on disk (or raw bytes
//! handed over by a front end) into `UploadedFile`s, enforcing [`AttachmentLimits`].
//!
//! # Media type
//!
//! The stored MIME type is sniffed from the content with `infer` when the content has a
//! recognisable signature, and otherwise falls back to the type implied by the file
//! extension (or the type the caller declared). Acceptance is decided on that final type.
//!
//! # Ingestion is independent of the record
//!
//! Ingestion only reads and validates. It never touches a patient record, so several
//! ingestions may be in flight at once; merging the results into a record is the store's
//! job and happens against the record's current attachment list.

use crate::constants::{ALLOWED_MIME_TYPES, MAX_FILES_PER_PATIENT, MAX_FILE_SIZE_BYTES};
use crate::{FilesError, FilesResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use orthomed_ids::{RecordId, TimestampId};
use orthomed_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Fallback MIME type when neither content nor name says what a file is.
const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Returns `true` if `mime_type` is one of [`ALLOWED_MIME_TYPES`].
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// What kind of document an attachment is. Metadata only; never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    Xray,
    Prescription,
    LabReport,
    Referral,
    #[default]
    Other,
}

impl FileCategory {
    /// Every category, in display order.
    pub const ALL: [FileCategory; 5] = [
        FileCategory::Xray,
        FileCategory::Prescription,
        FileCategory::LabReport,
        FileCategory::Referral,
        FileCategory::Other,
    ];

    /// Wire form, as stored in snapshots.
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Xray => "xray",
            FileCategory::Prescription => "prescription",
            FileCategory::LabReport => "lab-report",
            FileCategory::Referral => "referral",
            FileCategory::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                format!("unknown file category '{s}' (expected xray, prescription, lab-report, referral or other)")
            })
    }
}

/// An attachment embedded in a patient record.
///
/// Field names serialise exactly as the patient snapshot format expects (`type`,
/// `uploadDate`, `dataUrl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UploadedFile {
    pub id: RecordId,

    /// Original file name.
    pub name: NonEmptyText,

    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,

    /// Size of the file content in bytes.
    pub size: u64,

    pub upload_date: DateTime<Utc>,

    /// `data:<mime>;base64,<content>`
    pub data_url: String,

    pub category: FileCategory,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// The id as a [`TimestampId`], or `None` for ids in any other shape.
    pub fn timestamp_id(&self) -> Option<TimestampId> {
        self.id.as_str().parse().ok()
    }

    /// Decodes the embedded content.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidDataUrl`] if the payload is not a base64 `data:` URL.
    pub fn content(&self) -> FilesResult<Vec<u8>> {
        let (header, payload) = self
            .data_url
            .split_once(',')
            .ok_or_else(|| FilesError::InvalidDataUrl("missing ',' separator".into()))?;

        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(FilesError::InvalidDataUrl(format!(
                "unsupported header '{header}'"
            )));
        }

        STANDARD
            .decode(payload)
            .map_err(|e| FilesError::InvalidDataUrl(e.to_string()))
    }

    /// Human-readable size, e.g. `0 Bytes`, `13 Bytes`, `1.5 KB`, `2.25 MB`.
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Per-file and per-patient acceptance limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    pub max_files: usize,
    pub max_file_bytes: u64,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES_PER_PATIENT,
            max_file_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

impl AttachmentLimits {
    /// Checks type then size of a single file.
    ///
    /// # Errors
    ///
    /// [`FilesError::UnsupportedType`] or [`FilesError::TooLarge`].
    pub fn check_file(&self, name: &str, mime_type: &str, size_bytes: u64) -> FilesResult<()> {
        if !is_allowed_mime_type(mime_type) {
            return Err(FilesError::UnsupportedType {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            });
        }

        if size_bytes > self.max_file_bytes {
            return Err(FilesError::TooLarge {
                name: name.to_string(),
                size_bytes,
                limit_bytes: self.max_file_bytes,
            });
        }

        Ok(())
    }

    /// Checks that one more file fits next to `current_count` existing ones.
    ///
    /// # Errors
    ///
    /// [`FilesError::TooManyFiles`] when the cap is already reached.
    pub fn check_capacity(&self, name: &str, current_count: usize) -> FilesResult<()> {
        if current_count >= self.max_files {
            return Err(FilesError::TooManyFiles {
                name: name.to_string(),
                limit: self.max_files,
            });
        }
        Ok(())
    }

    /// Re-validates an already built attachment (type, size, and that the payload length
    /// matches the recorded size).
    pub fn check_uploaded(&self, file: &UploadedFile) -> FilesResult<()> {
        self.check_file(file.name.as_str(), &file.mime_type, file.size)?;
        let content = file.content()?;
        if content.len() as u64 != file.size {
            return Err(FilesError::InvalidDataUrl(format!(
                "payload of {} is {} bytes but size says {}",
                file.name,
                content.len(),
                file.size
            )));
        }
        Ok(())
    }
}

/// Outcome of ingesting several files at once.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub accepted: Vec<UploadedFile>,
    /// File name (or path) and why it was turned away.
    pub rejected: Vec<(String, FilesError)>,
}

impl IngestReport {
    /// `true` when nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Reads, validates and encodes attachments.
#[derive(Debug, Clone, Default)]
pub struct FileIngestor {
    limits: AttachmentLimits,
}

impl FileIngestor {
    pub fn new(limits: AttachmentLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> AttachmentLimits {
        self.limits
    }

    /// Ingests a single file from disk.
    ///
    /// The file name becomes the attachment name. Size is checked from file metadata
    /// before the content is read, so oversized files are never loaded.
    ///
    /// # Arguments
    ///
    /// * `source_path` - Path to the file to ingest
    /// * `category` - Attachment category chosen by the user
    /// * `last_id` - Previously issued attachment id, to keep ids monotonic
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the path has no usable file name
    /// - the file cannot be read (I/O)
    /// - the type is not JPEG, PNG or PDF, or the file is larger than the limit
    pub fn ingest_path(
        &self,
        source_path: &Path,
        category: FileCategory,
        last_id: Option<&TimestampId>,
    ) -> FilesResult<UploadedFile> {
        self.ingest_path_with_id(source_path, category, TimestampId::generate(last_id))
    }

    /// Ingests content already in memory.
    ///
    /// `declared_mime` is what the caller believes the type is; sniffed content wins
    /// when recognisable.
    pub fn ingest_bytes(
        &self,
        name: &str,
        declared_mime: Option<&str>,
        bytes: &[u8],
        category: FileCategory,
        last_id: Option<&TimestampId>,
    ) -> FilesResult<UploadedFile> {
        self.build(
            name,
            declared_mime,
            bytes,
            category,
            TimestampId::generate(last_id),
        )
    }

    /// Ingests several files for a patient that already carries `existing`.
    ///
    /// Each file succeeds or fails on its own. Once the cap is reached, remaining files are
    /// rejected with [`FilesError::TooManyFiles`]. New ids continue after the newest
    /// timestamp id in `existing`; legacy ids are skipped.
    pub fn ingest_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        category: FileCategory,
        existing: &[UploadedFile],
    ) -> IngestReport {
        let existing_count = existing.len();
        let mut report = IngestReport::default();
        let mut last = existing.iter().rev().find_map(UploadedFile::timestamp_id);

        for path in paths {
            let path = path.as_ref();
            let label = path.display().to_string();

            if let Err(e) = self
                .limits
                .check_capacity(&label, existing_count + report.accepted.len())
            {
                tracing::warn!("attachment rejected: {}", e);
                report.rejected.push((label, e));
                continue;
            }

            let id = TimestampId::generate(last.as_ref());
            match self.ingest_path_with_id(path, category, id.clone()) {
                Ok(file) => {
                    last = Some(id);
                    report.accepted.push(file);
                }
                Err(e) => {
                    tracing::warn!("attachment rejected: {}", e);
                    report.rejected.push((label, e));
                }
            }
        }

        report
    }

    fn ingest_path_with_id(
        &self,
        source_path: &Path,
        category: FileCategory,
        id: TimestampId,
    ) -> FilesResult<UploadedFile> {
        let name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FilesError::InvalidName(source_path.display().to_string()))?;

        let declared = mime_from_extension(source_path);

        if let Some(mime_type) = declared {
            if !is_allowed_mime_type(mime_type) {
                return Err(FilesError::UnsupportedType {
                    name: name.to_string(),
                    mime_type: mime_type.to_string(),
                });
            }
        }

        let metadata = fs::metadata(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open source file {}: {}", source_path.display(), e),
            ))
        })?;

        if metadata.len() > self.limits.max_file_bytes {
            return Err(FilesError::TooLarge {
                name: name.to_string(),
                size_bytes: metadata.len(),
                limit_bytes: self.limits.max_file_bytes,
            });
        }

        let buffer = fs::read(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read source file {}: {}", source_path.display(), e),
            ))
        })?;

        self.build(name, declared, &buffer, category, id)
    }

    fn build(
        &self,
        name: &str,
        declared_mime: Option<&str>,
        bytes: &[u8],
        category: FileCategory,
        id: TimestampId,
    ) -> FilesResult<UploadedFile> {
        let name = NonEmptyText::new(name).map_err(|_| FilesError::InvalidName(name.into()))?;

        let mime_type = infer::get(bytes)
            .map(|kind| kind.mime_type())
            .or(declared_mime)
            .unwrap_or(UNKNOWN_MIME_TYPE)
            .to_string();

        let size = bytes.len() as u64;
        self.limits.check_file(name.as_str(), &mime_type, size)?;

        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        let upload_date = id.timestamp();

        Ok(UploadedFile {
            id: id.into(),
            name,
            mime_type,
            size,
            upload_date,
            data_url,
            category,
        })
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const PDF_HEADER: &[u8] = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n";

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_ingest_png_builds_data_url() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "knee-ap.png", &PNG_HEADER);

        let file = FileIngestor::default()
            .ingest_path(&path, FileCategory::Xray, None)
            .unwrap();

        assert_eq!(file.name.as_str(), "knee-ap.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size, 8);
        assert_eq!(file.category, FileCategory::Xray);
        assert!(file.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(file.content().unwrap(), PNG_HEADER.to_vec());
        assert!(file.is_image());
    }

    #[test]
    fn test_ingest_pdf_detected_from_content() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "referral.PDF", PDF_HEADER);

        let file = FileIngestor::default()
            .ingest_path(&path, FileCategory::Referral, None)
            .unwrap();

        assert_eq!(file.mime_type, "application/pdf");
        assert!(!file.is_image());
    }

    #[test]
    fn test_ingest_rejects_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "notes.txt", b"plain text");

        let err = FileIngestor::default()
            .ingest_path(&path, FileCategory::Other, None)
            .unwrap_err();

        assert!(matches!(err, FilesError::UnsupportedType { ref mime_type, .. } if mime_type == "text/plain"));
    }

    #[test]
    fn test_ingest_rejects_unknown_content_without_extension() {
        let err = FileIngestor::default()
            .ingest_bytes("blob", None, b"???", FileCategory::Other, None)
            .unwrap_err();

        assert!(matches!(err, FilesError::UnsupportedType { ref mime_type, .. } if mime_type == UNKNOWN_MIME_TYPE));
    }

    #[test]
    fn test_ingest_rejects_oversized_file() {
        let temp = TempDir::new().unwrap();
        let limits = AttachmentLimits {
            max_files: 10,
            max_file_bytes: 16,
        };
        let mut content = PNG_HEADER.to_vec();
        content.extend_from_slice(&[0u8; 9]);
        let path = write(&temp, "big.png", &content);

        let err = FileIngestor::new(limits)
            .ingest_path(&path, FileCategory::Xray, None)
            .unwrap_err();

        assert!(matches!(
            err,
            FilesError::TooLarge {
                size_bytes: 17,
                limit_bytes: 16,
                ..
            }
        ));
    }

    #[test]
    fn test_exactly_ten_mib_is_accepted() {
        let limits = AttachmentLimits::default();
        assert!(limits
            .check_file("scan.pdf", "application/pdf", MAX_FILE_SIZE_BYTES)
            .is_ok());
        assert!(limits
            .check_file("scan.pdf", "application/pdf", MAX_FILE_SIZE_BYTES + 1)
            .is_err());
        assert!(limits.check_file("scan.jpg", "image/jpg", 1).is_ok());
    }

    #[test]
    fn test_ingest_missing_file_is_io_error() {
        let err = FileIngestor::default()
            .ingest_path(Path::new("/non-existent/scan.png"), FileCategory::Xray, None)
            .unwrap_err();
        assert!(matches!(err, FilesError::Io(_)));
    }

    #[test]
    fn test_batch_stops_at_cap_and_reports_each_rejection() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.png", &PNG_HEADER);
        let b = write(&temp, "b.txt", b"nope");
        let c = write(&temp, "c.pdf", PDF_HEADER);
        let d = write(&temp, "d.png", &PNG_HEADER);
        let existing: Vec<_> = (0..8)
            .map(|i| {
                let name = format!("{i}.png");
                FileIngestor::default()
                    .ingest_bytes(&name, None, &PNG_HEADER, FileCategory::Xray, None)
                    .unwrap()
            })
            .collect();

        let report =
            FileIngestor::default().ingest_batch(&[a, b, c, d], FileCategory::LabReport, &existing);

        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.accepted[0].name.as_str(), "a.png");
        assert_eq!(report.accepted[1].name.as_str(), "c.pdf");
        assert_eq!(report.rejected.len(), 2);
        assert!(matches!(report.rejected[0].1, FilesError::UnsupportedType { .. }));
        assert!(matches!(report.rejected[1].1, FilesError::TooManyFiles { limit: 10, .. }));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_batch_ids_are_unique_and_ordered() {
        let temp = TempDir::new().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|i| write(&temp, &format!("{i}.png"), &PNG_HEADER))
            .collect();

        let report = FileIngestor::default().ingest_batch(&paths, FileCategory::Xray, &[]);

        assert!(report.is_clean());
        let dates: Vec<_> = report.accepted.iter().map(|f| f.upload_date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert_ne!(report.accepted[0].id, report.accepted[1].id);
    }

    #[test]
    fn test_batch_ids_follow_newest_existing_attachment() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "late.png", &PNG_HEADER);

        let future = Utc::now() + chrono::Duration::days(1);
        let mut legacy = FileIngestor::default()
            .ingest_bytes("old.png", None, &PNG_HEADER, FileCategory::Xray, None)
            .unwrap();
        legacy.id = RecordId::parse("1718200000000").unwrap();
        let stamped = FileIngestor::default()
            .ingest_bytes(
                "new.png",
                None,
                &PNG_HEADER,
                FileCategory::Xray,
                Some(&TimestampId::generate_at(future, None)),
            )
            .unwrap();
        let previous = stamped.timestamp_id().unwrap();
        assert!(legacy.timestamp_id().is_none());

        let report =
            FileIngestor::default().ingest_batch(&[path], FileCategory::Xray, &[stamped, legacy]);

        let next = report.accepted[0].timestamp_id().unwrap();
        assert!(next.timestamp() > previous.timestamp());
    }

    #[test]
    fn test_check_uploaded_detects_size_mismatch() {
        let mut file = FileIngestor::default()
            .ingest_bytes("x.png", Some("image/png"), &PNG_HEADER, FileCategory::Xray, None)
            .unwrap();
        let limits = AttachmentLimits::default();
        assert!(limits.check_uploaded(&file).is_ok());

        file.size = 9;
        assert!(matches!(
            limits.check_uploaded(&file),
            Err(FilesError::InvalidDataUrl(_))
        ));
    }

    #[test]
    fn test_content_rejects_non_base64_data_url() {
        let mut file = FileIngestor::default()
            .ingest_bytes("x.png", None, &PNG_HEADER, FileCategory::Xray, None)
            .unwrap();
        file.data_url = "https://example.com/x.png".into();
        assert!(file.content().is_err());
    }

    #[test]
    fn test_display_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(13), "13 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[test]
    fn test_file_category_wire_names() {
        let json = serde_json::to_string(&FileCategory::LabReport).unwrap();
        assert_eq!(json, "\"lab-report\"");
        let xray: FileCategory = serde_json::from_str("\"xray\"").unwrap();
        assert_eq!(xray, FileCategory::Xray);
        assert_eq!("referral".parse::<FileCategory>(), Ok(FileCategory::Referral));
        assert!("x-ray".parse::<FileCategory>().is_err());
    }

    #[test]
    fn test_uploaded_file_serialisation_field_names() {
        let file = FileIngestor::default()
            .ingest_bytes("x.png", None, &PNG_HEADER, FileCategory::Xray, None)
            .unwrap();

        let json = serde_json::to_value(&file).unwrap();
        for key in ["id", "name", "type", "size", "uploadDate", "dataUrl", "category"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }

        let back: UploadedFile = serde_json::from_value(json).unwrap();
        assert_eq!(back, file);
    }
}
