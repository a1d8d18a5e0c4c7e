//! Patient record domain types.

use crate::constants::VISIT_DATE_FORMAT;
use crate::diagnosis::Diagnosis;
use crate::{PatientError, RecordId};
use chrono::NaiveDate;
use orthomed_files::UploadedFile;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Sex {
    #[default]
    Male,
    Female,
    Other,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Male, Sex::Female, Sex::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = PatientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sex::ALL
            .into_iter()
            .find(|sex| sex.as_str() == s)
            .ok_or_else(|| PatientError::UnknownSex(s.to_string()))
    }
}

/// Free-text clinical narrative. Every field is optional and never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClinicalHistory {
    pub medical_history: Option<String>,
    pub family_history: Option<String>,
    pub current_treatment: Option<String>,
    /// Recorded as typed; not parsed as a date.
    pub date_of_injury: Option<String>,
    pub mechanism_of_injury: Option<String>,
    pub history_of_present_illness: Option<String>,
    pub past_history: Option<String>,
    pub blood_reports: Option<String>,
    pub xray_preop: Option<String>,
    pub ct_scan: Option<String>,
    pub mri: Option<String>,
}

impl ClinicalHistory {
    /// Labelled fields in form order, for display.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 11] {
        [
            ("Medical history", self.medical_history.as_deref()),
            ("Family history", self.family_history.as_deref()),
            ("Current treatment", self.current_treatment.as_deref()),
            ("Date of injury", self.date_of_injury.as_deref()),
            ("Mechanism of injury", self.mechanism_of_injury.as_deref()),
            (
                "History of present illness",
                self.history_of_present_illness.as_deref(),
            ),
            ("Past history", self.past_history.as_deref()),
            ("Blood reports", self.blood_reports.as_deref()),
            ("X-ray (pre-op)", self.xray_preop.as_deref()),
            ("CT scan", self.ct_scan.as_deref()),
            ("MRI", self.mri.as_deref()),
        ]
    }
}

/// A patient record.
///
/// The store never validates these fields; [`crate::PatientDraft`] is the checked way in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    pub id: RecordId,
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    pub occupation: String,
    pub address: String,
    pub contact_number: String,
    pub date_of_visit: NaiveDate,
    pub clinical: ClinicalHistory,
    pub diagnosis: Diagnosis,
    pub diagnosis_notes: Option<String>,
    pub uploaded_files: Vec<UploadedFile>,
}

impl Patient {
    /// First attachment with the given id.
    pub fn attachment(&self, file_id: &RecordId) -> Option<&UploadedFile> {
        self.uploaded_files.iter().find(|f| &f.id == file_id)
    }
}

/// Parses a `YYYY-MM-DD` visit date.
///
/// # Errors
///
/// Returns [`PatientError::InvalidVisitDate`] if `value` is not a valid calendar date.
pub fn parse_visit_date(value: &str) -> Result<NaiveDate, PatientError> {
    NaiveDate::parse_from_str(value.trim(), VISIT_DATE_FORMAT).map_err(|source| {
        PatientError::InvalidVisitDate {
            value: value.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_parses_exact_names() {
        assert_eq!("Female".parse::<Sex>().unwrap(), Sex::Female);
        assert!(matches!("female".parse::<Sex>(), Err(PatientError::UnknownSex(_))));
    }

    #[test]
    fn visit_date_is_iso_calendar_date() {
        assert_eq!(
            parse_visit_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(matches!(
            parse_visit_date("2023-02-29"),
            Err(PatientError::InvalidVisitDate { .. })
        ));
        assert!(parse_visit_date("29/02/2024").is_err());
    }

    #[test]
    fn clinical_entries_follow_form_order() {
        let history = ClinicalHistory {
            mri: Some("normal".into()),
            ..Default::default()
        };
        let entries = history.entries();
        assert_eq!(entries[0].0, "Medical history");
        assert_eq!(entries[10], ("MRI", Some("normal")));
        assert_eq!(entries.iter().filter(|(_, v)| v.is_some()).count(), 1);
    }
}
