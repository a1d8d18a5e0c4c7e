//! Snapshot codec for the patient collection.
//!
//! The whole collection is stored as one JSON array under a single key. Field names are
//! camelCase (`contactNumber`, `dateOfVisit`, `diagnosisSubcategory`, `uploadedFiles`, ...)
//! so snapshots written by older front ends load unchanged.
//!
//! Responsibilities:
//! - Define a strict wire model, separate from the domain [`Patient`]
//! - Translate between wire and domain, validating enums, dates and the diagnosis table
//! - Report the failing path when a snapshot does not match the schema

use crate::constants::VISIT_DATE_FORMAT;
use crate::diagnosis::{Diagnosis, DiagnosisCategory};
use crate::patient::{parse_visit_date, ClinicalHistory, Patient, Sex};
use crate::{PatientError, PatientResult, RecordId};
use orthomed_files::UploadedFile;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Snapshot operations.
///
/// Zero-sized namespace for parsing and rendering the stored collection.
pub struct Snapshot;

impl Snapshot {
    /// Parse a snapshot into patient records, preserving order.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort path (e.g.
    /// `[3].uploadedFiles[0].size`) to the failing field.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::Snapshot`] if:
    /// - the text is not a JSON array of patient objects,
    /// - any field has an unexpected type or an unknown key is present,
    /// - `sex`, `diagnosisCategory` or `dateOfVisit` is not a recognised value,
    /// - `diagnosisSubcategory` is not listed for the record's category.
    pub fn parse(text: &str) -> PatientResult<Vec<Patient>> {
        let mut deserializer = serde_json::Deserializer::from_str(text);

        let wires = match serde_path_to_error::deserialize::<_, Vec<PatientWire>>(&mut deserializer)
        {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(PatientError::Snapshot(format!("at {path}: {source}")));
            }
        };

        deserializer
            .end()
            .map_err(|e| PatientError::Snapshot(format!("trailing content: {e}")))?;

        wires
            .into_iter()
            .enumerate()
            .map(|(index, wire)| {
                wire_to_domain(wire)
                    .map_err(|e| PatientError::Snapshot(format!("at [{index}]: {e}")))
            })
            .collect()
    }

    /// Render records as snapshot text, in iteration order.
    ///
    /// Records are converted to their wire form one at a time while writing.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::Serialization`] if serialisation fails.
    pub fn render<'a>(patients: impl IntoIterator<Item = &'a Patient>) -> PatientResult<String> {
        let records: Vec<&Patient> = patients.into_iter().collect();
        serde_json::to_string(&Records(&records)).map_err(PatientError::Serialization)
    }
}

struct Records<'a>(&'a [&'a Patient]);

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|patient| domain_to_wire(patient)))
    }
}

/// Wire representation of one patient record.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PatientWire {
    id: RecordId,
    name: String,
    #[serde(deserialize_with = "age_or_zero")]
    age: u32,
    sex: String,
    occupation: String,
    address: String,
    contact_number: String,
    date_of_visit: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    family_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_treatment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_of_injury: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mechanism_of_injury: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    history_of_present_illness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    past_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    blood_reports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xray_preop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ct_scan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mri: Option<String>,

    diagnosis_category: String,
    #[serde(default)]
    diagnosis_subcategory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diagnosis_notes: Option<String>,

    #[serde(default)]
    uploaded_files: Vec<UploadedFile>,
}

/// Older front ends stored `null` when the age box was cleared.
fn age_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

fn wire_to_domain(wire: PatientWire) -> PatientResult<Patient> {
    let sex: Sex = wire.sex.parse()?;
    let category: DiagnosisCategory = wire.diagnosis_category.parse()?;
    let diagnosis = Diagnosis::with_label(category, &wire.diagnosis_subcategory)?;
    let date_of_visit = parse_visit_date(&wire.date_of_visit)?;

    Ok(Patient {
        id: wire.id,
        name: wire.name,
        age: wire.age,
        sex,
        occupation: wire.occupation,
        address: wire.address,
        contact_number: wire.contact_number,
        date_of_visit,
        clinical: ClinicalHistory {
            medical_history: wire.medical_history,
            family_history: wire.family_history,
            current_treatment: wire.current_treatment,
            date_of_injury: wire.date_of_injury,
            mechanism_of_injury: wire.mechanism_of_injury,
            history_of_present_illness: wire.history_of_present_illness,
            past_history: wire.past_history,
            blood_reports: wire.blood_reports,
            xray_preop: wire.xray_preop,
            ct_scan: wire.ct_scan,
            mri: wire.mri,
        },
        diagnosis,
        diagnosis_notes: wire.diagnosis_notes,
        uploaded_files: wire.uploaded_files,
    })
}

fn domain_to_wire(patient: &Patient) -> PatientWire {
    let clinical = patient.clinical.clone();
    PatientWire {
        id: patient.id.clone(),
        name: patient.name.clone(),
        age: patient.age,
        sex: patient.sex.as_str().to_string(),
        occupation: patient.occupation.clone(),
        address: patient.address.clone(),
        contact_number: patient.contact_number.clone(),
        date_of_visit: patient.date_of_visit.format(VISIT_DATE_FORMAT).to_string(),
        medical_history: clinical.medical_history,
        family_history: clinical.family_history,
        current_treatment: clinical.current_treatment,
        date_of_injury: clinical.date_of_injury,
        mechanism_of_injury: clinical.mechanism_of_injury,
        history_of_present_illness: clinical.history_of_present_illness,
        past_history: clinical.past_history,
        blood_reports: clinical.blood_reports,
        xray_preop: clinical.xray_preop,
        ct_scan: clinical.ct_scan,
        mri: clinical.mri,
        diagnosis_category: patient.diagnosis.category().as_str().to_string(),
        diagnosis_subcategory: patient.diagnosis.subcategory_label().to_string(),
        diagnosis_notes: patient.diagnosis_notes.clone(),
        uploaded_files: patient.uploaded_files.clone(),
    }
}
