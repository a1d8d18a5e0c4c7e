//! Checked construction of patient records from form input.
//!
//! A [`PatientDraft`] holds what the clinician has typed so far. It may be incomplete; only
//! [`PatientDraft::into_patient`] insists on the required fields and a valid diagnosis.

use crate::diagnosis::{Diagnosis, DiagnosisCategory};
use crate::patient::{ClinicalHistory, Patient, Sex};
use crate::{PatientError, PatientResult, RecordId};
use chrono::NaiveDate;
use orthomed_files::UploadedFile;
use orthomed_types::NonEmptyText;

/// Form values for a new or edited patient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatientDraft {
    pub name: String,
    pub age: u32,
    pub sex: Sex,
    pub occupation: String,
    pub address: String,
    pub contact_number: String,
    pub date_of_visit: NaiveDate,
    pub clinical: ClinicalHistory,
    diagnosis_category: DiagnosisCategory,
    /// Chosen subcategory label; empty while nothing is chosen.
    pub diagnosis_subcategory: String,
    pub diagnosis_notes: Option<String>,
    pub uploaded_files: Vec<UploadedFile>,
}

impl PatientDraft {
    /// An empty form dated `date_of_visit`, with the default category (Trauma) selected.
    pub fn new(date_of_visit: NaiveDate) -> Self {
        Self {
            name: String::new(),
            age: 0,
            sex: Sex::default(),
            occupation: String::new(),
            address: String::new(),
            contact_number: String::new(),
            date_of_visit,
            clinical: ClinicalHistory::default(),
            diagnosis_category: DiagnosisCategory::default(),
            diagnosis_subcategory: String::new(),
            diagnosis_notes: None,
            uploaded_files: Vec::new(),
        }
    }

    pub fn diagnosis_category(&self) -> DiagnosisCategory {
        self.diagnosis_category
    }

    /// Selects a category. Switching to a different category clears the chosen subcategory.
    pub fn set_category(&mut self, category: DiagnosisCategory) {
        if category != self.diagnosis_category {
            self.diagnosis_category = category;
            self.diagnosis_subcategory.clear();
        }
    }

    /// Turns the draft into a record with the given id.
    ///
    /// Name and contact number are trimmed. Blank optional narrative fields become `None`.
    ///
    /// # Errors
    ///
    /// - [`PatientError::MissingField`] if `name`, `contactNumber` or `diagnosisSubcategory`
    ///   is blank
    /// - [`PatientError::UnknownSubcategory`] if the subcategory is not listed for the
    ///   selected category
    pub fn into_patient(self, id: RecordId) -> PatientResult<Patient> {
        let name = NonEmptyText::new(&self.name).map_err(|_| PatientError::MissingField("name"))?;
        let contact_number = NonEmptyText::new(&self.contact_number)
            .map_err(|_| PatientError::MissingField("contactNumber"))?;

        let subcategory = self.diagnosis_subcategory.trim();
        if subcategory.is_empty() {
            return Err(PatientError::MissingField("diagnosisSubcategory"));
        }
        let diagnosis = Diagnosis::with_label(self.diagnosis_category, subcategory)?;

        Ok(Patient {
            id,
            name: name.into_string(),
            age: self.age,
            sex: self.sex,
            occupation: self.occupation,
            address: self.address,
            contact_number: contact_number.into_string(),
            date_of_visit: self.date_of_visit,
            clinical: squeeze(self.clinical),
            diagnosis,
            diagnosis_notes: blank_to_none(self.diagnosis_notes),
            uploaded_files: self.uploaded_files,
        })
    }
}

impl From<&Patient> for PatientDraft {
    fn from(patient: &Patient) -> Self {
        Self {
            name: patient.name.clone(),
            age: patient.age,
            sex: patient.sex,
            occupation: patient.occupation.clone(),
            address: patient.address.clone(),
            contact_number: patient.contact_number.clone(),
            date_of_visit: patient.date_of_visit,
            clinical: patient.clinical.clone(),
            diagnosis_category: patient.diagnosis.category(),
            diagnosis_subcategory: patient.diagnosis.subcategory_label().to_string(),
            diagnosis_notes: patient.diagnosis_notes.clone(),
            uploaded_files: patient.uploaded_files.clone(),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn squeeze(history: ClinicalHistory) -> ClinicalHistory {
    ClinicalHistory {
        medical_history: blank_to_none(history.medical_history),
        family_history: blank_to_none(history.family_history),
        current_treatment: blank_to_none(history.current_treatment),
        date_of_injury: blank_to_none(history.date_of_injury),
        mechanism_of_injury: blank_to_none(history.mechanism_of_injury),
        history_of_present_illness: blank_to_none(history.history_of_present_illness),
        past_history: blank_to_none(history.past_history),
        blood_reports: blank_to_none(history.blood_reports),
        xray_preop: blank_to_none(history.xray_preop),
        ct_scan: blank_to_none(history.ct_scan),
        mri: blank_to_none(history.mri),
    }
}
