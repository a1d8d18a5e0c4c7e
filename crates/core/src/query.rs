//! Filtering over the patient collection.
//!
//! Pure functions: they borrow the collection, never reorder it, and return the matching
//! records in their original order.

use crate::diagnosis::DiagnosisCategory;
use crate::patient::Patient;
use chrono::NaiveDate;

/// Search-screen criteria. Every criterion left unset matches all records; set criteria
/// are AND-combined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive substring of the patient name. Surrounding whitespace is ignored.
    pub name: String,
    pub category: Option<DiagnosisCategory>,
    /// Exact subcategory label, matched regardless of category.
    pub subcategory: Option<String>,
    /// Inclusive lower bound on the visit date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the visit date.
    pub date_to: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, term: impl Into<String>) -> Self {
        self.name = term.into();
        self
    }

    pub fn category(mut self, category: DiagnosisCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn subcategory(mut self, label: impl Into<String>) -> Self {
        self.subcategory = Some(label.into());
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    /// `true` when any criterion has been filled in.
    ///
    /// A whitespace-only name counts as filled in even though it matches everything.
    pub fn is_active(&self) -> bool {
        !self.name.is_empty()
            || self.category.is_some()
            || self.subcategory.as_deref().is_some_and(|s| !s.is_empty())
            || self.date_from.is_some()
            || self.date_to.is_some()
    }

    /// Does `patient` satisfy every criterion?
    pub fn matches(&self, patient: &Patient) -> bool {
        let term = self.name.trim();
        if !term.is_empty() && !patient.name.to_lowercase().contains(&term.to_lowercase()) {
            return false;
        }

        if let Some(category) = self.category {
            if patient.diagnosis.category() != category {
                return false;
            }
        }

        if let Some(label) = self.subcategory.as_deref().filter(|s| !s.is_empty()) {
            if patient.diagnosis.subcategory_label() != label {
                return false;
            }
        }

        if let Some(from) = self.date_from {
            if patient.date_of_visit < from {
                return false;
            }
        }

        if let Some(to) = self.date_to {
            if patient.date_of_visit > to {
                return false;
            }
        }

        true
    }
}

/// Records matching `criteria`, in collection order.
pub fn filter<'a>(patients: &'a [Patient], criteria: &FilterCriteria) -> Vec<&'a Patient> {
    patients.iter().filter(|p| criteria.matches(p)).collect()
}

/// Records under a navigation path: a category, optionally narrowed to one subcategory.
///
/// `category` arrives as the raw path segment; a name outside the four categories matches
/// nothing. An empty or absent `subcategory` selects the whole category.
pub fn filter_by_path<'a>(
    patients: &'a [Patient],
    category: &str,
    subcategory: Option<&str>,
) -> Vec<&'a Patient> {
    let Ok(category) = category.parse::<DiagnosisCategory>() else {
        return Vec::new();
    };

    let mut criteria = FilterCriteria::new().category(category);
    if let Some(label) = subcategory.filter(|s| !s.is_empty()) {
        criteria = criteria.subcategory(label);
    }
    filter(patients, &criteria)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::diagnosis::Diagnosis;
    use crate::patient::{ClinicalHistory, Sex};
    use crate::RecordId;

    pub(crate) fn sample(
        id: &str,
        name: &str,
        category: DiagnosisCategory,
        subcategory: &str,
        visit: (i32, u32, u32),
        age: u32,
    ) -> Patient {
        Patient {
            id: RecordId::parse(id).unwrap(),
            name: name.into(),
            age,
            sex: Sex::Other,
            occupation: String::new(),
            address: String::new(),
            contact_number: "1".into(),
            date_of_visit: NaiveDate::from_ymd_opt(visit.0, visit.1, visit.2).unwrap(),
            clinical: ClinicalHistory::default(),
            diagnosis: Diagnosis::with_label(category, subcategory).unwrap(),
            diagnosis_notes: None,
            uploaded_files: Vec::new(),
        }
    }

    fn clinic() -> Vec<Patient> {
        use crate::diagnosis::DiagnosisCategory::*;
        vec![
            sample("1", "Anil Sharma", Trauma, "Scaphoid", (2024, 1, 5), 30),
            sample("2", "Sunita Patil", Plasty, "Knee", (2024, 2, 10), 60),
            sample("3", "anita desai", Trauma, "Cervical", (2024, 3, 15), 25),
            sample("4", "Rahul Verma", Spine, "Cervical", (2024, 4, 20), 45),
            sample("5", "Kiran", Scopy, "", (2024, 5, 25), 35),
        ]
    }

    fn ids(found: &[&Patient]) -> Vec<String> {
        found.iter().map(|p| p.id.to_string()).collect()
    }

    #[test]
    fn empty_criteria_return_everything_in_order() {
        let patients = clinic();
        let criteria = FilterCriteria::new();
        assert!(!criteria.is_active());
        assert_eq!(ids(&filter(&patients, &criteria)), ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn name_is_trimmed_case_insensitive_substring() {
        let patients = clinic();
        let found = filter(&patients, &FilterCriteria::new().name("  ANI "));
        assert_eq!(ids(&found), ["1", "3"]);

        let blank = FilterCriteria::new().name("   ");
        assert!(blank.is_active());
        assert_eq!(filter(&patients, &blank).len(), 5);
    }

    #[test]
    fn subcategory_matches_across_categories() {
        let patients = clinic();
        let found = filter(&patients, &FilterCriteria::new().subcategory("Cervical"));
        assert_eq!(ids(&found), ["3", "4"]);

        let both = FilterCriteria::new()
            .category(DiagnosisCategory::Spine)
            .subcategory("Cervical");
        assert_eq!(ids(&filter(&patients, &both)), ["4"]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let patients = clinic();
        let criteria = FilterCriteria::new()
            .date_from(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap())
            .date_to(NaiveDate::from_ymd_opt(2024, 4, 20).unwrap());
        assert_eq!(ids(&filter(&patients, &criteria)), ["2", "3", "4"]);
    }

    #[test]
    fn criteria_are_and_combined() {
        let patients = clinic();
        let criteria = FilterCriteria::new()
            .name("a")
            .category(DiagnosisCategory::Trauma)
            .date_to(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(ids(&filter(&patients, &criteria)), ["1"]);
    }

    #[test]
    fn result_is_order_preserving_subsequence() {
        let patients = clinic();
        let found = filter(&patients, &FilterCriteria::new().name("a"));
        let positions: Vec<_> = found
            .iter()
            .map(|f| patients.iter().position(|p| p.id == f.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn path_filters() {
        let patients = clinic();
        assert_eq!(ids(&filter_by_path(&patients, "Trauma", None)), ["1", "3"]);
        assert_eq!(ids(&filter_by_path(&patients, "Trauma", Some(""))), ["1", "3"]);
        assert_eq!(
            ids(&filter_by_path(&patients, "Trauma", Some("Cervical"))),
            ["3"]
        );
        assert!(filter_by_path(&patients, "Spine", Some("Lumbar")).is_empty());
    }

    #[test]
    fn unknown_category_path_is_empty() {
        let patients = clinic();
        assert!(filter_by_path(&patients, "Oncology", None).is_empty());
        assert!(filter_by_path(&patients, "", None).is_empty());
    }

    #[test]
    fn empty_collection_yields_empty_result() {
        assert!(filter(&[], &FilterCriteria::new().name("x")).is_empty());
        assert!(filter_by_path(&[], "Trauma", None).is_empty());
    }
}
