//! Aggregates shown on the dashboard and category pages.
//!
//! Every function accepts any iterator of borrowed records, so it works equally on the
//! whole collection and on a filtered subset. Empty input gives zero, never an error.

use crate::constants::RECENT_PATIENTS_LIMIT;
use crate::diagnosis::{DiagnosisCategory, DiagnosisSubcategory};
use crate::patient::Patient;
use chrono::{Datelike, NaiveDate};

/// Record count per diagnosis category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: [usize; 4],
}

impl CategoryCounts {
    pub fn tally<'a>(patients: impl IntoIterator<Item = &'a Patient>) -> Self {
        let mut counts = [0; 4];
        for patient in patients {
            counts[patient.diagnosis.category().index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, category: DiagnosisCategory) -> usize {
        self.counts[category.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(category, count)` for all four categories, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (DiagnosisCategory, usize)> + '_ {
        DiagnosisCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// Record count for every subcategory in the table, zeros included, in table order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubcategoryCounts {
    entries: Vec<(DiagnosisSubcategory, usize)>,
}

impl SubcategoryCounts {
    pub fn tally<'a>(patients: impl IntoIterator<Item = &'a Patient>) -> Self {
        let mut entries: Vec<(DiagnosisSubcategory, usize)> =
            DiagnosisSubcategory::all().map(|s| (s, 0)).collect();

        for patient in patients {
            if let Some(sub) = patient.diagnosis.subcategory() {
                if let Some(entry) = entries.iter_mut().find(|(s, _)| *s == sub) {
                    entry.1 += 1;
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, subcategory: DiagnosisSubcategory) -> usize {
        self.entries
            .iter()
            .find(|(s, _)| *s == subcategory)
            .map_or(0, |(_, n)| *n)
    }

    /// Entries for one category, in table order.
    pub fn for_category(
        &self,
        category: DiagnosisCategory,
    ) -> impl Iterator<Item = (DiagnosisSubcategory, usize)> + '_ {
        self.entries
            .iter()
            .copied()
            .filter(move |(s, _)| s.category() == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DiagnosisSubcategory, usize)> + '_ {
        self.entries.iter().copied()
    }
}

/// Records whose visit falls in the given calendar month.
pub fn visits_in_month<'a>(
    patients: impl IntoIterator<Item = &'a Patient>,
    year: i32,
    month: u32,
) -> usize {
    patients
        .into_iter()
        .filter(|p| p.date_of_visit.year() == year && p.date_of_visit.month() == month)
        .count()
}

/// Records visited in the same month and year as `today`.
pub fn visits_this_month<'a>(
    patients: impl IntoIterator<Item = &'a Patient>,
    today: NaiveDate,
) -> usize {
    visits_in_month(patients, today.year(), today.month())
}

/// Mean age rounded to the nearest whole year, halves rounding up. `0` for no records.
pub fn average_age<'a>(patients: impl IntoIterator<Item = &'a Patient>) -> u32 {
    let (sum, n) = patients
        .into_iter()
        .fold((0u64, 0u64), |(sum, n), p| (sum + u64::from(p.age), n + 1));

    if n == 0 {
        return 0;
    }
    // round(sum / n) with .5 going up, in integers
    let rounded = (2 * sum + n) / (2 * n);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// The last five records added, most recent first.
pub fn recent_patients(patients: &[Patient]) -> Vec<&Patient> {
    patients.iter().rev().take(RECENT_PATIENTS_LIMIT).collect()
}

/// Everything the dashboard shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardSummary<'a> {
    pub total: usize,
    pub categories: CategoryCounts,
    pub visits_this_month: usize,
    pub recent: Vec<&'a Patient>,
}

impl<'a> DashboardSummary<'a> {
    pub fn compute(patients: &'a [Patient], today: NaiveDate) -> Self {
        Self {
            total: patients.len(),
            categories: CategoryCounts::tally(patients),
            visits_this_month: visits_this_month(patients, today),
            recent: recent_patients(patients),
        }
    }
}

/// Figures shown above a category or subcategory listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathSummary {
    pub matching: usize,
    pub visits_this_month: usize,
    pub average_age: u32,
}

impl PathSummary {
    pub fn compute(matches: &[&Patient], today: NaiveDate) -> Self {
        Self {
            matching: matches.len(),
            visits_this_month: visits_this_month(matches.iter().copied(), today),
            average_age: average_age(matches.iter().copied()),
        }
    }
}
