//! Orthopedic diagnosis taxonomy.
//!
//! Two fixed levels: a closed [`DiagnosisCategory`] and, per category, a fixed list of
//! subcategory labels. A [`DiagnosisSubcategory`] can only be built from a label that appears
//! in its category's list, and [`Diagnosis`] keeps the pair consistent: changing the category
//! drops the subcategory.

use crate::{PatientError, PatientResult};
use std::fmt;
use std::str::FromStr;

const TRAUMA: &[&str] = &[
    "Cervical",
    "Chunk",
    "Scapula",
    "Proximal Humerus",
    "Shaft Humerus",
    "Distal Humerus",
    "Capitellum",
    "Trochlea",
    "Radial head",
    "Olecranon",
    "Monteggia",
    "Terrible Triad",
    "Coronoid",
    "Shaft Radius",
    "Shaft Ulna",
    "DRUJ",
    "Galeazzi",
    "DER",
    "Scaphoid",
    "Metacarpals",
    "Phalangeal",
    "Pelvic",
    "Acetabulum",
    "Head of femur",
    "NOT",
    "IT",
    "Subtrochanteric",
    "SOF",
    "Distal femur",
    "Segmental femur",
    "Hoffa",
    "Tibial spine",
    "Prox tibia",
    "SOT",
    "Distal tibia",
    "MM",
    "Bimalleolar",
    "Trimelleolar",
    "Calcaneum",
    "Talus",
    "Lisfranc",
    "Metatarsals",
];

const PLASTY: &[&str] = &["Hip", "Knee", "Shoulder", "Radial head", "Elbow", "UKR"];

const SCOPY: &[&str] = &["Knee", "Ankle", "Hip", "Shoulder"];

const SPINE: &[&str] = &[
    "Cervical",
    "Dorsal",
    "Lumbar",
    "Sacrum",
    "Others",
    "Dorsal spine",
    "Lumbar spine",
];

/// Top-level diagnosis group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DiagnosisCategory {
    #[default]
    Trauma,
    Plasty,
    Scopy,
    Spine,
}

impl DiagnosisCategory {
    /// Every category, in display order.
    pub const ALL: [DiagnosisCategory; 4] = [
        DiagnosisCategory::Trauma,
        DiagnosisCategory::Plasty,
        DiagnosisCategory::Scopy,
        DiagnosisCategory::Spine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosisCategory::Trauma => "Trauma",
            DiagnosisCategory::Plasty => "Plasty",
            DiagnosisCategory::Scopy => "Scopy",
            DiagnosisCategory::Spine => "Spine",
        }
    }

    /// Valid subcategory labels for this category, in display order.
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            DiagnosisCategory::Trauma => TRAUMA,
            DiagnosisCategory::Plasty => PLASTY,
            DiagnosisCategory::Scopy => SCOPY,
            DiagnosisCategory::Spine => SPINE,
        }
    }

    /// Returns `true` if `label` is one of this category's subcategories (exact match).
    pub fn has_subcategory(self, label: &str) -> bool {
        self.subcategories().iter().any(|known| *known == label)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            DiagnosisCategory::Trauma => 0,
            DiagnosisCategory::Plasty => 1,
            DiagnosisCategory::Scopy => 2,
            DiagnosisCategory::Spine => 3,
        }
    }
}

impl fmt::Display for DiagnosisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosisCategory {
    type Err = PatientError;

    /// Exact, case-sensitive match on the category name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagnosisCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PatientError::UnknownCategory(s.to_string()))
    }
}

/// A subcategory label known to belong to its category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiagnosisSubcategory {
    category: DiagnosisCategory,
    label: &'static str,
}

impl DiagnosisSubcategory {
    /// Looks `label` up in the category's fixed list.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::UnknownSubcategory`] if the label is not listed for `category`.
    pub fn new(category: DiagnosisCategory, label: &str) -> PatientResult<Self> {
        category
            .subcategories()
            .iter()
            .find(|known| **known == label)
            .map(|known| Self {
                category,
                label: *known,
            })
            .ok_or_else(|| PatientError::UnknownSubcategory {
                category,
                label: label.to_string(),
            })
    }

    pub fn category(&self) -> DiagnosisCategory {
        self.category
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Every subcategory of every category, in table order.
    pub fn all() -> impl Iterator<Item = DiagnosisSubcategory> {
        DiagnosisCategory::ALL.into_iter().flat_map(|category| {
            category
                .subcategories()
                .iter()
                .map(move |label| DiagnosisSubcategory {
                    category,
                    label: *label,
                })
        })
    }
}

impl fmt::Display for DiagnosisSubcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// Category plus optional subcategory, always consistent with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Diagnosis {
    category: DiagnosisCategory,
    subcategory: Option<DiagnosisSubcategory>,
}

impl Diagnosis {
    /// Builds a diagnosis from a category and a (possibly empty) subcategory label.
    ///
    /// An empty label means "not chosen".
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::UnknownSubcategory`] for a non-empty label not listed for
    /// `category`.
    pub fn with_label(category: DiagnosisCategory, label: &str) -> PatientResult<Self> {
        let subcategory = if label.is_empty() {
            None
        } else {
            Some(DiagnosisSubcategory::new(category, label)?)
        };
        Ok(Self {
            category,
            subcategory,
        })
    }

    pub fn category(&self) -> DiagnosisCategory {
        self.category
    }

    pub fn subcategory(&self) -> Option<DiagnosisSubcategory> {
        self.subcategory
    }

    /// Subcategory label, or `""` when none is chosen.
    pub fn subcategory_label(&self) -> &'static str {
        self.subcategory.map(|s| s.label()).unwrap_or("")
    }

    /// Switches category. A real change clears the subcategory; setting the same category
    /// again keeps it. Returns `true` if a subcategory was cleared.
    pub fn set_category(&mut self, category: DiagnosisCategory) -> bool {
        if category == self.category {
            return false;
        }
        self.category = category;
        self.subcategory.take().is_some()
    }

    /// Chooses a subcategory under the current category; an empty label clears it.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::UnknownSubcategory`] and leaves the diagnosis unchanged when
    /// the label is not listed for the current category.
    pub fn set_subcategory(&mut self, label: &str) -> PatientResult<()> {
        *self = Self::with_label(self.category, label)?;
        Ok(())
    }
}
