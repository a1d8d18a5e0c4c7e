//! The patient store.
//!
//! [`PatientStore`] owns the authoritative, insertion-ordered collection of patient records
//! and writes the whole collection through to its [`KeyValueStore`] after every mutation.
//!
//! Mutations render the next collection from borrowed records, persist it, and only then
//! change the in-memory state. A failed write therefore leaves memory exactly as it was.
//!
//! Ids are compared exactly and are not required to be unique: `update` and `remove` act on
//! every record with the id, while `get` and the attachment operations use the first.

use crate::config::CoreConfig;
use crate::patient::Patient;
use crate::snapshot::Snapshot;
use crate::storage::KeyValueStore;
use crate::{PatientResult, RecordId};
use orthomed_files::{AttachmentLimits, FilesError, UploadedFile};
use std::iter;

/// What [`PatientStore::load_all`] found in storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet; the collection is empty.
    NoSnapshot,
    /// The snapshot parsed and `count` records were restored.
    Restored { count: usize },
    /// The snapshot could not be parsed and was ignored; the collection is empty.
    Discarded { reason: String },
}

/// Result of merging freshly ingested files into a record.
#[derive(Debug, Default)]
pub struct AttachOutcome {
    /// Ids of the files now stored on the record, in the order given.
    pub accepted: Vec<RecordId>,
    /// File name and reason for every file that was not stored.
    pub rejected: Vec<(String, FilesError)>,
}

impl AttachOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Insertion-ordered patient collection with write-through persistence.
#[derive(Debug)]
pub struct PatientStore<S> {
    storage: S,
    key: String,
    limits: AttachmentLimits,
    patients: Vec<Patient>,
}

impl<S: KeyValueStore> PatientStore<S> {
    /// An empty store over `storage`. Nothing is read until [`PatientStore::load_all`].
    pub fn new(storage: S, config: &CoreConfig) -> Self {
        Self {
            storage,
            key: config.storage_key().to_string(),
            limits: config.attachment_limits(),
            patients: Vec::new(),
        }
    }

    /// Creates the store and restores whatever is in storage.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage read itself fails.
    pub fn open(storage: S, config: &CoreConfig) -> PatientResult<(Self, LoadOutcome)> {
        let mut store = Self::new(storage, config);
        let outcome = store.load_all()?;
        Ok((store, outcome))
    }

    /// Replaces the in-memory collection with the stored snapshot.
    ///
    /// A snapshot that does not parse is logged and discarded; the collection becomes empty
    /// and storage is left untouched until the next mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn load_all(&mut self) -> PatientResult<LoadOutcome> {
        let Some(text) = self.storage.get(&self.key)? else {
            self.patients.clear();
            return Ok(LoadOutcome::NoSnapshot);
        };

        match Snapshot::parse(&text) {
            Ok(patients) => {
                let count = patients.len();
                self.patients = patients;
                tracing::debug!(key = %self.key, count, "snapshot restored");
                Ok(LoadOutcome::Restored { count })
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding unreadable snapshot");
                self.patients.clear();
                Ok(LoadOutcome::Discarded {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Every record, in insertion order.
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    /// First record with the given id.
    pub fn get(&self, id: &RecordId) -> Option<&Patient> {
        self.patients.iter().find(|p| &p.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Appends a record. Ids are not checked for uniqueness.
    pub fn add(&mut self, patient: Patient) -> PatientResult<()> {
        Self::persist(
            &mut self.storage,
            &self.key,
            self.patients.iter().chain(iter::once(&patient)),
        )?;
        self.patients.push(patient);
        Ok(())
    }

    /// Replaces every record whose id equals `patient.id`, keeping their positions.
    ///
    /// Returns `Ok(false)` without writing when no record has that id.
    pub fn update(&mut self, patient: Patient) -> PatientResult<bool> {
        if self.get(&patient.id).is_none() {
            return Ok(false);
        }

        Self::persist(
            &mut self.storage,
            &self.key,
            self.patients
                .iter()
                .map(|p| if p.id == patient.id { &patient } else { p }),
        )?;
        for slot in self.patients.iter_mut().filter(|p| p.id == patient.id) {
            *slot = patient.clone();
        }
        Ok(true)
    }

    /// Removes every record with the given id.
    ///
    /// Returns `Ok(false)` without writing when no record has that id.
    pub fn remove(&mut self, id: &RecordId) -> PatientResult<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }

        Self::persist(
            &mut self.storage,
            &self.key,
            self.patients.iter().filter(|p| &p.id != id),
        )?;
        self.patients.retain(|p| &p.id != id);
        Ok(true)
    }

    /// Appends `files` to the attachment list the record has right now.
    ///
    /// Every file is checked again (type, size, payload, per-record cap) against the list
    /// as it grows, so files ingested concurrently can never push a record past the cap.
    /// Rejected files are reported and never stored. Nothing is written when no file is
    /// accepted.
    ///
    /// Returns `Ok(None)` when no record has that id.
    pub fn append_attachments(
        &mut self,
        id: &RecordId,
        files: Vec<UploadedFile>,
    ) -> PatientResult<Option<AttachOutcome>> {
        let Some(index) = self.patients.iter().position(|p| &p.id == id) else {
            return Ok(None);
        };

        let existing = self.patients[index].uploaded_files.len();
        let mut added: Vec<UploadedFile> = Vec::new();
        let mut outcome = AttachOutcome::default();

        for file in files {
            let checked = self
                .limits
                .check_capacity(file.name.as_str(), existing + added.len())
                .and_then(|()| self.limits.check_uploaded(&file));

            match checked {
                Ok(()) => {
                    outcome.accepted.push(file.id.clone());
                    added.push(file);
                }
                Err(e) => {
                    tracing::warn!(patient = %id, error = %e, "attachment rejected");
                    outcome.rejected.push((file.name.into_string(), e));
                }
            }
        }

        if !added.is_empty() {
            let mut updated = self.patients[index].clone();
            updated.uploaded_files.extend(added);
            self.replace_at(index, updated)?;
        }

        Ok(Some(outcome))
    }

    /// Removes an attachment from the first record with `patient_id`.
    ///
    /// Returns `Ok(false)` when the record or the attachment does not exist.
    pub fn remove_attachment(
        &mut self,
        patient_id: &RecordId,
        file_id: &RecordId,
    ) -> PatientResult<bool> {
        let Some(index) = self.patients.iter().position(|p| &p.id == patient_id) else {
            return Ok(false);
        };
        if self.patients[index].attachment(file_id).is_none() {
            return Ok(false);
        }

        let mut updated = self.patients[index].clone();
        updated.uploaded_files.retain(|f| &f.id != file_id);
        self.replace_at(index, updated)?;
        Ok(true)
    }

    /// Persists the collection with `patient` at `index`, then swaps it in.
    fn replace_at(&mut self, index: usize, patient: Patient) -> PatientResult<()> {
        Self::persist(
            &mut self.storage,
            &self.key,
            self.patients
                .iter()
                .enumerate()
                .map(|(i, p)| if i == index { &patient } else { p }),
        )?;
        self.patients[index] = patient;
        Ok(())
    }

    /// Writes `records` as the stored snapshot. Memory is not touched.
    fn persist<'a>(
        storage: &mut S,
        key: &str,
        records: impl IntoIterator<Item = &'a Patient>,
    ) -> PatientResult<()> {
        let text = Snapshot::render(records)?;
        storage.set(key, &text)?;
        tracing::debug!(key, bytes = text.len(), "snapshot persisted");
        Ok(())
    }
}
