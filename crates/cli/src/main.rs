use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use orthomed_core::{
    data_dir_from_env_value, filter, filter_by_path, storage_key_from_env_value, CoreConfig,
    DashboardSummary, DiagnosisCategory, FileCategory, FileIngestor, FileStorage,
    FilterCriteria, LoadOutcome, PathSummary, Patient, PatientDraft, PatientStore, RecordId,
    Sex, SubcategoryCounts,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "orthomed")]
#[command(about = "OrthoMed orthopedic patient records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new patient
    Add {
        #[command(flatten)]
        fields: PatientFields,
        /// Files to attach (JPEG, PNG or PDF, up to 10 MB each)
        #[arg(long = "attach", num_args = 1..)]
        attach: Vec<PathBuf>,
        /// Category recorded for attached files
        #[arg(long, default_value = "other")]
        file_category: FileCategory,
    },
    /// Edit an existing patient; only the given fields change
    Edit {
        id: RecordId,
        #[command(flatten)]
        fields: PatientFields,
    },
    /// List all patients in the order they were added
    List,
    /// Show one patient in full
    Show { id: RecordId },
    /// Delete a patient
    Remove { id: RecordId },
    /// Search by name, diagnosis and visit date
    Search {
        /// Part of the patient name (case-insensitive)
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        category: Option<DiagnosisCategory>,
        #[arg(long)]
        subcategory: Option<String>,
        /// Earliest visit date (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest visit date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Patients under a diagnosis category, optionally one subcategory
    Browse {
        category: String,
        subcategory: Option<String>,
    },
    /// Dashboard figures
    Stats,
    /// Patient counts for every diagnosis subcategory
    Categories,
    /// Attach files to a patient
    Attach {
        id: RecordId,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "other")]
        category: FileCategory,
    },
    /// Remove an attachment from a patient
    Detach { id: RecordId, file_id: RecordId },
    /// Write an attachment's content to disk
    Download {
        id: RecordId,
        file_id: RecordId,
        /// Output path (defaults to the attachment's file name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Form fields shared by `add` and `edit`.
#[derive(Args, Default)]
struct PatientFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    /// Male, Female or Other
    #[arg(long)]
    sex: Option<Sex>,
    #[arg(long)]
    occupation: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    contact: Option<String>,
    /// Visit date (YYYY-MM-DD); `add` defaults to today
    #[arg(long)]
    visit_date: Option<NaiveDate>,
    /// Trauma, Plasty, Scopy or Spine
    #[arg(long)]
    category: Option<DiagnosisCategory>,
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[command(flatten)]
    clinical: ClinicalFields,
}

#[derive(Args, Default)]
struct ClinicalFields {
    #[arg(long)]
    medical_history: Option<String>,
    #[arg(long)]
    family_history: Option<String>,
    #[arg(long)]
    current_treatment: Option<String>,
    #[arg(long)]
    date_of_injury: Option<String>,
    #[arg(long)]
    mechanism_of_injury: Option<String>,
    #[arg(long)]
    history_of_present_illness: Option<String>,
    #[arg(long)]
    past_history: Option<String>,
    #[arg(long)]
    blood_reports: Option<String>,
    #[arg(long)]
    xray_preop: Option<String>,
    #[arg(long)]
    ct_scan: Option<String>,
    #[arg(long)]
    mri: Option<String>,
}

fn replace(target: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *target = value;
    }
}

impl PatientFields {
    /// Copies every given field onto the draft. A category change clears the subcategory
    /// unless a new one is given alongside it.
    fn apply(self, draft: &mut PatientDraft) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(age) = self.age {
            draft.age = age;
        }
        if let Some(sex) = self.sex {
            draft.sex = sex;
        }
        if let Some(occupation) = self.occupation {
            draft.occupation = occupation;
        }
        if let Some(address) = self.address {
            draft.address = address;
        }
        if let Some(contact) = self.contact {
            draft.contact_number = contact;
        }
        if let Some(date) = self.visit_date {
            draft.date_of_visit = date;
        }
        if let Some(category) = self.category {
            draft.set_category(category);
        }
        if let Some(subcategory) = self.subcategory {
            draft.diagnosis_subcategory = subcategory;
        }
        replace(&mut draft.diagnosis_notes, self.notes);

        let c = self.clinical;
        let h = &mut draft.clinical;
        replace(&mut h.medical_history, c.medical_history);
        replace(&mut h.family_history, c.family_history);
        replace(&mut h.current_treatment, c.current_treatment);
        replace(&mut h.date_of_injury, c.date_of_injury);
        replace(&mut h.mechanism_of_injury, c.mechanism_of_injury);
        replace(&mut h.history_of_present_illness, c.history_of_present_illness);
        replace(&mut h.past_history, c.past_history);
        replace(&mut h.blood_reports, c.blood_reports);
        replace(&mut h.xray_preop, c.xray_preop);
        replace(&mut h.ct_scan, c.ct_scan);
        replace(&mut h.mri, c.mri);
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orthomed=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'orthomed --help' for commands");
        return Ok(());
    };

    let data_dir = data_dir_from_env_value(std::env::var("ORTHOMED_DATA_DIR").ok());
    let storage_key = storage_key_from_env_value(std::env::var("ORTHOMED_STORAGE_KEY").ok())?;
    let config = Arc::new(CoreConfig::new(data_dir, storage_key)?);

    run(command, config)
}

fn run(command: Commands, config: Arc<CoreConfig>) -> anyhow::Result<()> {
    let storage = FileStorage::open(config.data_dir())
        .with_context(|| format!("opening {}", config.data_dir().display()))?;
    let (mut store, outcome) = PatientStore::open(storage, &config)?;
    tracing::debug!(?outcome, key = config.storage_key(), "patient store opened");
    if let LoadOutcome::Discarded { reason } = &outcome {
        eprintln!("Warning: stored records could not be read and were ignored ({reason})");
    }

    let today = Local::now().date_naive();

    match command {
        Commands::Add {
            fields,
            attach,
            file_category,
        } => {
            let mut draft = PatientDraft::new(today);
            fields.apply(&mut draft);
            let patient = draft.into_patient(RecordId::generate())?;
            let id = patient.id.clone();
            let name = patient.name.clone();
            store.add(patient)?;
            println!("Added {name} ({id})");

            if !attach.is_empty() {
                attach_files(&mut store, &config, &id, &attach, file_category)?;
            }
        }
        Commands::Edit { id, fields } => {
            let Some(existing) = store.get(&id) else {
                bail!("no patient with id {id}");
            };
            let mut draft = PatientDraft::from(existing);
            fields.apply(&mut draft);
            let patient = draft.into_patient(id.clone())?;
            store.update(patient)?;
            println!("Updated {id}");
        }
        Commands::List => {
            if store.is_empty() {
                println!("No patients found.");
            }
            for patient in store.patients() {
                println!("{}", summary_line(patient));
            }
        }
        Commands::Show { id } => {
            let Some(patient) = store.get(&id) else {
                bail!("no patient with id {id}");
            };
            print_patient(patient);
        }
        Commands::Remove { id } => {
            if store.remove(&id)? {
                println!("Removed {id}");
            } else {
                println!("No patient with id {id}; nothing removed");
            }
        }
        Commands::Search {
            name,
            category,
            subcategory,
            from,
            to,
        } => {
            let criteria = FilterCriteria {
                name,
                category,
                subcategory,
                date_from: from,
                date_to: to,
            };
            let found = filter(store.patients(), &criteria);
            if criteria.is_active() {
                println!("{} of {} patients match", found.len(), store.len());
            }
            for patient in found {
                println!("{}", summary_line(patient));
            }
        }
        Commands::Browse {
            category,
            subcategory,
        } => {
            let found = filter_by_path(store.patients(), &category, subcategory.as_deref());
            let summary = PathSummary::compute(&found, today);
            println!(
                "{} patient{} | {} this month | average age {}",
                summary.matching,
                if summary.matching == 1 { "" } else { "s" },
                summary.visits_this_month,
                summary.average_age
            );

            if subcategory.as_deref().map_or(true, str::is_empty) {
                if let Ok(category) = category.parse::<DiagnosisCategory>() {
                    let counts = SubcategoryCounts::tally(store.patients());
                    for (sub, n) in counts.for_category(category) {
                        println!("  {:<20} {n}", sub.label());
                    }
                }
            }
            for patient in found {
                println!("{}", summary_line(patient));
            }
        }
        Commands::Stats => {
            let summary = DashboardSummary::compute(store.patients(), today);
            println!("Total patients:   {}", summary.total);
            println!("Visits this month: {}", summary.visits_this_month);
            for (category, n) in summary.categories.iter() {
                println!("  {:<8} {n}", category.as_str());
            }
            println!("  {:<8} {}", "Total", summary.categories.total());
            if !summary.recent.is_empty() {
                println!("Recent patients:");
                for patient in summary.recent {
                    println!("  {}", summary_line(patient));
                }
            }
        }
        Commands::Categories => {
            let counts = SubcategoryCounts::tally(store.patients());
            for category in DiagnosisCategory::ALL {
                println!("{category}");
                for (sub, n) in counts.for_category(category) {
                    println!("  {:<20} {n}", sub.label());
                }
            }
        }
        Commands::Attach {
            id,
            files,
            category,
        } => {
            attach_files(&mut store, &config, &id, &files, category)?;
        }
        Commands::Detach { id, file_id } => {
            if store.remove_attachment(&id, &file_id)? {
                println!("Removed attachment {file_id}");
            } else {
                println!("No attachment {file_id} on patient {id}");
            }
        }
        Commands::Download { id, file_id, out } => {
            let Some(patient) = store.get(&id) else {
                bail!("no patient with id {id}");
            };
            let Some(file) = patient.attachment(&file_id) else {
                bail!("no attachment {file_id} on patient {id}");
            };
            let out = out.unwrap_or_else(|| PathBuf::from(file.name.as_str()));
            std::fs::write(&out, file.content()?)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} ({})", out.display(), file.display_size());
        }
    }

    Ok(())
}

fn attach_files(
    store: &mut PatientStore<FileStorage>,
    config: &CoreConfig,
    id: &RecordId,
    paths: &[PathBuf],
    category: FileCategory,
) -> anyhow::Result<()> {
    let Some(patient) = store.get(id) else {
        bail!("no patient with id {id}");
    };

    let ingestor = FileIngestor::new(config.attachment_limits());
    let report = ingestor.ingest_batch(paths, category, &patient.uploaded_files);
    for (name, err) in &report.rejected {
        eprintln!("Skipped {name}: {err}");
    }

    let Some(outcome) = store.append_attachments(id, report.accepted)? else {
        bail!("no patient with id {id}");
    };
    for (name, err) in &outcome.rejected {
        eprintln!("Skipped {name}: {err}");
    }
    println!("Attached {} file(s) to {id}", outcome.accepted.len());
    Ok(())
}

fn summary_line(patient: &Patient) -> String {
    let subcategory = patient.diagnosis.subcategory_label();
    format!(
        "{}  {}  {}y {}  {}  {}{}{}",
        patient.id,
        patient.name,
        patient.age,
        patient.sex,
        patient.date_of_visit,
        patient.diagnosis.category(),
        if subcategory.is_empty() { "" } else { " / " },
        subcategory
    )
}

fn print_patient(patient: &Patient) {
    println!("{}", patient.name);
    println!("  ID:          {}", patient.id);
    println!("  Age / sex:   {} / {}", patient.age, patient.sex);
    println!("  Occupation:  {}", patient.occupation);
    println!("  Address:     {}", patient.address);
    println!("  Contact:     {}", patient.contact_number);
    println!("  Visit date:  {}", patient.date_of_visit);
    println!(
        "  Diagnosis:   {} / {}",
        patient.diagnosis.category(),
        patient.diagnosis.subcategory_label()
    );
    if let Some(notes) = &patient.diagnosis_notes {
        println!("  Notes:       {notes}");
    }
    for (label, value) in patient.clinical.entries() {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    if !patient.uploaded_files.is_empty() {
        println!("  Attachments:");
        for file in &patient.uploaded_files {
            println!(
                "    {}  {}  {}  {}  {}",
                file.id,
                file.name,
                file.category,
                file.display_size(),
                file.upload_date.format("%Y-%m-%d %H:%M")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_typed_fields() {
        let cli = Cli::try_parse_from([
            "orthomed",
            "add",
            "--name",
            "Asha",
            "--sex",
            "Female",
            "--category",
            "Spine",
            "--subcategory",
            "Lumbar",
            "--visit-date",
            "2024-06-03",
            "--mri",
            "L4-L5 disc bulge",
        ])
        .unwrap();

        let Some(Commands::Add { fields, attach, .. }) = cli.command else {
            panic!("expected add");
        };
        assert!(attach.is_empty());
        assert_eq!(fields.sex, Some(Sex::Female));
        assert_eq!(fields.category, Some(DiagnosisCategory::Spine));
        assert_eq!(fields.clinical.mri.as_deref(), Some("L4-L5 disc bulge"));
    }

    #[test]
    fn rejects_unknown_category_value() {
        assert!(Cli::try_parse_from(["orthomed", "add", "--category", "Oncology"]).is_err());
        assert!(Cli::try_parse_from(["orthomed", "search", "--from", "03/06/2024"]).is_err());
    }

    #[test]
    fn apply_changes_category_and_clears_subcategory() {
        let mut draft = PatientDraft::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        draft.diagnosis_subcategory = "Scaphoid".into();
        draft.clinical.mri = Some("old".into());

        PatientFields {
            category: Some(DiagnosisCategory::Plasty),
            ..Default::default()
        }
        .apply(&mut draft);

        assert_eq!(draft.diagnosis_category(), DiagnosisCategory::Plasty);
        assert!(draft.diagnosis_subcategory.is_empty());
        assert_eq!(draft.clinical.mri.as_deref(), Some("old"));
    }

    #[test]
    fn apply_category_with_new_subcategory() {
        let mut draft = PatientDraft::new(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        draft.diagnosis_subcategory = "Scaphoid".into();

        PatientFields {
            category: Some(DiagnosisCategory::Scopy),
            subcategory: Some("Ankle".into()),
            ..Default::default()
        }
        .apply(&mut draft);

        assert_eq!(draft.diagnosis_subcategory, "Ankle");
    }
}
