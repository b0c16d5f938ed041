use clap::{Parser, Subcommand};
use physio_core::config::{match_policy_from_env_value, store_backend_from_env_values};
use physio_core::constants::{ENV_MARKER_MATCH, ENV_PATIENT_DATA_DIR, ENV_STORE};
use physio_core::{
    BundleService, CoreConfig, EmailAddress, ExerciseRecord, NonEmptyText, PatientRegistration,
    StoredBundle, UserId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "physio")]
#[command(about = "Physio bundle store CLI")]
struct Cli {
    /// Patient data directory (overrides PATIENT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient from a JSON registration file
    Register {
        /// Path to the registration JSON
        file: PathBuf,
    },
    /// Merge an exercise upload batch (JSON array) into the patient's exercise bundle
    Upload {
        /// Patient email
        #[arg(long)]
        email: String,
        /// Patient first name
        #[arg(long)]
        first_name: String,
        /// Patient last name
        #[arg(long)]
        last_name: String,
        /// Path to the upload batch JSON
        file: PathBuf,
    },
    /// Print the patient bundle for an email
    ExportPatient {
        /// Patient email
        email: String,
    },
    /// Print every patient bundle assigned to a clinician
    ExportClinician {
        /// Clinician email
        email: String,
    },
    /// Print the exercise bundles for a user id
    ExportExercise {
        /// User id
        user_id: String,
    },
}

fn open_service(data_dir: Option<PathBuf>) -> Result<BundleService, Box<dyn std::error::Error>> {
    let dir = data_dir
        .map(|d| d.display().to_string())
        .or_else(|| std::env::var(ENV_PATIENT_DATA_DIR).ok());
    let backend = store_backend_from_env_values(std::env::var(ENV_STORE).ok(), dir)?;
    let policy = match_policy_from_env_value(std::env::var(ENV_MARKER_MATCH).ok())?;
    Ok(BundleService::open(Arc::new(CoreConfig::new(backend, policy)))?)
}

fn print_bundles(bundles: &[StoredBundle]) -> Result<(), Box<dyn std::error::Error>> {
    let values = bundles
        .iter()
        .map(StoredBundle::to_json_value)
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'physio --help' for commands");
        return Ok(());
    };
    let service = open_service(cli.data_dir)?;

    match command {
        Commands::Register { file } => {
            let registration: PatientRegistration =
                serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let registered = service.register_patient(registration)?;
            println!(
                "Registered patient {} (bundle {})",
                registered.link.user_id(),
                registered.document_id
            );
        }
        Commands::Upload {
            email,
            first_name,
            last_name,
            file,
        } => {
            let records: Vec<ExerciseRecord> =
                serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let outcome = service.upload_exercise_batch(
                &EmailAddress::parse(&email)?,
                &NonEmptyText::new(&first_name)?,
                &NonEmptyText::new(&last_name)?,
                &records,
            )?;
            if outcome.created {
                println!("New exercise bundle created: {}", outcome.document_id);
            } else {
                println!(
                    "Exercise data added to existing exercise bundle: {}",
                    outcome.document_id
                );
            }
        }
        Commands::ExportPatient { email } => {
            match service.export_patient_bundle(&EmailAddress::parse(&email)?)? {
                Some(stored) => {
                    println!("{}", serde_json::to_string_pretty(&stored.to_json_value()?)?)
                }
                None => eprintln!("No patient bundle for {email}"),
            }
        }
        Commands::ExportClinician { email } => {
            print_bundles(&service.export_bundles_for_clinician(&EmailAddress::parse(&email)?)?)?;
        }
        Commands::ExportExercise { user_id } => {
            print_bundles(&service.export_exercise_bundles(&UserId::new(&user_id)?)?)?;
        }
    }

    Ok(())
}
