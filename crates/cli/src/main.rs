use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trialos_core::config::ConsentFollowUp;
use trialos_core::consent::ConsentMethod;
use trialos_core::constants::DEFAULT_QUICK_ENTRY_MIN_CHARS;
use trialos_core::intake::{IntakeKind, PatientForm};
use trialos_core::notify::RecordingNotifier;
use trialos_core::routing::Destination;
use trialos_core::services::Services;
use trialos_core::{
    CoreConfig, PatientIdGenerator, Roster, SimulatedDelays, TrialCatalogue, WorkflowSession,
};

#[derive(Parser)]
#[command(name = "trialos")]
#[command(about = "TrialOS patient matching workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the dashboard pages
    Routes,
    /// List the demo patient roster
    Patients {
        /// Filter on name, diagnosis or id
        #[arg(long)]
        query: Option<String>,
    },
    /// List the trial catalogue, best score first
    Trials {
        /// YAML file to load instead of the embedded catalogue
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
    /// Add a patient by form, collect SMS consent and run matching
    Walkthrough {
        /// Wait for the dashboard's simulated delays instead of skipping them
        #[arg(long)]
        real_delays: bool,
        /// Continue straight to profile review after consent
        #[arg(long)]
        review_after_consent: bool,
    },
}

fn demo_roster() -> Roster {
    Roster::with_demo_patients(PatientIdGenerator::random_start())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Routes) => {
            for destination in Destination::ALL {
                println!("{:<15} {}", destination.path(), destination.title());
            }
        }
        Some(Commands::Patients { query }) => {
            let patients = demo_roster().search(query.as_deref().unwrap_or_default());
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Age: {}, Diagnosis: {}, Status: {}",
                        patient.id, patient.name, patient.age, patient.diagnosis, patient.status
                    );
                }
            }
        }
        Some(Commands::Trials { fixtures }) => {
            let catalogue = match fixtures {
                Some(path) => TrialCatalogue::load(&path)?,
                None => TrialCatalogue::dashboard()?,
            };
            for trial in catalogue.ranked() {
                println!(
                    "{:>3}%  {}  {} ({}, {})",
                    trial.score, trial.id, trial.title, trial.phase, trial.sponsor
                );
                println!(
                    "      met {}/{} criteria, {} at {}",
                    trial.criteria.met.len(),
                    trial.criteria.total(),
                    trial.status,
                    trial.location
                );
            }
        }
        Some(Commands::Walkthrough {
            real_delays,
            review_after_consent,
        }) => walkthrough(real_delays, review_after_consent).await?,
        None => {
            println!("Use 'trialos --help' for commands");
        }
    }

    Ok(())
}

async fn walkthrough(
    real_delays: bool,
    review_after_consent: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let delays = if real_delays {
        SimulatedDelays::dashboard()
    } else {
        SimulatedDelays::none()
    };
    let follow_up = if review_after_consent {
        ConsentFollowUp::Review
    } else {
        ConsentFollowUp::List
    };
    let cfg = Arc::new(CoreConfig::new(delays, DEFAULT_QUICK_ENTRY_MIN_CHARS, follow_up, None)?);
    let catalogue = TrialCatalogue::from_config(&cfg)?;
    let notifier = Arc::new(RecordingNotifier::new());
    let session = WorkflowSession::new(
        cfg.clone(),
        Services::simulated(&cfg, catalogue),
        notifier.clone(),
        demo_roster(),
    );

    let print_notifications = || {
        for n in notifier.drain() {
            println!("  [{:?}] {}: {}", n.kind, n.title, n.message);
        }
    };

    session
        .with_controller(|c| {
            c.add_patient()?;
            c.choose_intake(IntakeKind::Form)
        })
        .await?;
    let form = PatientForm {
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        date_of_birth: "1970-01-01".into(),
        primary_diagnosis: "Lung Cancer".into(),
        contact_phone: "5551234567".into(),
        ..PatientForm::default()
    };
    let patient = session.with_controller(|c| c.submit_form(form)).await?;
    println!("Added {} ({}), age {}, {}", patient.name, patient.id, patient.age, patient.status);
    print_notifications();

    println!("Sending e-consent by SMS...");
    session
        .request_consent(ConsentMethod::Sms, Some("5551234567"))
        .await?;
    print_notifications();

    if !review_after_consent {
        session.with_controller(|c| c.select_patient(patient.id)).await?;
    }
    println!("Running trial matching...");
    let trials = session.proceed_to_matching().await?.unwrap_or_default();
    print_notifications();

    for trial in &trials {
        println!("{:>3}%  {}  {}", trial.score, trial.id, trial.title);
    }
    let status = session
        .with_controller(|c| c.patient(patient.id).map(|p| p.status))
        .await;
    if let Some(status) = status {
        println!("{} is now {}", patient.name, status);
    }

    Ok(())
}
