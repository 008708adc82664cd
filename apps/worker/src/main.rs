mod config;
mod main_lib;
mod scheduler;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::Config;
use fxbridge_core::import::ImportJob;
use main_lib::{build_state, init_tracing, AppState};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "fxbridge-worker")]
#[command(about = "Imports bank exchange rates into the company currency gateway", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler until Ctrl+C or SIGTERM (default)
    Run,

    /// Import rates once for a company, outside the schedule
    Import {
        #[arg(long)]
        company: String,

        /// Value date (yyyy-mm-dd); latest published rates when omitted
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Gateway environment; the configured default when omitted or not allowed
        #[arg(long)]
        environment: Option<String>,

        /// Rate source code, e.g. MNB or ECB
        #[arg(long)]
        source: Option<String>,
    },

    /// Print the import options and registered rate sources as JSON
    Modules,

    /// Validate the schedule file
    CheckSchedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(state).await,
        Commands::Import {
            company,
            date,
            environment,
            source,
        } => import(&state, &company, date, environment.as_deref(), source.as_deref()).await,
        Commands::Modules => {
            let options = state.import_service.options(&state.environments);
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
        Commands::CheckSchedule => check_schedule(&state),
    }
}

async fn run(state: std::sync::Arc<AppState>) -> anyhow::Result<()> {
    let problems = state.schedule_store.read().validate(&state.validation_rules());
    for problem in &problems {
        tracing::warn!("Schedule problem: {}", problem);
    }

    let shutdown = CancellationToken::new();
    let handle = scheduler::start_run_scheduler(state, shutdown.clone());
    scheduler::shutdown_signal(shutdown).await;

    handle.await.context("Run scheduler task failed")?;
    Ok(())
}

async fn import(
    state: &AppState,
    company: &str,
    date: Option<NaiveDate>,
    environment: Option<&str>,
    source: Option<&str>,
) -> anyhow::Result<()> {
    let environment = state.environments.resolve(environment);
    let mut job = ImportJob::latest(&environment, company, source);
    if let Some(date) = date {
        job = job.for_date(date);
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(scheduler::shutdown_signal(cancel.clone()));
    let result = state.import_service.import(&job, &cancel).await;
    watcher.abort();

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        bail!("Import failed for {} value date(s)", report.failed_count());
    }
    Ok(())
}

fn check_schedule(state: &AppState) -> anyhow::Result<()> {
    let schedule = state.schedule_store.read();
    let problems = schedule.validate(&state.validation_rules());

    if problems.is_empty() {
        println!(
            "{}: {} entr{} OK",
            state.schedule_store.path().display(),
            schedule.entries().len(),
            if schedule.entries().len() == 1 { "y" } else { "ies" }
        );
        return Ok(());
    }

    for problem in &problems {
        eprintln!("{}", problem);
    }
    bail!("Schedule has {} problem(s)", problems.len())
}
