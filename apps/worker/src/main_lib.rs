use std::sync::Arc;

use fxbridge_core::gateway::{CurrencyGateway, HttpCurrencyGateway};
use fxbridge_core::import::{EnvironmentPolicy, RateImportService};
use fxbridge_core::run_state::FileRunStateLedger;
use fxbridge_core::schedule::{FileScheduleStore, ValidationRules};
use fxbridge_core::scheduler::RunScheduler;
use fxbridge_rate_sources::{
    DirectoryArchive, EcbSource, MnbSource, NoopArchive, PayloadArchive, RateSource,
    SourceRegistry,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub registry: Arc<SourceRegistry>,
    pub import_service: Arc<RateImportService>,
    pub schedule_store: Arc<FileScheduleStore>,
    pub ledger: Arc<FileRunStateLedger>,
    pub environments: EnvironmentPolicy,
}

impl AppState {
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::new(self.environments.available.clone(), &self.registry)
    }

    /// A scheduler over the schedule file and ledger.
    pub fn run_scheduler(&self) -> RunScheduler {
        RunScheduler::new(
            self.schedule_store.clone(),
            self.ledger.clone(),
            self.import_service.clone(),
        )
        .with_policy(self.config.ledger_policy)
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("FXB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let archive: Arc<dyn PayloadArchive> = match &config.snapshot_dir {
        Some(dir) => {
            tracing::info!("Archiving raw rate payloads to {}", dir.display());
            Arc::new(DirectoryArchive::new(dir))
        }
        None => Arc::new(NoopArchive),
    };

    let sources: Vec<Arc<dyn RateSource>> = vec![
        Arc::new(MnbSource::new(
            &config.mnb_url,
            config.source_timeout,
            archive.clone(),
        )?),
        Arc::new(EcbSource::new(
            &config.ecb_base_url,
            config.source_timeout,
            archive,
        )?),
    ];
    let registry = Arc::new(SourceRegistry::register(sources)?);

    let gateway: Arc<dyn CurrencyGateway> = Arc::new(HttpCurrencyGateway::new(
        &config.gateway_base_url,
        config.gateway_timeout,
    )?);
    tracing::info!("Currency gateway at {}", config.gateway_base_url);

    let import_service = Arc::new(RateImportService::new(
        registry.clone(),
        gateway,
        config.import.clone(),
    ));

    let schedule_store = Arc::new(FileScheduleStore::new(&config.schedule_path));
    let ledger = Arc::new(
        FileRunStateLedger::new(config.ledger_path()).with_default_source(registry.default_code()),
    );
    tracing::info!(
        schedule = %schedule_store.path().display(),
        ledger = %ledger.path().display(),
        "Schedule and run-state paths in use"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        registry,
        import_service,
        schedule_store,
        ledger,
        environments: EnvironmentPolicy::new(
            config.environments.clone(),
            &config.default_environment,
        ),
    }))
}
