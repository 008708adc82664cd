//! Worker configuration read from `FXB_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use fxbridge_core::run_state::FileRunStateLedger;
use fxbridge_core::scheduler::LedgerPolicy;
use fxbridge_core::transform::ImportSettings;
use fxbridge_rate_sources::{DEFAULT_ECB_BASE_URL, DEFAULT_MNB_URL};

const DEFAULT_GATEWAY_BASE_URL: &str = "http://localhost:5000/";
const DEFAULT_SCHEDULE_PATH: &str = "worker-schedule.json";
const DEFAULT_SNAPSHOT_DIR: &str = "logs";
const DEFAULT_ENVIRONMENTS: &str = "PROD,TEST,SZKOL";

#[derive(Clone, Debug)]
pub struct Config {
    pub gateway_base_url: String,
    pub gateway_timeout: Duration,
    pub source_timeout: Duration,
    pub mnb_url: String,
    pub ecb_base_url: String,
    pub schedule_path: PathBuf,
    /// Explicit ledger location; beside the schedule when unset
    pub ledger_path: Option<PathBuf>,
    /// Raw payload archive; disabled when `None`
    pub snapshot_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    pub import: ImportSettings,
    /// Allowed environments; empty allows any
    pub environments: Vec<String>,
    pub default_environment: String,
    pub ledger_policy: LedgerPolicy,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = ImportSettings::default();

        let snapshot_dir = lookup("FXB_SNAPSHOT_DIR").unwrap_or_else(|| DEFAULT_SNAPSHOT_DIR.into());
        let environments = lookup("FXB_ENVIRONMENTS").unwrap_or_else(|| DEFAULT_ENVIRONMENTS.into());

        Ok(Self {
            gateway_base_url: string_or(&lookup, "FXB_GATEWAY_BASE_URL", DEFAULT_GATEWAY_BASE_URL),
            gateway_timeout: Duration::from_secs(parse_or(&lookup, "FXB_GATEWAY_TIMEOUT_SECS", 60)?),
            source_timeout: Duration::from_secs(parse_or(&lookup, "FXB_SOURCE_TIMEOUT_SECS", 30)?),
            mnb_url: string_or(&lookup, "FXB_MNB_URL", DEFAULT_MNB_URL),
            ecb_base_url: string_or(&lookup, "FXB_ECB_BASE_URL", DEFAULT_ECB_BASE_URL),
            schedule_path: PathBuf::from(string_or(
                &lookup,
                "FXB_SCHEDULE_PATH",
                DEFAULT_SCHEDULE_PATH,
            )),
            ledger_path: non_blank(lookup("FXB_LEDGER_PATH")).map(PathBuf::from),
            snapshot_dir: non_blank(Some(snapshot_dir)).map(PathBuf::from),
            poll_interval: Duration::from_secs(
                parse_or(&lookup, "FXB_POLL_INTERVAL_SECS", 30u64)?.max(1),
            ),
            import: ImportSettings {
                currency_type: string_or(&lookup, "FXB_CURRENCY_TYPE", &defaults.currency_type),
                fallback_reference_currency: string_or(
                    &lookup,
                    "FXB_REF_CURRENCY",
                    &defaults.fallback_reference_currency,
                ),
                default_rate_round: parse_or(
                    &lookup,
                    "FXB_DEFAULT_RATE_ROUND",
                    defaults.default_rate_round,
                )?,
            },
            environments: split_list(&environments),
            default_environment: string_or(&lookup, "FXB_DEFAULT_ENVIRONMENT", "TEST"),
            ledger_policy: match non_blank(lookup("FXB_LEDGER_POLICY")) {
                Some(raw) => raw.parse()?,
                None => LedgerPolicy::default(),
            },
        })
    }

    /// Where the run-state ledger lives.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path.clone().unwrap_or_else(|| {
            FileRunStateLedger::beside_schedule(&self.schedule_path)
                .path()
                .to_path_buf()
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    non_blank(lookup(key)).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T> {
    match non_blank(lookup(key)) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow!("Invalid value '{}' for {}", raw, key)),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
