//! Run-state ledger.
//!
//! Remembers the last date each schedule entry ran so a restart does not
//! repeat today's imports. Stored as human-diffable JSON:
//!
//! ```json
//! { "entries": [ { "environment": "TEST", "company": "KFT",
//!                  "sourceCode": "MNB", "lastRunDate": "2024-03-01" } ] }
//! ```
//!
//! The scheduler is the only writer.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use fxbridge_rate_sources::DEFAULT_SOURCE_CODE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::schedule::{temp_path, RunKey};

/// Key to last run date.
pub type RunState = BTreeMap<RunKey, NaiveDate>;

/// Durable store of [`RunState`].
pub trait RunStateLedger: Send + Sync {
    /// Current state; missing or corrupt storage reads as empty.
    fn read(&self) -> RunState;

    /// Replace the stored state atomically.
    fn write(&self, state: &RunState) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunStateFile {
    #[serde(default)]
    entries: Vec<RunStateEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RunStateEntry {
    environment: String,
    company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_code: Option<String>,
    last_run_date: String,
}

/// Ledger backed by a JSON file, replaced via write-temp-then-rename.
pub struct FileRunStateLedger {
    path: PathBuf,
    /// Source assumed for entries written without one
    default_source: String,
}

impl FileRunStateLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_source: DEFAULT_SOURCE_CODE.to_string(),
        }
    }

    /// Read entries without a source as belonging to `code`. Should match the
    /// default the schedule resolves against, or those entries re-run.
    pub fn with_default_source(mut self, code: impl Into<String>) -> Self {
        self.default_source = code.into();
        self
    }

    /// Ledger named `worker-run-state.json` beside the schedule file.
    pub fn beside_schedule(schedule_path: &Path) -> Self {
        let dir = schedule_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(dir.join("worker-run-state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, content: &str) -> RunState {
        let file: RunStateFile = match serde_json::from_str(content) {
            Ok(file) => file,
            Err(e) => {
                warn!("Ignoring unreadable run-state ledger: {}", e);
                return RunState::new();
            }
        };

        let mut state = RunState::new();
        for entry in file.entries {
            if entry.environment.trim().is_empty() || entry.company.trim().is_empty() {
                continue;
            }
            let Ok(date) = NaiveDate::parse_from_str(entry.last_run_date.trim(), "%Y-%m-%d")
            else {
                continue;
            };
            let source = entry
                .source_code
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(self.default_source.as_str());
            state.insert(RunKey::new(&entry.environment, &entry.company, source), date);
        }
        state
    }
}

impl RunStateLedger for FileRunStateLedger {
    fn read(&self) -> RunState {
        match fs::read_to_string(&self.path) {
            Ok(content) if !content.trim().is_empty() => self.parse(&content),
            _ => RunState::new(),
        }
    }

    fn write(&self, state: &RunState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let entries = state
            .iter()
            .map(|(key, date)| {
                let (environment, company, source) = key.parts();
                RunStateEntry {
                    environment: environment.to_string(),
                    company: company.to_string(),
                    source_code: Some(source.to_string()),
                    last_run_date: date.format("%Y-%m-%d").to_string(),
                }
            })
            .collect();

        let content = serde_json::to_string_pretty(&RunStateFile { entries })?;
        let temp_path = temp_path(&self.path);
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), entries = state.len(), "Run-state ledger written");
        Ok(())
    }
}

/// Ledger kept in memory only.
#[derive(Default)]
pub struct InMemoryRunStateLedger {
    state: Mutex<RunState>,
}

impl InMemoryRunStateLedger {
    pub fn new(state: RunState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl RunStateLedger for InMemoryRunStateLedger {
    fn read(&self) -> RunState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn write(&self, state: &RunState) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| Error::Ledger("in-memory ledger lock poisoned".to_string()))?;
        *guard = state.clone();
        Ok(())
    }
}
