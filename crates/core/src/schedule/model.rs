use std::collections::HashSet;
use std::fmt;

use chrono::NaiveTime;
use fxbridge_rate_sources::{normalize_code, SourceRegistry};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One configured daily import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub company: String,

    /// Rate source; the registry default when absent
    #[serde(default, alias = "bankModule", skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,

    /// Local time of day, `HH:mm` or `HH:mm:ss`
    #[serde(default)]
    pub run_at_local_time: String,
}

impl ScheduleEntry {
    pub fn new(environment: &str, company: &str, source_code: Option<&str>, run_at: &str) -> Self {
        Self {
            environment: environment.to_string(),
            company: company.to_string(),
            source_code: source_code.map(str::to_string),
            run_at_local_time: run_at.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSchedule {
    #[serde(default)]
    pub environments: Vec<ScheduleEntry>,
}

/// The schedule document: `{"workerSchedule": {"environments": [...]}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFile {
    #[serde(default)]
    pub worker_schedule: WorkerSchedule,
}

impl ScheduleFile {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            worker_schedule: WorkerSchedule {
                environments: entries,
            },
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.worker_schedule.environments
    }

    /// Check every entry and return one message per problem.
    pub fn validate(&self, rules: &ValidationRules) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for entry in self.entries() {
            let environment = entry.environment.trim();
            if environment.is_empty() {
                errors.push("Environment is required.".to_string());
                continue;
            }

            if !rules.environment_allowed(environment) {
                errors.push(format!("Environment '{}' is not supported.", environment));
            }

            if entry.company.trim().is_empty() {
                errors.push(format!(
                    "Company is required for environment '{}'.",
                    environment
                ));
            }

            if parse_run_time(&entry.run_at_local_time).is_none() {
                errors.push(format!(
                    "RunAtLocalTime '{}' is invalid for environment '{}'.",
                    entry.run_at_local_time, environment
                ));
            }

            let source = rules.effective_source(entry.source_code.as_deref());
            if !rules.source_known(&source) {
                errors.push(format!(
                    "Source '{}' is not supported for environment '{}'.",
                    source, environment
                ));
            }

            let key = RunKey::new(environment, &entry.company, &source);
            if !entry.company.trim().is_empty() && !seen.insert(key.clone()) {
                errors.push(format!("Schedule entry '{}' is duplicated.", key));
            }
        }

        errors
    }

    /// Entries the scheduler can run.
    ///
    /// Malformed entries and repeated keys are logged and skipped; the
    /// first entry for a key wins.
    pub fn scheduled_runs(&self, default_source: &str) -> Vec<ScheduledRun> {
        let mut runs: Vec<ScheduledRun> = Vec::new();

        for entry in self.entries() {
            let environment = entry.environment.trim();
            let company = entry.company.trim();
            if environment.is_empty() || company.is_empty() {
                warn!(
                    environment = %entry.environment,
                    company = %entry.company,
                    "Skipping schedule entry without environment or company"
                );
                continue;
            }

            let Some(run_at) = parse_run_time(&entry.run_at_local_time) else {
                warn!(
                    environment = %environment,
                    company = %company,
                    run_at = %entry.run_at_local_time,
                    "Skipping schedule entry with invalid run time"
                );
                continue;
            };

            let source_code = normalize_code(entry.source_code.as_deref())
                .unwrap_or_else(|| default_source.to_uppercase());
            let key = RunKey::new(environment, company, &source_code);

            if runs.iter().any(|run| run.key == key) {
                warn!(key = %key, "Skipping duplicated schedule entry");
                continue;
            }

            runs.push(ScheduledRun {
                key,
                environment: environment.to_string(),
                company: company.to_string(),
                source_code,
                run_at,
            });
        }

        runs
    }
}

/// Parse `HH:mm` or `HH:mm:ss`.
pub fn parse_run_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Identity of a schedule entry: `ENVIRONMENT|COMPANY|SOURCE`, upper-cased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunKey(String);

impl RunKey {
    pub fn new(environment: &str, company: &str, source_code: &str) -> Self {
        Self(format!(
            "{}|{}|{}",
            environment.trim().to_uppercase(),
            company.trim().to_uppercase(),
            source_code.trim().to_uppercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into (environment, company, source).
    pub fn parts(&self) -> (&str, &str, &str) {
        let mut parts = self.0.splitn(3, '|');
        let environment = parts.next().unwrap_or_default();
        let company = parts.next().unwrap_or_default();
        let source = parts.next().unwrap_or_default();
        (environment, company, source)
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated schedule entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledRun {
    pub key: RunKey,
    pub environment: String,
    pub company: String,
    /// Normalized source code, defaulted when the entry named none
    pub source_code: String,
    pub run_at: NaiveTime,
}

/// What a schedule is checked against before it is saved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationRules {
    /// Allowed environments; empty allows any
    pub allowed_environments: Vec<String>,
    /// Registered source codes; empty allows any
    pub known_sources: Vec<String>,
    pub default_source: String,
}

impl ValidationRules {
    pub fn new(allowed_environments: Vec<String>, registry: &SourceRegistry) -> Self {
        Self {
            allowed_environments,
            known_sources: registry.list_modules().into_iter().map(|m| m.code).collect(),
            default_source: registry.default_code().to_string(),
        }
    }

    fn environment_allowed(&self, environment: &str) -> bool {
        self.allowed_environments.is_empty()
            || self
                .allowed_environments
                .iter()
                .any(|allowed| allowed.trim().eq_ignore_ascii_case(environment))
    }

    fn effective_source(&self, source_code: Option<&str>) -> String {
        normalize_code(source_code).unwrap_or_else(|| self.default_source.to_uppercase())
    }

    fn source_known(&self, source_code: &str) -> bool {
        self.known_sources.is_empty()
            || self
                .known_sources
                .iter()
                .any(|known| known.eq_ignore_ascii_case(source_code))
    }
}
