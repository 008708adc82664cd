//! Run scheduler.
//!
//! Every poll re-reads the schedule and walks each entry through
//! Idle -> Due -> Running -> Completed:
//! - an entry is due once local time reaches its run time and it has not
//!   been attempted or completed today
//! - a due entry runs once; a failure is final for the day
//! - entries that left the schedule are pruned from memory and the ledger
//!
//! Entries run one after another and never affect each other.

mod clock;

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub use clock::{Clock, FixedClock, SystemClock};

use crate::errors::Error;
use crate::import::{ImportJob, RateImportService};
use crate::run_state::{RunState, RunStateLedger};
use crate::schedule::{RunKey, ScheduleSource, ScheduledRun};

/// Which outcomes are written to the durable ledger.
///
/// Both policies allow one attempt per key per day within a process. The
/// ledger decides what survives a restart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LedgerPolicy {
    /// Persist runs that submitted at least one value date.
    #[default]
    Success,
    /// Persist every attempt.
    Attempt,
}

impl FromStr for LedgerPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "attempt" => Ok(Self::Attempt),
            other => Err(Error::Configuration(format!(
                "unknown ledger policy '{}', expected 'success' or 'attempt'",
                other
            ))),
        }
    }
}

/// Counts for one poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Entries that were due and started
    pub started: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Keys removed because they left the schedule
    pub pruned: usize,
    /// The schedule could not be read; nothing was pruned or started
    pub schedule_unreadable: bool,
}

#[derive(Default)]
struct SchedulerState {
    /// Date of the last attempt per key, this process only
    attempts: HashMap<RunKey, NaiveDate>,
    /// Mirror of the durable ledger
    completed: RunState,
}

pub struct RunScheduler {
    schedule: Arc<dyn ScheduleSource>,
    ledger: Arc<dyn RunStateLedger>,
    importer: Arc<RateImportService>,
    clock: Arc<dyn Clock>,
    policy: LedgerPolicy,
    state: Mutex<SchedulerState>,
}

impl RunScheduler {
    /// Create a scheduler, loading the ledger once.
    pub fn new(
        schedule: Arc<dyn ScheduleSource>,
        ledger: Arc<dyn RunStateLedger>,
        importer: Arc<RateImportService>,
    ) -> Self {
        let completed = ledger.read();
        info!(entries = completed.len(), "Loaded run-state ledger");

        Self {
            schedule,
            ledger,
            importer,
            clock: Arc::new(SystemClock),
            policy: LedgerPolicy::default(),
            state: Mutex::new(SchedulerState {
                attempts: HashMap::new(),
                completed,
            }),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: LedgerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Poll until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken, poll_interval: Duration) {
        info!(
            interval_secs = poll_interval.as_secs(),
            policy = ?self.policy,
            "Run scheduler started"
        );

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let summary = self.poll(&cancel).await;
                    debug!(
                        started = summary.started,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        pruned = summary.pruned,
                        "Poll finished"
                    );
                }
            }
        }

        info!("Run scheduler stopped");
    }

    /// Evaluate every schedule entry once and run those that are due.
    pub async fn poll(&self, cancel: &CancellationToken) -> PollSummary {
        let mut state = self.state.lock().await;
        let mut summary = PollSummary::default();

        let now = self.clock.now();
        let today = now.date();
        let runs = match self.schedule.snapshot() {
            Ok(schedule) => schedule.scheduled_runs(self.importer.registry().default_code()),
            Err(e) => {
                warn!("Schedule unreadable, skipping this poll: {}", e);
                summary.schedule_unreadable = true;
                return summary;
            }
        };

        summary.pruned = self.prune(&mut state, &runs);

        for run in &runs {
            if cancel.is_cancelled() {
                break;
            }
            if now.time() < run.run_at || Self::done_today(&state, &run.key, today) {
                continue;
            }

            summary.started += 1;
            state.attempts.insert(run.key.clone(), today);

            match self.execute(run, cancel).await {
                RunOutcome::Cancelled => {
                    // Not an attempt: the run may start again after restart
                    state.attempts.remove(&run.key);
                    summary.started -= 1;
                    break;
                }
                RunOutcome::Succeeded => {
                    summary.succeeded += 1;
                    state.completed.insert(run.key.clone(), today);
                    self.persist(&state.completed);
                }
                RunOutcome::Failed => {
                    summary.failed += 1;
                    if self.policy == LedgerPolicy::Attempt {
                        state.completed.insert(run.key.clone(), today);
                        self.persist(&state.completed);
                    }
                }
            }
        }

        summary
    }

    fn done_today(state: &SchedulerState, key: &RunKey, today: NaiveDate) -> bool {
        let on_or_after_today = |date: Option<&NaiveDate>| date.is_some_and(|d| *d >= today);
        on_or_after_today(state.attempts.get(key)) || on_or_after_today(state.completed.get(key))
    }

    fn prune(&self, state: &mut SchedulerState, runs: &[ScheduledRun]) -> usize {
        let live: HashSet<&RunKey> = runs.iter().map(|run| &run.key).collect();

        state.attempts.retain(|key, _| live.contains(key));

        let stale: Vec<RunKey> = state
            .completed
            .keys()
            .filter(|key| !live.contains(key))
            .cloned()
            .collect();
        if stale.is_empty() {
            return 0;
        }

        for key in &stale {
            state.completed.remove(key);
        }
        info!(
            pruned = stale.len(),
            keys = %stale.iter().map(RunKey::as_str).collect::<Vec<_>>().join(", "),
            "Pruned run-state entries no longer scheduled"
        );
        self.persist(&state.completed);
        stale.len()
    }

    fn persist(&self, completed: &RunState) {
        if let Err(e) = self.ledger.write(completed) {
            error!("Failed to write run-state ledger: {}", e);
        }
    }

    async fn execute(&self, run: &ScheduledRun, cancel: &CancellationToken) -> RunOutcome {
        info!(
            environment = %run.environment,
            company = %run.company,
            source = %run.source_code,
            run_at = %run.run_at,
            "Scheduled import due"
        );

        let job = ImportJob::latest(&run.environment, &run.company, Some(&run.source_code));
        match self.importer.import(&job, cancel).await {
            Ok(report) if report.is_success() => {
                info!(
                    environment = %run.environment,
                    company = %run.company,
                    source = %run.source_code,
                    submitted = report.submitted_count(),
                    failed = report.failed_count(),
                    "Scheduled import completed"
                );
                RunOutcome::Succeeded
            }
            Ok(report) => {
                error!(
                    environment = %run.environment,
                    company = %run.company,
                    source = %run.source_code,
                    failed = report.failed_count(),
                    "Scheduled import failed for every value date"
                );
                RunOutcome::Failed
            }
            Err(e) if e.is_cancelled() => {
                info!(
                    environment = %run.environment,
                    company = %run.company,
                    source = %run.source_code,
                    "Scheduled import abandoned on shutdown"
                );
                RunOutcome::Cancelled
            }
            Err(Error::NoMatchingRates(message)) => {
                warn!(
                    environment = %run.environment,
                    company = %run.company,
                    source = %run.source_code,
                    "No matching rates: {}",
                    message
                );
                RunOutcome::Failed
            }
            Err(e) => {
                error!(
                    environment = %run.environment,
                    company = %run.company,
                    source = %run.source_code,
                    "Scheduled import failed: {}",
                    e
                );
                RunOutcome::Failed
            }
        }
    }
}

enum RunOutcome {
    Succeeded,
    Failed,
    Cancelled,
}
