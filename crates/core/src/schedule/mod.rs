//! Worker schedule.
//!
//! A schedule lists `(environment, company, source?, runAtLocalTime)`
//! entries. It is edited outside the worker and validated when saved; the
//! scheduler re-reads it on every poll and skips malformed entries.

mod model;
mod store;

pub use model::{
    parse_run_time, RunKey, ScheduleEntry, ScheduleFile, ScheduledRun, ValidationRules,
    WorkerSchedule,
};
pub(crate) use store::temp_path;
pub use store::{FileScheduleStore, InMemoryScheduleSource, ScheduleSource};
