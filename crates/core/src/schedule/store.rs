//! Schedule sources.
//!
//! The scheduler reads a fresh snapshot every poll, so edits to the schedule
//! file take effect on the next tick without a restart.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{info, warn};

use super::model::{ScheduleFile, ValidationRules};
use crate::errors::{Error, Result};

/// Provider of the current schedule.
pub trait ScheduleSource: Send + Sync {
    /// The schedule as it is right now.
    ///
    /// An absent schedule is an empty one. A schedule that exists but cannot
    /// be read or parsed is an error, never an empty schedule.
    fn snapshot(&self) -> Result<ScheduleFile>;
}

/// Schedule stored as a JSON file.
pub struct FileScheduleStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the schedule. A missing file is an empty schedule; an unreadable
    /// or truncated file is an error.
    pub fn load(&self) -> Result<ScheduleFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ScheduleFile::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Read the schedule for display. Anything [`load`](Self::load) rejects
    /// reads as empty.
    pub fn read(&self) -> ScheduleFile {
        self.load().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), "Ignoring unreadable schedule file: {}", e);
            ScheduleFile::default()
        })
    }

    /// Validate and atomically replace the schedule file.
    ///
    /// Returns [`Error::Schedule`] with every validation problem, leaving the
    /// file untouched.
    pub fn save(&self, schedule: &ScheduleFile, rules: &ValidationRules) -> Result<()> {
        let errors = schedule.validate(rules);
        if !errors.is_empty() {
            return Err(Error::Schedule(errors));
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Configuration("schedule store lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(schedule)?;
        let temp_path = temp_path(&self.path);
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        info!(
            path = %self.path.display(),
            entries = schedule.entries().len(),
            "Schedule saved"
        );
        Ok(())
    }
}

impl ScheduleSource for FileScheduleStore {
    fn snapshot(&self) -> Result<ScheduleFile> {
        self.load()
    }
}

/// Schedule held in memory and replaced as a whole.
#[derive(Default)]
pub struct InMemoryScheduleSource {
    schedule: RwLock<ScheduleFile>,
}

impl InMemoryScheduleSource {
    pub fn new(schedule: ScheduleFile) -> Self {
        Self {
            schedule: RwLock::new(schedule),
        }
    }

    pub fn replace(&self, schedule: ScheduleFile) {
        match self.schedule.write() {
            Ok(mut guard) => *guard = schedule,
            Err(poisoned) => *poisoned.into_inner() = schedule,
        }
    }
}

impl ScheduleSource for InMemoryScheduleSource {
    fn snapshot(&self) -> Result<ScheduleFile> {
        match self.schedule.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }
}

/// `<path>.tmp` beside the target, so the rename stays on one filesystem.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
