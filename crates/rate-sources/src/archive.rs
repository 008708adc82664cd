//! Raw payload archive.
//!
//! Adapters hand every upstream payload to a [`PayloadArchive`] before parsing
//! it, so a bad import can be diagnosed from the exact bytes the bank sent.
//! Archiving is best effort: failures are logged and never fail a fetch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use log::{debug, warn};

/// Sink for raw upstream payloads.
pub trait PayloadArchive: Send + Sync {
    /// Store `payload` fetched from `source_code`, using `extension` (`xml`, `csv`).
    fn store(&self, source_code: &str, extension: &str, payload: &str);
}

/// Archive that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopArchive;

impl PayloadArchive for NoopArchive {
    fn store(&self, _source_code: &str, _extension: &str, _payload: &str) {}
}

/// Archive writing one file per payload into a directory.
///
/// Files are named `<code>-response-<yyyyMMdd-HHmmss>.<ext>`.
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    dir: PathBuf,
}

impl DirectoryArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(source_code: &str, extension: &str) -> String {
        format!(
            "{}-response-{}.{}",
            source_code.to_lowercase(),
            Local::now().format("%Y%m%d-%H%M%S"),
            extension
        )
    }
}

impl PayloadArchive for DirectoryArchive {
    fn store(&self, source_code: &str, extension: &str, payload: &str) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            warn!(
                "Failed to create payload archive directory {}: {}",
                self.dir.display(),
                e
            );
            return;
        }

        let path = self.dir.join(Self::file_name(source_code, extension));
        match fs::write(&path, payload) {
            Ok(()) => debug!("Archived {} payload to {}", source_code, path.display()),
            Err(e) => warn!("Failed to archive {} payload: {}", source_code, e),
        }
    }
}

/// Run [`PayloadArchive::store`] on the blocking pool so archive file I/O
/// does not stall the async runtime.
pub(crate) async fn archive_payload(
    archive: &Arc<dyn PayloadArchive>,
    source_code: &'static str,
    extension: &'static str,
    payload: String,
) {
    let archive = Arc::clone(archive);
    let task =
        tokio::task::spawn_blocking(move || archive.store(source_code, extension, &payload));
    if let Err(e) = task.await {
        warn!("Archiving {} payload did not complete: {}", source_code, e);
    }
}
