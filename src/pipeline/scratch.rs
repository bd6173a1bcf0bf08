//! Scratch files of one run and their guaranteed removal.
//!
//! Every temporary file is registered *before* the stage that creates it
//! runs, so a failure halfway through writing still leaves a registry entry
//! to clean up. [`Scratch::release`] removes the entries newest first and
//! runs at most once; `Drop` covers early returns and panics.

use crate::error::CertgenError;
use crate::request::ArtifactId;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What a scratch file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Template the run loads from (`<id>.template.pptx`), or the shared copy
    /// kept for later runs.
    TemplateCopy,
    /// Rendered QR code (`<id>.png`).
    QrImage,
    /// Populated deck (`<id>.pptx`).
    IntermediateDeck,
    /// Converter output (`<id>.pdf`).
    FixedLayout,
    /// Download in progress (`<id>.part`).
    Partial,
}

impl ArtifactKind {
    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::QrImage => "png",
            ArtifactKind::IntermediateDeck => "pptx",
            ArtifactKind::FixedLayout => "pdf",
            ArtifactKind::TemplateCopy => "template.pptx",
            ArtifactKind::Partial => "part",
        }
    }
}

#[derive(Debug)]
struct Entry {
    kind: ArtifactKind,
    path: PathBuf,
    retain: bool,
}

/// Outcome of [`Scratch::release`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Files deleted.
    pub removed: Vec<PathBuf>,
    /// Registered files that were never created (or already gone).
    pub missing: usize,
    /// Files deliberately kept (`retain_template`).
    pub retained: Vec<PathBuf>,
    /// Files that could not be deleted, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry of the scratch files of one run.
#[derive(Debug)]
pub struct Scratch {
    dir: PathBuf,
    artifact_id: ArtifactId,
    entries: Vec<Entry>,
    released: bool,
}

impl Scratch {
    /// Open the scratch area at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>, artifact_id: ArtifactId) -> Result<Self, CertgenError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CertgenError::Scratch {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            artifact_id,
            entries: Vec::new(),
            released: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_id(&self) -> &ArtifactId {
        &self.artifact_id
    }

    /// `<dir>/<artifact id>.<ext>` for per-run files.
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.artifact_id, kind.extension()))
    }

    /// Register the per-run file of `kind` and return its path.
    pub fn register(&mut self, kind: ArtifactKind) -> PathBuf {
        let path = self.path_for(kind);
        self.register_path(kind, path.clone());
        path
    }

    /// Register an arbitrary path (converter output, shared template copy).
    pub fn register_path(&mut self, kind: ArtifactKind, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!("Scratch: registered {:?} {}", kind, path.display());
        self.entries.push(Entry {
            kind,
            path,
            retain: false,
        });
    }

    /// Keep the newest entry for `path` on release.
    pub fn retain(&mut self, path: &Path) {
        if let Some(entry) = self.entries.iter_mut().rev().find(|e| e.path == path) {
            entry.retain = true;
        }
    }

    /// Remove every registered file, newest first. Runs at most once;
    /// later calls return an empty report.
    pub fn release(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.released {
            return report;
        }
        self.released = true;

        for entry in self.entries.drain(..).rev() {
            if entry.retain {
                report.retained.push(entry.path);
                continue;
            }
            match std::fs::remove_file(&entry.path) {
                Ok(()) => {
                    debug!("Scratch: removed {:?} {}", entry.kind, entry.path.display());
                    report.removed.push(entry.path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => report.missing += 1,
                Err(e) => {
                    warn!("Failed to remove scratch file {}: {}", entry.path.display(), e);
                    report.failed.push((entry.path, e.to_string()));
                }
            }
        }
        report
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        if !self.released {
            let report = self.release();
            if !report.removed.is_empty() {
                debug!(
                    "Scratch released on drop: {} files removed",
                    report.removed.len()
                );
            }
        }
    }
}
