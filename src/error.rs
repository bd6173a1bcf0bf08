//! Error types for the certgen library.
//!
//! Every pipeline stage error is **fatal**: the run aborts, no partial
//! artifact is published, and nothing is retried inside the pipeline. The
//! caller owns retry policy (usually: run the whole pipeline again).
//!
//! The one recoverable condition, a template without a QR marker shape, is
//! not an error at all. It is logged and reported through
//! [`crate::output::GenerationOutput::qr_embedded`].
//!
//! Each variant knows the [`Stage`] it came from and whether it looks like a
//! transient infrastructure failure ([`CertgenError::is_transient`]) or a
//! configuration mistake, so callers can decide whether a retry makes sense.

use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage, used to tag errors and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Fetch,
    Load,
    Substitute,
    EmbedQr,
    Save,
    Convert,
    Rasterize,
    Publish,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::Fetch => "fetch",
            Stage::Load => "load",
            Stage::Substitute => "substitute",
            Stage::EmbedQr => "embed-qr",
            Stage::Save => "save",
            Stage::Convert => "convert",
            Stage::Rasterize => "rasterize",
            Stage::Publish => "publish",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// All fatal errors returned by the certgen library.
#[derive(Debug, Error)]
pub enum CertgenError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Malformed arguments, request, or builder values.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A caller-supplied artifact id cannot be used in file names and keys.
    #[error("Invalid artifact id '{id}': use 1–128 characters from [A-Za-z0-9_-]")]
    InvalidArtifactId { id: String },

    /// More than one QR marker shape under [`crate::config::MarkerPolicy::Reject`].
    #[error("Template has {count} shapes named '{name}' on the first slide; expected exactly one")]
    AmbiguousMarker { name: String, count: usize },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The template could not be obtained from object storage.
    #[error("Failed to fetch template '{key}': {source}")]
    Fetch {
        key: String,
        #[source]
        source: StorageError,
    },

    // ── Template errors ───────────────────────────────────────────────────
    /// The template package could not be read or written.
    #[error("Template '{path}' is unusable ({stage}): {detail}")]
    Template {
        stage: Stage,
        path: PathBuf,
        detail: String,
    },

    /// The QR payload could not be encoded.
    #[error("QR encoding failed: {0}")]
    QrEncode(String),

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The external converter failed, timed out, or produced no output.
    #[error("Conversion of '{input}' failed: {reason}")]
    Conversion {
        input: PathBuf,
        reason: String,
        timed_out: bool,
    },

    /// The fixed-layout document could not be rasterised.
    #[error("Rasterisation of '{path}' failed: {detail}")]
    Rasterisation { path: PathBuf, detail: String },

    // ── Publish errors ────────────────────────────────────────────────────
    /// Upload of a generated artifact failed.
    #[error("Failed to publish '{key}': {source}")]
    Publish {
        key: String,
        #[source]
        source: StorageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing inside the scratch directory failed.
    #[error("Scratch I/O failed at '{path}': {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CertgenError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            CertgenError::Config(_) | CertgenError::InvalidArtifactId { .. } => Stage::Configure,
            CertgenError::AmbiguousMarker { .. } | CertgenError::QrEncode(_) => Stage::EmbedQr,
            CertgenError::Fetch { .. } => Stage::Fetch,
            CertgenError::Template { stage, .. } => *stage,
            CertgenError::Conversion { .. } => Stage::Convert,
            CertgenError::Rasterisation { .. } => Stage::Rasterize,
            CertgenError::Publish { .. } => Stage::Publish,
            CertgenError::Scratch { .. } | CertgenError::Internal(_) => Stage::Cleanup,
        }
    }

    /// `true` when re-running the same request may succeed.
    ///
    /// Storage transport failures and converter timeouts are transient.
    /// Missing objects, malformed templates and bad configuration are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CertgenError::Fetch { source, .. } | CertgenError::Publish { source, .. } => {
                source.is_transient()
            }
            CertgenError::Conversion { timed_out, .. } => *timed_out,
            _ => false,
        }
    }
}

/// Errors raised by the deck codec, wrapped into [`CertgenError::Template`]
/// by the pipeline.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml in '{part}': {detail}")]
    Xml { part: String, detail: String },

    #[error("missing package part '{0}'")]
    MissingPart(String),

    #[error("picture source '{path}': {source}")]
    Picture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The deck handed to `save` does not belong to the package.
    #[error("deck does not match package: {0}")]
    ModelMismatch(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl DeckError {
    pub(crate) fn xml(part: &str, detail: impl fmt::Display) -> Self {
        DeckError::Xml {
            part: part.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Attach the stage and template path this error occurred in.
    pub fn at(self, stage: Stage, path: impl Into<PathBuf>) -> CertgenError {
        CertgenError::Template {
            stage,
            path: path.into(),
            detail: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_marker_display() {
        let e = CertgenError::AmbiguousMarker {
            name: "qr".into(),
            count: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("2 shapes"), "got: {msg}");
        assert!(msg.contains("'qr'"), "got: {msg}");
        assert_eq!(e.stage(), Stage::EmbedQr);
    }

    #[test]
    fn conversion_timeout_is_transient() {
        let e = CertgenError::Conversion {
            input: PathBuf::from("/tmp/x.pptx"),
            reason: "timed out after 5s".into(),
            timed_out: true,
        };
        assert!(e.is_transient());
        assert_eq!(e.stage(), Stage::Convert);
    }

    #[test]
    fn missing_output_is_not_transient() {
        let e = CertgenError::Conversion {
            input: PathBuf::from("/tmp/x.pptx"),
            reason: "no output".into(),
            timed_out: false,
        };
        assert!(!e.is_transient());
    }

    #[test]
    fn fetch_error_keeps_storage_cause() {
        let e = CertgenError::Fetch {
            key: "cert_template.pptx".into(),
            source: StorageError::Transport("connection reset".into()),
        };
        assert!(e.is_transient());
        assert!(e.to_string().contains("connection reset"));
        assert_eq!(e.stage(), Stage::Fetch);
    }

    #[test]
    fn stage_display_is_kebab() {
        assert_eq!(Stage::EmbedQr.to_string(), "embed-qr");
        assert_eq!(Stage::Rasterize.to_string(), "rasterize");
    }
}
