//! Deck → fixed-layout (PDF) conversion through an external program.
//!
//! The converter is a capability ([`DocumentConverter`]) so tests can stand
//! in for LibreOffice. Success is decided here, not by the converter: the
//! exit code must be 0 *and* `<out_dir>/<input stem>.pdf` must exist, since
//! LibreOffice exits 0 on several failures (locked profile, unknown filter).

use crate::error::CertgenError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Maximum stderr captured from the converter.
const MAX_STDERR_BYTES: usize = 64 * 1024;

/// What the converter process reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterOutcome {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ConverterOutcome {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            stderr: String::new(),
        }
    }
}

/// Converts a deck to PDF, writing `<out_dir>/<input stem>.pdf`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Run one conversion. `Err` means the converter could not be started.
    async fn convert(&self, input: &Path, out_dir: &Path) -> std::io::Result<ConverterOutcome>;
}

/// Headless LibreOffice (`--convert-to pdf`).
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    /// Executable name or path. Default: `libreoffice`.
    pub binary: PathBuf,
    /// Run with a throwaway user profile inside `out_dir` instead of the
    /// shared `~/.config/libreoffice`. Default: true.
    pub private_profile: bool,
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("libreoffice"),
            private_profile: true,
        }
    }
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    pub fn private_profile(mut self, v: bool) -> Self {
        self.private_profile = v;
        self
    }
}

/// `file://` URL for a local directory, as `-env:UserInstallation` expects.
fn file_url(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/").replace(' ', "%20");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> std::io::Result<ConverterOutcome> {
        // Dropped (and deleted) when this future completes or is cancelled.
        let profile = if self.private_profile {
            Some(
                tempfile::Builder::new()
                    .prefix("certgen-lo-profile-")
                    .tempdir_in(out_dir)?,
            )
        } else {
            None
        };

        let mut cmd = Command::new(&self.binary);
        if let Some(dir) = &profile {
            cmd.arg(format!("-env:UserInstallation={}", file_url(dir.path())));
        }
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {:?}", cmd.as_std());
        let output = cmd.output().await?;
        let keep = output.stderr.len().min(MAX_STDERR_BYTES);
        Ok(ConverterOutcome {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr[..keep]).into_owned(),
        })
    }
}

/// `<out_dir>/<input stem>.pdf`.
pub fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".pdf");
    out_dir.join(name)
}

/// Convert `input` to PDF in `out_dir`, bounded by `timeout`.
///
/// On timeout the converter future is dropped, which kills the child
/// process (`kill_on_drop`).
pub async fn convert_to_fixed_layout(
    converter: &dyn DocumentConverter,
    input: &Path,
    out_dir: &Path,
    timeout: Duration,
) -> Result<PathBuf, CertgenError> {
    let fail = |reason: String, timed_out: bool| CertgenError::Conversion {
        input: input.to_path_buf(),
        reason,
        timed_out,
    };
    let expected = expected_output(input, out_dir);
    let start = Instant::now();

    let outcome = match tokio::time::timeout(timeout, converter.convert(input, out_dir)).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => return Err(fail(format!("converter could not be started: {e}"), false)),
        Err(_elapsed) => {
            return Err(fail(format!("timed out after {timeout:?}"), true));
        }
    };

    if outcome.exit_code != Some(0) {
        let code = outcome
            .exit_code
            .map_or_else(|| "a signal".to_string(), |c| format!("exit code {c}"));
        return Err(fail(
            format!("converter ended with {code}: {}", outcome.stderr.trim()),
            false,
        ));
    }

    if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
        if !outcome.stderr.trim().is_empty() {
            warn!("Converter stderr: {}", outcome.stderr.trim());
        }
        return Err(fail(
            format!("converter reported success but {} was not created", expected.display()),
            false,
        ));
    }

    info!(
        "Converted {} → {} in {}ms",
        input.display(),
        expected.display(),
        start.elapsed().as_millis()
    );
    Ok(expected)
}
