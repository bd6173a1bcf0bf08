//! CLI binary for certgen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig` / `GenerationRequest` and prints the result.

use anyhow::{bail, Context, Result};
use certgen::{
    generate, ArtifactId, Color, ErrorCorrection, FieldValues, GenerationConfig,
    GenerationProgressCallback, GenerationRequest, LibreOfficeConverter, MarkerPolicy,
    PdfiumRasterizer, ProgressCallback, QrStyle, Stage, StorageConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner naming the running stage and one log line
/// per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, artifact_id: &str, template_key: &str) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold(&format!("Generating from {template_key}")),
            dim(artifact_id)
        ));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            dim("–"),
            stage.to_string(),
            dim(reason)
        ));
    }

    fn on_generation_error(&self, stage: Stage, error: &str) {
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<10} {}",
            red("✗"),
            stage.to_string(),
            red(&msg)
        ));
        self.bar.finish_and_clear();
    }

    fn on_generation_complete(&self, image_key: &str, total_duration_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} published {}  {}",
            green("✔"),
            bold(image_key),
            dim(&format!("{:.1}s", total_duration_ms as f64 / 1000.0))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # MinIO on localhost, two fields
  certgen cert_template.pptx '{"endpoint":"localhost:9000","access_key":"minio","secret_key":"minio123"}' \
      --field '{{fullName}}=Alice Smith' --field '{{qr_link}}=https://example.com/qr-code'

  # Storage document and fields from files
  certgen cert_template.pptx @storage.json --fields-file fields.json

  # Local directory as the object store, keep the PDF too
  certgen cert_template.pptx '{"backend":"local","root":"/srv/objects"}' \
      --fields-json '{"{{fullName}}":"Alice Smith"}' --publish-pdf --json

STORAGE JSON:
  endpoint      host[:port] or URL of an S3-compatible endpoint
  access_key    access key id (requires secret_key)
  secret_key    secret access key
  secure        use https for a scheme-less endpoint (default false)
  region        signing region (default us-east-1)
  bucket        bucket for template and outputs (default public)
  backend       "s3" (default) or "local"
  root          directory tree for the local backend

OUTPUT KEYS:
  <prefix>/jpg/<id>.jpg     always
  <prefix>/pdf/<id>.pdf     with --publish-pdf

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override log filter (e.g. certgen=debug)
  PDFIUM_LIB_PATH          Path to libpdfium
  CERTGEN_CONVERTER_BIN    LibreOffice executable
  AWS_*                    Ambient AWS configuration when no endpoint/keys are given
"#;

/// Generate a certificate image from a PPTX template in object storage.
#[derive(clap::Parser, Debug)]
#[command(
    name = "certgen",
    version,
    about = "Generate a certificate image from a PPTX template in object storage",
    long_about = "Fetch a PPTX template from S3-compatible storage, substitute {{placeholders}}, \
replace the shape named 'qr' with a QR code, convert to PDF with LibreOffice, rasterize the \
first page and publish it as certificates/jpg/<id>.jpg.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Storage key of the template deck.
    template_key: String,

    /// Storage connection JSON, or @path to a file containing it.
    #[arg(env = "CERTGEN_STORAGE_JSON")]
    storage_json: String,

    /// Placeholder value as TOKEN=VALUE (repeatable).
    #[arg(short, long = "field", value_name = "TOKEN=VALUE", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// Placeholder values as a JSON object.
    #[arg(long, env = "CERTGEN_FIELDS_JSON")]
    fields_json: Option<String>,

    /// File containing a JSON object of placeholder values.
    #[arg(long, env = "CERTGEN_FIELDS_FILE")]
    fields_file: Option<PathBuf>,

    /// Fixed artifact id ([A-Za-z0-9_-], up to 128 chars). Default: random UUID.
    #[arg(long, env = "CERTGEN_ARTIFACT_ID")]
    artifact_id: Option<String>,

    /// Override the bucket from the storage JSON.
    #[arg(long, env = "CERTGEN_BUCKET")]
    bucket: Option<String>,

    /// Directory for the template copy and scratch files. Default: system temp dir.
    #[arg(long, env = "CERTGEN_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Prefix of the published keys.
    #[arg(long, env = "CERTGEN_KEY_PREFIX", default_value = "certificates")]
    key_prefix: String,

    /// LibreOffice executable used for PDF conversion.
    #[arg(long, env = "CERTGEN_CONVERTER_BIN", default_value = "libreoffice")]
    converter_bin: PathBuf,

    /// Use the shared LibreOffice user profile instead of a private one per run.
    #[arg(long, env = "CERTGEN_SHARED_PROFILE")]
    shared_profile: bool,

    /// Conversion timeout in seconds.
    #[arg(long, env = "CERTGEN_CONVERT_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    convert_timeout: u64,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "CERTGEN_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "CERTGEN_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Also publish the PDF under <prefix>/pdf/<id>.pdf.
    #[arg(long, env = "CERTGEN_PUBLISH_PDF")]
    publish_pdf: bool,

    /// Keep the local template copy for later runs.
    #[arg(long, env = "CERTGEN_RETAIN_TEMPLATE")]
    retain_template: bool,

    /// Name of the shape replaced by the QR code.
    #[arg(long, env = "CERTGEN_MARKER_NAME", default_value = "qr")]
    marker_name: String,

    /// What to do when several shapes carry the marker name.
    #[arg(long, env = "CERTGEN_MARKER_POLICY", value_enum, default_value = "first-match")]
    marker_policy: MarkerPolicyArg,

    /// Field whose value is encoded in the QR code.
    #[arg(long, env = "CERTGEN_QR_FIELD", default_value = "{{qr_link}}")]
    qr_field: String,

    /// QR pixels per module.
    #[arg(long, default_value_t = 4)]
    qr_box_size: u32,

    /// QR quiet zone in modules.
    #[arg(long, default_value_t = 1)]
    qr_border: u32,

    /// QR error-correction level.
    #[arg(long, value_enum, default_value = "medium")]
    qr_error_correction: ErrorCorrectionArg,

    /// QR module colour (#rrggbb, black, white).
    #[arg(long, default_value = "black")]
    qr_fill: String,

    /// QR background colour (#rrggbb, black, white).
    #[arg(long, default_value = "white")]
    qr_background: String,

    /// Print the GenerationOutput as JSON on stdout.
    #[arg(long, env = "CERTGEN_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CERTGEN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CERTGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CERTGEN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MarkerPolicyArg {
    FirstMatch,
    Reject,
    All,
}

impl From<MarkerPolicyArg> for MarkerPolicy {
    fn from(v: MarkerPolicyArg) -> Self {
        match v {
            MarkerPolicyArg::FirstMatch => MarkerPolicy::FirstMatch,
            MarkerPolicyArg::Reject => MarkerPolicy::Reject,
            MarkerPolicyArg::All => MarkerPolicy::All,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ErrorCorrectionArg {
    Low,
    Medium,
    Quartile,
    High,
}

impl From<ErrorCorrectionArg> for ErrorCorrection {
    fn from(v: ErrorCorrectionArg) -> Self {
        match v {
            ErrorCorrectionArg::Low => ErrorCorrection::Low,
            ErrorCorrectionArg::Medium => ErrorCorrection::Medium,
            ErrorCorrectionArg::Quartile => ErrorCorrection::Quartile,
            ErrorCorrectionArg::High => ErrorCorrection::High,
        }
    }
}

/// `TOKEN=VALUE`, split at the first `=`.
fn parse_field(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((token, _)) if token.is_empty() => Err("token must not be empty".into()),
        Some((token, value)) => Ok((token.to_string(), value.to_string())),
        None => Err(format!("expected TOKEN=VALUE, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = <Cli as clap::Parser>::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request and config ─────────────────────────────────────────
    let request = build_request(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = generate(&request, &config)
        .await
        .with_context(|| format!("Certificate generation from '{}' failed", cli.template_key))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize output")?
        );
    } else {
        println!("{}", output.image_key);
        if !cli.quiet {
            if let Some(ref key) = output.pdf_key {
                eprintln!("{} {}", dim("pdf:"), key);
            }
            if !output.qr_embedded {
                eprintln!(
                    "{} no shape named '{}' was replaced by a QR code",
                    cyan("⚠"),
                    cli.marker_name
                );
            }
            if !output.unresolved_placeholders.is_empty() {
                eprintln!(
                    "{} placeholders without a value: {}",
                    cyan("⚠"),
                    output.unresolved_placeholders.join(", ")
                );
            }
        }
    }

    Ok(())
}

/// Read `@path` arguments from disk; anything else is literal.
fn read_inline_or_file(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path)),
        None => Ok(arg.to_string()),
    }
}

fn build_request(cli: &Cli) -> Result<GenerationRequest> {
    // Later sources win: file, then JSON, then individual --field flags.
    let mut fields = FieldValues::new();
    if let Some(ref path) = cli.fields_file {
        fields.extend(FieldValues::from_file(path)?);
    }
    if let Some(ref json) = cli.fields_json {
        fields.extend(FieldValues::from_json(json)?);
    }
    for (token, value) in &cli.fields {
        fields.insert(token.clone(), value.clone())?;
    }
    if fields.is_empty() {
        tracing::warn!("No field values given; the template is rendered as is");
    }

    let mut request = GenerationRequest::new(cli.template_key.clone(), fields);
    if let Some(ref id) = cli.artifact_id {
        request = request.with_artifact_id(ArtifactId::parse(id.clone())?);
    }
    Ok(request)
}

async fn build_config(cli: &Cli, progress_cb: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let storage_json = read_inline_or_file(&cli.storage_json)?;
    let storage =
        StorageConfig::from_json(&storage_json).context("Invalid storage connection JSON")?;
    let store = storage
        .connect()
        .await
        .context("Failed to set up object storage")?;

    let qr_style = QrStyle {
        error_correction: cli.qr_error_correction.into(),
        box_size: cli.qr_box_size,
        border: cli.qr_border,
        fill: cli.qr_fill.parse::<Color>()?,
        background: cli.qr_background.parse::<Color>()?,
    };

    let mut rasterizer = PdfiumRasterizer::default().with_dpi(cli.dpi);
    if let Some(ref lib) = cli.pdfium_lib {
        if !lib.exists() {
            bail!("PDFIUM_LIB_PATH '{}' does not exist", lib.display());
        }
        rasterizer = rasterizer.with_lib_path(lib);
    }

    let converter =
        LibreOfficeConverter::new(&cli.converter_bin).private_profile(!cli.shared_profile);

    let mut builder = GenerationConfig::builder()
        .store(store)
        .converter(Arc::new(converter))
        .rasterizer(Arc::new(rasterizer))
        .bucket(cli.bucket.clone().unwrap_or_else(|| storage.bucket().to_string()))
        .key_prefix(cli.key_prefix.clone())
        .marker_name(cli.marker_name.clone())
        .marker_policy(cli.marker_policy.into())
        .qr_field(cli.qr_field.clone())
        .qr_style(qr_style)
        .convert_timeout_secs(cli.convert_timeout)
        .jpeg_quality(cli.jpeg_quality)
        .publish_pdf(cli.publish_pdf)
        .retain_template(cli.retain_template);

    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_parsing() {
        assert_eq!(
            parse_field("{{fullName}}=Alice Smith").unwrap(),
            ("{{fullName}}".to_string(), "Alice Smith".to_string())
        );
        assert_eq!(
            parse_field("{{q}}=a=b").unwrap(),
            ("{{q}}".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_field("{{e}}=").unwrap().1, "");
        assert!(parse_field("=x").is_err());
        assert!(parse_field("novalue").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn later_field_sources_win() {
        let cli = <Cli as clap::Parser>::parse_from([
            "certgen",
            "cert_template.pptx",
            "{}",
            "--fields-json",
            r#"{"{{a}}":"json","{{b}}":"json"}"#,
            "--field",
            "{{b}}=flag",
        ]);
        let request = build_request(&cli).unwrap();
        assert_eq!(request.fields.get("{{a}}"), Some("json"));
        assert_eq!(request.fields.get("{{b}}"), Some("flag"));
        assert!(request.artifact_id.is_none());
    }
}
