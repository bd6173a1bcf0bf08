//! Configuration types for certificate generation.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. The injected capabilities (object
//! store, document converter, rasterizer, progress callback) live next to
//! the plain knobs so one value describes a complete run environment.

use crate::deck::EMU_PER_INCH;
use crate::error::CertgenError;
use crate::pipeline::convert::{DocumentConverter, LibreOfficeConverter};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::progress::ProgressCallback;
use crate::storage::{ObjectStore, DEFAULT_BUCKET};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Field whose value is encoded into the QR code.
pub const DEFAULT_QR_FIELD: &str = "{{qr_link}}";

/// Shape name that marks where the QR code goes.
pub const DEFAULT_MARKER_NAME: &str = "qr";

/// Key prefix under which images (`<prefix>/jpg/`) and PDFs
/// (`<prefix>/pdf/`) are published.
pub const DEFAULT_KEY_PREFIX: &str = "certificates";

/// Configuration for one certificate generation run.
///
/// Built via [`GenerationConfig::builder()`]; an object store is required.
///
/// # Example
/// ```rust,no_run
/// use certgen::{GenerationConfig, LocalStore, MarkerPolicy};
/// use std::sync::Arc;
///
/// let config = GenerationConfig::builder()
///     .store(Arc::new(LocalStore::new("/srv/objects")))
///     .marker_policy(MarkerPolicy::All)
///     .convert_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Where templates are fetched from and artifacts published to.
    pub store: Arc<dyn ObjectStore>,

    /// Fixed-layout conversion capability. Default: [`LibreOfficeConverter`].
    pub converter: Arc<dyn DocumentConverter>,

    /// First-page rasterizer. Default: [`PdfiumRasterizer`].
    pub rasterizer: Arc<dyn Rasterizer>,

    /// Bucket for both the template and the outputs. Default: `public`.
    pub bucket: String,

    /// Directory for the template copy and per-run scratch files.
    /// Default: the system temp directory.
    pub scratch_dir: PathBuf,

    /// Prefix of the published keys. Default: `certificates`.
    pub key_prefix: String,

    /// Reserved shape name of the QR marker. Default: `qr`.
    pub marker_name: String,

    /// What to do with more than one marker on the first slide.
    pub marker_policy: MarkerPolicy,

    /// Field map entry holding the QR payload. Default: `{{qr_link}}`.
    pub qr_field: String,

    /// QR rendering parameters.
    pub qr_style: QrStyle,

    /// Template length units per inch, used to turn marker geometry into
    /// inches before the picture is placed. Default: 914 400 (EMU).
    pub length_units_per_inch: i64,

    /// Upper bound for one converter invocation, in seconds. Default: 120.
    pub convert_timeout_secs: u64,

    /// JPEG quality of the published image (1–100). Default: 90.
    pub jpeg_quality: u8,

    /// Also publish the intermediate PDF under `<prefix>/pdf/`. Default: false.
    pub publish_pdf: bool,

    /// Keep the fetched template copy after the run so the next run with the
    /// same key reuses it. Default: false.
    pub retain_template: bool,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("store", &"<dyn ObjectStore>")
            .field("converter", &"<dyn DocumentConverter>")
            .field("rasterizer", &"<dyn Rasterizer>")
            .field("bucket", &self.bucket)
            .field("scratch_dir", &self.scratch_dir)
            .field("key_prefix", &self.key_prefix)
            .field("marker_name", &self.marker_name)
            .field("marker_policy", &self.marker_policy)
            .field("qr_field", &self.qr_field)
            .field("qr_style", &self.qr_style)
            .field("length_units_per_inch", &self.length_units_per_inch)
            .field("convert_timeout_secs", &self.convert_timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("publish_pdf", &self.publish_pdf)
            .field("retain_template", &self.retain_template)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::default()
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    store: Option<Arc<dyn ObjectStore>>,
    converter: Option<Arc<dyn DocumentConverter>>,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    bucket: String,
    scratch_dir: Option<PathBuf>,
    key_prefix: String,
    marker_name: String,
    marker_policy: MarkerPolicy,
    qr_field: String,
    qr_style: QrStyle,
    length_units_per_inch: i64,
    convert_timeout_secs: u64,
    jpeg_quality: u8,
    publish_pdf: bool,
    retain_template: bool,
    progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfigBuilder {
    fn default() -> Self {
        Self {
            store: None,
            converter: None,
            rasterizer: None,
            bucket: DEFAULT_BUCKET.to_string(),
            scratch_dir: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            marker_name: DEFAULT_MARKER_NAME.to_string(),
            marker_policy: MarkerPolicy::default(),
            qr_field: DEFAULT_QR_FIELD.to_string(),
            qr_style: QrStyle::default(),
            length_units_per_inch: EMU_PER_INCH,
            convert_timeout_secs: 120,
            jpeg_quality: 90,
            publish_pdf: false,
            retain_template: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfigBuilder")
            .field("store", &self.store.as_ref().map(|_| "<dyn ObjectStore>"))
            .field("bucket", &self.bucket)
            .field("scratch_dir", &self.scratch_dir)
            .field("marker_name", &self.marker_name)
            .field("marker_policy", &self.marker_policy)
            .finish_non_exhaustive()
    }
}

impl GenerationConfigBuilder {
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn marker_name(mut self, name: impl Into<String>) -> Self {
        self.marker_name = name.into();
        self
    }

    pub fn marker_policy(mut self, policy: MarkerPolicy) -> Self {
        self.marker_policy = policy;
        self
    }

    pub fn qr_field(mut self, field: impl Into<String>) -> Self {
        self.qr_field = field.into();
        self
    }

    pub fn qr_style(mut self, style: QrStyle) -> Self {
        self.qr_style = style;
        self
    }

    pub fn length_units_per_inch(mut self, units: i64) -> Self {
        self.length_units_per_inch = units;
        self
    }

    pub fn convert_timeout_secs(mut self, secs: u64) -> Self {
        self.convert_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn publish_pdf(mut self, v: bool) -> Self {
        self.publish_pdf = v;
        self
    }

    pub fn retain_template(mut self, v: bool) -> Self {
        self.retain_template = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, CertgenError> {
        let store = self
            .store
            .ok_or_else(|| CertgenError::Config("an object store is required".into()))?;
        if self.bucket.trim().is_empty() {
            return Err(CertgenError::Config("bucket must not be empty".into()));
        }
        if self.marker_name.is_empty() {
            return Err(CertgenError::Config("marker name must not be empty".into()));
        }
        if self.qr_field.is_empty() {
            return Err(CertgenError::Config("QR field must not be empty".into()));
        }
        if self.length_units_per_inch <= 0 {
            return Err(CertgenError::Config(format!(
                "length units per inch must be positive, got {}",
                self.length_units_per_inch
            )));
        }
        if self.convert_timeout_secs == 0 {
            return Err(CertgenError::Config(
                "conversion timeout must be at least 1 second".into(),
            ));
        }
        self.qr_style.validate()?;

        Ok(GenerationConfig {
            store,
            converter: self
                .converter
                .unwrap_or_else(|| Arc::new(LibreOfficeConverter::default())),
            rasterizer: self
                .rasterizer
                .unwrap_or_else(|| Arc::new(PdfiumRasterizer::default())),
            bucket: self.bucket,
            scratch_dir: self.scratch_dir.unwrap_or_else(std::env::temp_dir),
            key_prefix: self.key_prefix,
            marker_name: self.marker_name,
            marker_policy: self.marker_policy,
            qr_field: self.qr_field,
            qr_style: self.qr_style,
            length_units_per_inch: self.length_units_per_inch,
            convert_timeout_secs: self.convert_timeout_secs,
            jpeg_quality: self.jpeg_quality,
            publish_pdf: self.publish_pdf,
            retain_template: self.retain_template,
            progress_callback: self.progress_callback,
        })
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Handling of several shapes carrying the marker name on the first slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerPolicy {
    /// Replace the first marker; leave the others in place with a warning. (default)
    #[default]
    FirstMatch,
    /// More than one marker is a configuration error.
    Reject,
    /// Replace every marker with its own QR picture.
    All,
}

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    /// ~7 % of codewords recoverable.
    Low,
    /// ~15 %. (default)
    #[default]
    Medium,
    /// ~25 %.
    Quartile,
    /// ~30 %.
    High,
}

impl From<ErrorCorrection> for qrcode::EcLevel {
    fn from(v: ErrorCorrection) -> Self {
        match v {
            ErrorCorrection::Low => qrcode::EcLevel::L,
            ErrorCorrection::Medium => qrcode::EcLevel::M,
            ErrorCorrection::Quartile => qrcode::EcLevel::Q,
            ErrorCorrection::High => qrcode::EcLevel::H,
        }
    }
}

/// An sRGB colour, written `#rrggbb` or as one of a few names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const WHITE: Color = Color([255, 255, 255]);
}

impl FromStr for Color {
    type Err = CertgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Color::BLACK),
            "white" => return Ok(Color::WHITE),
            _ => {}
        }
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| CertgenError::Config(format!("invalid colour '{s}', expected #rrggbb")))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| CertgenError::Config(format!("invalid colour '{s}'")))
        };
        Ok(Color([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = CertgenError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// QR code appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrStyle {
    pub error_correction: ErrorCorrection,
    /// Pixels per module. Default: 4.
    pub box_size: u32,
    /// Quiet-zone width in modules. Default: 1.
    pub border: u32,
    pub fill: Color,
    pub background: Color,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrection::default(),
            box_size: 4,
            border: 1,
            fill: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

impl QrStyle {
    pub fn validate(&self) -> Result<(), CertgenError> {
        if self.box_size == 0 || self.box_size > 64 {
            return Err(CertgenError::Config(format!(
                "QR box size must be 1–64 pixels, got {}",
                self.box_size
            )));
        }
        if self.border > 16 {
            return Err(CertgenError::Config(format!(
                "QR border must be at most 16 modules, got {}",
                self.border
            )));
        }
        if self.fill == self.background {
            return Err(CertgenError::Config(
                "QR fill and background colours must differ".into(),
            ));
        }
        Ok(())
    }
}
