//! # certgen
//!
//! Render personalised certificates from slide-deck templates.
//!
//! A template is an ordinary PPTX file kept in object storage. Text such as
//! `{{fullName}}` marks where request values go, and a shape named `qr`
//! marks where a QR code goes. One run produces one JPEG of the first
//! slide, published at `certificates/jpg/<id>.jpg`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! template key + field values
//!  │
//!  ├─ 1. Fetch       object store → scratch copy (reused when present)
//!  ├─ 2. Load        PPTX → typed deck model
//!  ├─ 3. Substitute  {{token}} → value, per paragraph
//!  ├─ 4. Embed QR    marker shape → square QR picture
//!  ├─ 5. Save        deck model → populated PPTX
//!  ├─ 6. Convert     PPTX → PDF (LibreOffice, with timeout)
//!  ├─ 7. Rasterize   page 1 → JPEG (pdfium, spawn_blocking)
//!  ├─ 8. Publish     JPEG (and optionally PDF) → object store
//!  └─ 9. Cleanup     every scratch file removed, on success and failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certgen::{generate, FieldValues, GenerationConfig, GenerationRequest, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = StorageConfig::from_json(
//!         r#"{"endpoint":"localhost:9000","access_key":"minio","secret_key":"minio123"}"#,
//!     )?;
//!     let config = GenerationConfig::builder()
//!         .store(storage.connect().await?)
//!         .build()?;
//!
//!     let fields = FieldValues::new()
//!         .with("{{fullName}}", "Alice Smith")?
//!         .with("{{qr_link}}", "https://example.com/qr-code")?;
//!     let output = generate(&GenerationRequest::new("cert_template.pptx", fields), &config).await?;
//!     println!("{}", output.image_key);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `certgen` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! The default converter runs `libreoffice` from `PATH`; the default
//! rasterizer loads `libpdfium` from the working directory or the system
//! library path. Both are replaceable through [`GenerationConfigBuilder`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod deck;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Color, ErrorCorrection, GenerationConfig, GenerationConfigBuilder, MarkerPolicy, QrStyle,
};
pub use error::{CertgenError, DeckError, Stage};
pub use generate::{generate, generate_sync};
pub use output::{GenerationOutput, GenerationStats, StageTiming};
pub use pipeline::convert::{ConverterOutcome, DocumentConverter, LibreOfficeConverter};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use pipeline::scratch::CleanupReport;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::{ArtifactId, FieldValues, GenerationRequest};
pub use storage::{LocalStore, ObjectStore, S3Store, StorageConfig, StorageError};
