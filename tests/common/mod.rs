//! Shared fixtures and test doubles for the integration tests.
//!
//! Nothing here needs LibreOffice, pdfium or a network: the store is a
//! `HashMap`, the converter writes a stub PDF and the rasterizer paints a
//! solid page.

#![allow(dead_code)]

use async_trait::async_trait;
use certgen::{
    CertgenError, ConverterOutcome, DocumentConverter, GenerationProgressCallback, ObjectStore,
    Rasterizer, Stage, StorageError,
};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const BUCKET: &str = "public";
pub const TEMPLATE_KEY: &str = "cert_template.pptx";

// ── Template fixture ─────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

const PRESENTATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#;

const PRESENTATION_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#;

const SLIDE_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

const SLIDE_TAIL: &str = r#"</p:spTree></p:cSld></p:sld>"#;

/// A text shape whose single paragraph is split over `runs`.
pub fn text_shape(id: u32, name: &str, runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .map(|t| format!("<a:r><a:rPr lang=\"en-US\"/><a:t>{t}</a:t></a:r>"))
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="457200"/><a:ext cx="8229600" cy="914400"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p>{runs}</a:p></p:txBody></p:sp>"#
    )
}

/// A rectangle named `name` at 1in × 2in, 1in wide and 0.5in high.
pub fn marker_shape(id: u32, name: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="914400" y="1828800"/><a:ext cx="914400" cy="457200"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:sp>"#
    )
}

/// Write a one-slide PPTX holding `shapes` and return its bytes.
pub fn template_with(shapes: &[String]) -> Vec<u8> {
    let slide = format!("{SLIDE_HEAD}{}{SLIDE_TAIL}", shapes.concat());
    let mut writer = ZipWriter::new(io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("ppt/presentation.xml", PRESENTATION),
        ("ppt/_rels/presentation.xml.rels", PRESENTATION_RELS),
        ("ppt/slides/slide1.xml", slide.as_str()),
    ] {
        writer.start_file(name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The certificate used by most tests: a name split across two runs and
/// one `qr` marker.
pub fn certificate_template() -> Vec<u8> {
    template_with(&[
        text_shape(2, "Recipient", &["Awarded to {{ful", "lName}}"]),
        marker_shape(3, "qr"),
    ])
}

// ── In-memory object store ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
    pub downloads: AtomicUsize,
    pub uploads: AtomicUsize,
    /// Pause after writing a download, before returning.
    pub download_delay_ms: AtomicU64,
    /// Fail every upload with a transport error.
    pub fail_uploads: AtomicBool,
}

impl MemoryStore {
    pub fn with_template(bytes: Vec<u8>) -> Arc<Self> {
        let store = Self::default();
        store.put(TEMPLATE_KEY, bytes, "application/octet-stream");
        Arc::new(store)
    }

    pub fn put(&self, key: &str, body: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            (BUCKET.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .unwrap()
            .get(&(BUCKET.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys other than the template, sorted.
    pub fn published_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, k)| k.clone())
            .filter(|k| k != TEMPLATE_KEY)
            .collect();
        keys.sort();
        keys
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64, StorageError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let body = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(b, _)| b.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        tokio::fs::write(dest, &body).await?;
        let delay = self.download_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(body.len() as u64)
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("connection reset by peer".into()));
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (body, content_type.to_string()),
        );
        Ok(())
    }
}

// ── Converter doubles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterMode {
    /// Write `<stem>.pdf` and exit 0.
    Succeed,
    /// Exit 1 without output.
    Fail,
    /// Exit 0 without output.
    Silent,
    /// Never finish.
    Hang,
}

/// Converter double; keeps a copy of every deck it is given.
pub struct FakeConverter {
    mode: ConverterMode,
    captured: Mutex<Vec<Vec<u8>>>,
}

impl FakeConverter {
    pub fn new(mode: ConverterMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            captured: Mutex::new(Vec::new()),
        })
    }

    /// The last populated deck handed to the converter.
    pub fn last_deck(&self) -> Option<Vec<u8>> {
        self.captured.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> io::Result<ConverterOutcome> {
        let deck = tokio::fs::read(input).await?;
        self.captured.lock().unwrap().push(deck);
        match self.mode {
            ConverterMode::Succeed => {
                let out = certgen::pipeline::convert::expected_output(input, out_dir);
                tokio::fs::write(out, b"%PDF-1.4\n% stub\n").await?;
                Ok(ConverterOutcome::success())
            }
            ConverterMode::Fail => Ok(ConverterOutcome {
                exit_code: Some(1),
                stderr: "Error: source file could not be loaded".into(),
            }),
            ConverterMode::Silent => Ok(ConverterOutcome::success()),
            ConverterMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ConverterOutcome::success())
            }
        }
    }
}

// ── Rasterizer double ────────────────────────────────────────────────────────

/// Paints a blank A4-ish landscape page at 150 dpi.
pub struct SolidRasterizer;

impl Rasterizer for SolidRasterizer {
    fn render_first_page(&self, pdf: &Path) -> Result<DynamicImage, CertgenError> {
        if !pdf.exists() {
            return Err(CertgenError::Rasterisation {
                path: pdf.to_path_buf(),
                detail: "missing".into(),
            });
        }
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            1500,
            1125,
            Rgb([250, 248, 240]),
        )))
    }
}

// ── Progress recorder ────────────────────────────────────────────────────────

/// Records callback events as short strings such as `start:fetch`.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl GenerationProgressCallback for RecordingProgress {
    fn on_generation_start(&self, _artifact_id: &str, template_key: &str) {
        self.push(format!("begin:{template_key}"));
    }

    fn on_stage_start(&self, stage: Stage) {
        self.push(format!("start:{stage}"));
    }

    fn on_stage_skipped(&self, stage: Stage, _reason: &str) {
        self.push(format!("skip:{stage}"));
    }

    fn on_generation_error(&self, stage: Stage, _error: &str) {
        self.push(format!("error:{stage}"));
    }

    fn on_generation_complete(&self, image_key: &str, _total_duration_ms: u64) {
        self.push(format!("done:{image_key}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Route pipeline logs to the test harness (`RUST_LOG=certgen=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Entries left in `dir`.
pub fn leftovers(dir: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    out.sort();
    out
}
