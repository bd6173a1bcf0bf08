//! Generation entry points: run every stage for one request.
//!
//! Stages run strictly in order. The first error ends the run; the scratch
//! registry is released before the error is returned, so no temporary file
//! outlives a call whatever its outcome.

use crate::config::GenerationConfig;
use crate::deck::TemplatePackage;
use crate::error::{CertgenError, Stage};
use crate::output::{GenerationOutput, GenerationStats, StageTiming};
use crate::pipeline::fetch::{Fetcher, TemplatePaths};
use crate::pipeline::qr::{self, EmbedOptions};
use crate::pipeline::scratch::{ArtifactKind, Scratch};
use crate::pipeline::{convert, encode, publish, render, substitute};
use crate::progress::ProgressCallback;
use crate::request::GenerationRequest;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Records stage timings and forwards them to the progress callback.
struct StageClock<'a> {
    callback: Option<&'a ProgressCallback>,
    stages: Vec<StageTiming>,
    current: Option<(Stage, Instant)>,
}

impl<'a> StageClock<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            stages: Vec::new(),
            current: None,
        }
    }

    fn start(&mut self, stage: Stage) {
        debug!("Stage {} started", stage);
        if let Some(cb) = self.callback {
            cb.on_stage_start(stage);
        }
        self.current = Some((stage, Instant::now()));
    }

    fn finish(&mut self) {
        if let Some((stage, started)) = self.current.take() {
            let duration_ms = started.elapsed().as_millis() as u64;
            if let Some(cb) = self.callback {
                cb.on_stage_complete(stage, duration_ms);
            }
            self.stages.push(StageTiming { stage, duration_ms });
        }
    }

    fn skip(&mut self, stage: Stage, reason: &str) {
        info!("Stage {} skipped: {}", stage, reason);
        if let Some(cb) = self.callback {
            cb.on_stage_skipped(stage, reason);
        }
    }
}

/// What the stages produced, before cleanup.
struct Produced {
    image_key: String,
    pdf_key: Option<String>,
    qr_placements: usize,
    paragraphs_changed: usize,
    unresolved_placeholders: Vec<String>,
    template_reused: bool,
    image_width: u32,
    image_height: u32,
    image_bytes: usize,
}

/// Generate one certificate image and publish it.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(GenerationOutput)` once the JPEG (and, if enabled, the PDF) is
/// published and scratch files are removed. A template without a QR marker
/// still succeeds, with `qr_embedded = false`.
///
/// # Errors
/// Any stage failure. Cleanup has already run when the error is returned.
pub async fn generate(
    request: &GenerationRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, CertgenError> {
    let total_start = Instant::now();
    let artifact_id = request.artifact_id.clone().unwrap_or_default();
    info!(
        "Starting generation {} from template '{}'",
        artifact_id, request.template_key
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_generation_start(artifact_id.as_str(), &request.template_key);
    }

    let mut scratch = match Scratch::new(&config.scratch_dir, artifact_id.clone()) {
        Ok(s) => s,
        Err(e) => return Err(report_error(config, e)),
    };
    let mut clock = StageClock::new(config.progress_callback.as_ref());

    let result = run_stages(request, config, &mut scratch, &mut clock).await;

    clock.start(Stage::Cleanup);
    let cleanup = scratch.release();
    clock.finish();
    if !cleanup.is_clean() {
        warn!("{} scratch files could not be removed", cleanup.failed.len());
    }

    let produced = result.map_err(|e| report_error(config, e))?;
    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Generation {} complete: {} in {}ms",
        artifact_id, produced.image_key, total_duration_ms
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_generation_complete(&produced.image_key, total_duration_ms);
    }

    Ok(GenerationOutput {
        artifact_id: artifact_id.to_string(),
        image_key: produced.image_key,
        pdf_key: produced.pdf_key,
        qr_embedded: produced.qr_placements > 0,
        qr_placements: produced.qr_placements,
        paragraphs_changed: produced.paragraphs_changed,
        unresolved_placeholders: produced.unresolved_placeholders,
        template_reused: produced.template_reused,
        stats: GenerationStats {
            stages: clock.stages,
            image_width: produced.image_width,
            image_height: produced.image_height,
            image_bytes: produced.image_bytes,
            total_duration_ms,
        },
        cleanup,
    })
}

fn report_error(config: &GenerationConfig, e: CertgenError) -> CertgenError {
    warn!("Generation failed at stage {}: {}", e.stage(), e);
    if let Some(cb) = &config.progress_callback {
        cb.on_generation_error(e.stage(), &e.to_string());
    }
    e
}

async fn run_stages(
    request: &GenerationRequest,
    config: &GenerationConfig,
    scratch: &mut Scratch,
    clock: &mut StageClock<'_>,
) -> Result<Produced, CertgenError> {
    // ── Step 1: Fetch template ───────────────────────────────────────────
    clock.start(Stage::Fetch);
    let paths = TemplatePaths::for_run(scratch, &request.template_key)?;
    scratch.register_path(ArtifactKind::TemplateCopy, &paths.working);
    scratch.register_path(ArtifactKind::Partial, &paths.partial);
    let fetched = Fetcher::new(config.store.as_ref(), &config.bucket)
        .fetch(&request.template_key, &paths, config.retain_template)
        .await?;
    if config.retain_template && fetched.shared {
        scratch.register_path(ArtifactKind::TemplateCopy, &paths.shared);
        scratch.retain(&paths.shared);
    }
    clock.finish();

    // ── Step 2: Load deck ────────────────────────────────────────────────
    clock.start(Stage::Load);
    let path = fetched.path.clone();
    let (package, deck) = tokio::task::spawn_blocking(move || TemplatePackage::open(&path))
        .await
        .map_err(|e| CertgenError::Internal(format!("Load task panicked: {}", e)))?
        .map_err(|e| e.at(Stage::Load, &fetched.path))?;
    debug!("Deck loaded: {} slides", deck.slides.len());
    clock.finish();

    // ── Step 3: Substitute placeholders ──────────────────────────────────
    clock.start(Stage::Substitute);
    let substitution = substitute::substitute(&deck, &request.fields);
    let unresolved_placeholders = substitute::leftover_tokens(&substitution.deck);
    clock.finish();

    // ── Step 4: Embed QR code ────────────────────────────────────────────
    let mut deck = substitution.deck;
    let mut qr_placements = 0;
    match request.fields.get(&config.qr_field) {
        None => clock.skip(
            Stage::EmbedQr,
            &format!("no value for '{}'", config.qr_field),
        ),
        Some(value) => {
            clock.start(Stage::EmbedQr);
            let qr_path = scratch.register(ArtifactKind::QrImage);
            let embedding = qr::embed_qr(
                &deck,
                &qr_path,
                &EmbedOptions {
                    marker_name: &config.marker_name,
                    policy: config.marker_policy,
                    length_units_per_inch: config.length_units_per_inch,
                },
            )?;
            if embedding.placements.is_empty() {
                clock.finish();
            } else {
                let img = qr::render_qr(value, &config.qr_style)?;
                qr::write_png(&img, &qr_path)?;
                qr_placements = embedding.placements.len();
                deck = embedding.deck;
                clock.finish();
            }
        }
    }

    // ── Step 5: Save populated deck ──────────────────────────────────────
    clock.start(Stage::Save);
    let deck_path = scratch.register(ArtifactKind::IntermediateDeck);
    let out = deck_path.clone();
    tokio::task::spawn_blocking(move || package.save(&deck, &out))
        .await
        .map_err(|e| CertgenError::Internal(format!("Save task panicked: {}", e)))?
        .map_err(|e| e.at(Stage::Save, &deck_path))?;
    clock.finish();

    // ── Step 6: Convert to PDF ───────────────────────────────────────────
    clock.start(Stage::Convert);
    scratch.register_path(
        ArtifactKind::FixedLayout,
        convert::expected_output(&deck_path, scratch.dir()),
    );
    let pdf_path = convert::convert_to_fixed_layout(
        config.converter.as_ref(),
        &deck_path,
        scratch.dir(),
        Duration::from_secs(config.convert_timeout_secs),
    )
    .await?;
    clock.finish();

    // ── Step 7: Rasterise first page ─────────────────────────────────────
    clock.start(Stage::Rasterize);
    let image = render::rasterize_first_page(config.rasterizer.clone(), &pdf_path).await?;
    let (image_width, image_height) = (image.width(), image.height());
    let jpeg = encode::encode_jpeg(&image, config.jpeg_quality).map_err(|e| {
        CertgenError::Rasterisation {
            path: pdf_path.clone(),
            detail: format!("JPEG encoding failed: {e}"),
        }
    })?;
    drop(image);
    clock.finish();

    // ── Step 8: Publish ──────────────────────────────────────────────────
    clock.start(Stage::Publish);
    let artifact_id = scratch.artifact_id().clone();
    let image_key = publish::image_key(&config.key_prefix, &artifact_id);
    let image_bytes = jpeg.len();
    publish::publish(
        config.store.as_ref(),
        &config.bucket,
        &image_key,
        jpeg,
        publish::JPEG_CONTENT_TYPE,
    )
    .await?;

    let pdf_key = if config.publish_pdf {
        let key = publish::pdf_key(&config.key_prefix, &artifact_id);
        let body = tokio::fs::read(&pdf_path)
            .await
            .map_err(|source| CertgenError::Scratch {
                path: pdf_path.clone(),
                source,
            })?;
        publish::publish(
            config.store.as_ref(),
            &config.bucket,
            &key,
            body,
            publish::PDF_CONTENT_TYPE,
        )
        .await?;
        Some(key)
    } else {
        None
    };
    clock.finish();

    Ok(Produced {
        image_key,
        pdf_key,
        qr_placements,
        paragraphs_changed: substitution.paragraphs_changed,
        unresolved_placeholders,
        template_reused: fetched.reused,
        image_width,
        image_height,
        image_bytes,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    request: &GenerationRequest,
    config: &GenerationConfig,
) -> Result<GenerationOutput, CertgenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CertgenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(request, config))
}
