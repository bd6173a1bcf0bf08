//! First-page rasterisation of the fixed-layout document.
//!
//! pdfium uses thread-local state and blocks for the whole render, so the
//! [`Rasterizer`] trait is synchronous and [`rasterize_first_page`] moves the
//! call onto `spawn_blocking`.

use crate::error::CertgenError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Renders page 1 of a fixed-layout document.
pub trait Rasterizer: Send + Sync {
    fn render_first_page(&self, pdf: &Path) -> Result<DynamicImage, CertgenError>;
}

/// [`Rasterizer`] backed by pdfium-render.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    /// Explicit libpdfium path; the current directory and the system
    /// library paths are searched when unset.
    pub lib_path: Option<PathBuf>,
    /// Rendering DPI. Default: 150.
    pub dpi: u32,
    /// Cap on the longest rendered edge, in pixels. Default: 4000.
    pub max_rendered_pixels: u32,
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self {
            lib_path: None,
            dpi: 150,
            max_rendered_pixels: 4000,
        }
    }
}

impl PdfiumRasterizer {
    pub fn with_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_path = Some(path.into());
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn with_max_rendered_pixels(mut self, px: u32) -> Self {
        self.max_rendered_pixels = px.max(100);
        self
    }

    fn bind(&self, pdf: &Path) -> Result<Pdfium, CertgenError> {
        let bindings = match &self.lib_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| CertgenError::Rasterisation {
            path: pdf.to_path_buf(),
            detail: format!("cannot load libpdfium: {e:?}"),
        })?;
        Ok(Pdfium::new(bindings))
    }

    /// Pixel width for a page `width_pts` wide, capped at
    /// `max_rendered_pixels`.
    fn target_width(&self, width_pts: f32) -> i32 {
        let px = (width_pts / 72.0 * self.dpi as f32).round() as i32;
        px.clamp(1, self.max_rendered_pixels as i32)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn render_first_page(&self, pdf: &Path) -> Result<DynamicImage, CertgenError> {
        let raster_err = |detail: String| CertgenError::Rasterisation {
            path: pdf.to_path_buf(),
            detail,
        };

        let pdfium = self.bind(pdf)?;
        let document = pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| raster_err(format!("{e:?}")))?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(raster_err("document has no pages".into()));
        }
        info!("PDF loaded: {} pages, rendering page 1", pages.len());

        let page = pages.get(0).map_err(|e| raster_err(format!("{e:?}")))?;
        let render_config = PdfRenderConfig::new()
            .set_target_width(self.target_width(page.width().value))
            .set_maximum_height(self.max_rendered_pixels as i32);

        let image = page
            .render_with_config(&render_config)
            .map_err(|e| raster_err(format!("{e:?}")))?
            .as_image();
        debug!("Rendered page 1 → {}x{} px", image.width(), image.height());
        Ok(image)
    }
}

/// Run `rasterizer` on the blocking pool.
pub async fn rasterize_first_page(
    rasterizer: Arc<dyn Rasterizer>,
    pdf: &Path,
) -> Result<DynamicImage, CertgenError> {
    let path = pdf.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.render_first_page(&path))
        .await
        .map_err(|e| CertgenError::Internal(format!("Render task panicked: {}", e)))?
}
