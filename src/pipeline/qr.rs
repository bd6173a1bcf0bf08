//! QR code rendering and placement.
//!
//! The template marks the QR position with a shape carrying a reserved name
//! (default `qr`). Its top-left corner and width become a square picture;
//! the marker itself is removed. Only the first slide is searched.

use crate::config::{MarkerPolicy, QrStyle};
use crate::deck::{Deck, DeckIndex, Geometry, Shape, EMU_PER_INCH};
use crate::error::CertgenError;
use image::{ImageFormat, Rgb, RgbImage};
use qrcode::QrCode;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name given to inserted QR pictures.
pub const QR_PICTURE_NAME: &str = "QR Code";

/// Render `value` as a QR code image.
///
/// The image is `(modules + 2 × border) × box_size` pixels square.
pub fn render_qr(value: &str, style: &QrStyle) -> Result<RgbImage, CertgenError> {
    let code = QrCode::with_error_correction_level(value.as_bytes(), style.error_correction.into())
        .map_err(|e| CertgenError::QrEncode(e.to_string()))?;
    let modules = code.width() as u32;
    let scale = style.box_size;
    let size = (modules + 2 * style.border) * scale;
    let offset = style.border * scale;

    let mut img = RgbImage::from_pixel(size, size, Rgb(style.background.0));
    for (i, color) in code.to_colors().iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let x = (i as u32) % modules;
        let y = (i as u32) / modules;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(
                    offset + x * scale + dx,
                    offset + y * scale + dy,
                    Rgb(style.fill.0),
                );
            }
        }
    }
    debug!("QR code: {} modules → {}x{} px", modules, size, size);
    Ok(img)
}

/// Write a rendered QR code to `path` as PNG.
pub fn write_png(img: &RgbImage, path: &Path) -> Result<(), CertgenError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CertgenError::QrEncode(format!("PNG encoding failed: {e}")))?;
    std::fs::write(path, buf).map_err(|source| CertgenError::Scratch {
        path: path.to_path_buf(),
        source,
    })
}

/// How markers are found and measured.
#[derive(Debug, Clone, Copy)]
pub struct EmbedOptions<'a> {
    pub marker_name: &'a str,
    pub policy: MarkerPolicy,
    /// Template length units per inch.
    pub length_units_per_inch: i64,
}

/// One marker replaced by a picture.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// `id` of the removed marker shape.
    pub marker_id: u32,
    pub left_in: f64,
    pub top_in: f64,
    /// Width and height of the picture.
    pub size_in: f64,
    /// Picture frame in EMU.
    pub geometry: Geometry,
}

/// A deck with QR pictures in place of its markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub deck: Deck,
    /// Empty when no marker was usable.
    pub placements: Vec<Placement>,
}

fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH as f64).round() as i64
}

/// Replace the selected marker shapes of the first slide with square
/// pictures of `image_path`.
///
/// A missing marker is not an error: the deck comes back unchanged with no
/// placements. Under [`MarkerPolicy::Reject`] more than one marker is
/// [`CertgenError::AmbiguousMarker`].
pub fn embed_qr(
    deck: &Deck,
    image_path: &Path,
    opts: &EmbedOptions<'_>,
) -> Result<Embedding, CertgenError> {
    let mut deck = deck.clone();
    let Some(slide) = deck.slides.first_mut() else {
        warn!("Template has no slides; QR code not embedded");
        return Ok(Embedding {
            deck,
            placements: Vec::new(),
        });
    };

    let markers = DeckIndex::classify(slide, Some(opts.marker_name)).markers;
    if markers.is_empty() {
        warn!(
            "No shape named '{}' on the first slide; QR code not embedded",
            opts.marker_name
        );
        return Ok(Embedding {
            deck,
            placements: Vec::new(),
        });
    }

    let selected = match opts.policy {
        MarkerPolicy::FirstMatch => {
            if markers.len() > 1 {
                warn!(
                    "{} shapes named '{}'; replacing the first, leaving {} in place",
                    markers.len(),
                    opts.marker_name,
                    markers.len() - 1
                );
            }
            markers[..1].to_vec()
        }
        MarkerPolicy::Reject if markers.len() > 1 => {
            return Err(CertgenError::AmbiguousMarker {
                name: opts.marker_name.to_string(),
                count: markers.len(),
            });
        }
        MarkerPolicy::Reject | MarkerPolicy::All => markers,
    };

    let units = opts.length_units_per_inch as f64;
    let mut placements = Vec::with_capacity(selected.len());
    let mut removed = Vec::with_capacity(selected.len());
    for pos in selected {
        let marker = &slide.shapes[pos];
        let Some(g) = marker.geometry else {
            warn!(
                "Marker '{}' (id {}) inherits its position; skipped",
                marker.name, marker.id
            );
            continue;
        };
        let left_in = g.left as f64 / units;
        let top_in = g.top as f64 / units;
        let size_in = g.width as f64 / units;
        let side = inches_to_emu(size_in);
        placements.push(Placement {
            marker_id: marker.id,
            left_in,
            top_in,
            size_in,
            geometry: Geometry {
                left: inches_to_emu(left_in),
                top: inches_to_emu(top_in),
                width: side,
                height: side,
            },
        });
        removed.push(pos);
    }

    for pos in removed.into_iter().rev() {
        slide.shapes.remove(pos);
    }
    for placement in &placements {
        let id = slide.next_shape_id();
        slide.shapes.push(Shape::inserted_picture(
            id,
            QR_PICTURE_NAME,
            placement.geometry,
            image_path.to_path_buf(),
        ));
        info!(
            "QR code placed at ({:.2}in, {:.2}in), {:.2}in square",
            placement.left_in, placement.top_in, placement.size_in
        );
    }

    Ok(Embedding { deck, placements })
}
