//! Typed value tree for a slide deck.
//!
//! The tree carries only what the pipeline reads or changes: shape identity,
//! geometry, placeholder role, paragraph/run text and inserted pictures.
//! Everything else stays in the original XML, and [`ShapeOrigin`] ties each
//! template shape back to the element it came from so the package writer
//! can splice changes into it.

use std::path::PathBuf;

/// English Metric Units per inch, the OOXML length unit.
pub const EMU_PER_INCH: i64 = 914_400;

/// A whole presentation, slides in presentation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    pub shapes: Vec<Shape>,
}

/// Where a shape came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeOrigin {
    /// The n-th shape element of the slide's `p:spTree`.
    Template(usize),
    /// Added during generation.
    Inserted,
}

/// Offset and extent, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// The `type` of a `p:ph` placeholder element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    Picture,
    /// Any other placeholder type (`title`, `body`, …); `None` when untyped.
    Other(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// `p:cNvPr/@id`, unique within a slide.
    pub id: u32,
    /// `p:cNvPr/@name`.
    pub name: String,
    pub origin: ShapeOrigin,
    /// `None` when the shape inherits its position from the layout.
    pub geometry: Option<Geometry>,
    pub placeholder: Option<PlaceholderKind>,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// `p:sp` with a text body.
    Text(TextBody),
    /// A picture; `source` is set for pictures inserted during generation.
    Picture(PictureSource),
    /// Anything else (graphic frames, groups, connectors, text-less shapes).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PictureSource {
    /// A picture that was already in the template.
    Embedded,
    /// Image file to be stored in the package on save.
    File(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBody {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

/// Smallest independently styled text unit (`a:r`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Paragraph {
    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Put `text` in the first run and blank the others.
    ///
    /// A paragraph without runs is left alone: there is no run to carry the
    /// style of new text.
    pub fn collapse_into_first_run(&mut self, text: String) {
        let mut runs = self.runs.iter_mut();
        if let Some(first) = runs.next() {
            first.text = text;
            for run in runs {
                run.text.clear();
            }
        }
    }
}

impl Shape {
    pub fn has_text(&self) -> bool {
        matches!(self.kind, ShapeKind::Text(_))
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn is_picture_placeholder(&self) -> bool {
        matches!(self.placeholder, Some(PlaceholderKind::Picture))
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        match &self.kind {
            ShapeKind::Text(body) => Some(body),
            _ => None,
        }
    }

    /// A picture shape added during generation.
    pub fn inserted_picture(id: u32, name: impl Into<String>, geometry: Geometry, file: PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            origin: ShapeOrigin::Inserted,
            geometry: Some(geometry),
            placeholder: None,
            kind: ShapeKind::Picture(PictureSource::File(file)),
        }
    }
}

impl Slide {
    /// One more than the largest shape id on the slide (2 for an empty one).
    pub fn next_shape_id(&self) -> u32 {
        self.shapes.iter().map(|s| s.id).max().unwrap_or(1) + 1
    }
}

/// How the pipeline sees each shape of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRole {
    TextBearing,
    Marker,
    Other,
}

/// One classification pass over a slide.
///
/// Positions index into [`Slide::shapes`]; shapes that are neither text nor
/// marker are not listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckIndex {
    pub text_bearing: Vec<usize>,
    pub markers: Vec<usize>,
}

impl DeckIndex {
    /// Classify the shapes of `slide`; a shape named `marker_name` is a marker
    /// even when it also carries text. With no marker name every text shape
    /// is text-bearing.
    pub fn classify(slide: &Slide, marker_name: Option<&str>) -> Self {
        let mut index = DeckIndex::default();
        for (pos, shape) in slide.shapes.iter().enumerate() {
            match Self::role(shape, marker_name) {
                ShapeRole::Marker => index.markers.push(pos),
                ShapeRole::TextBearing => index.text_bearing.push(pos),
                ShapeRole::Other => {}
            }
        }
        index
    }

    pub fn role(shape: &Shape, marker_name: Option<&str>) -> ShapeRole {
        if marker_name == Some(shape.name.as_str()) {
            ShapeRole::Marker
        } else if shape.has_text() {
            ShapeRole::TextBearing
        } else {
            ShapeRole::Other
        }
    }
}
