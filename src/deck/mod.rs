//! Minimal PPTX codec: a typed slide/shape/run tree and a package writer
//! that splices changes back into the template's own XML.

pub mod model;
pub mod package;
pub mod slide;

pub use model::{
    Deck, DeckIndex, Geometry, Paragraph, PictureSource, PlaceholderKind, Run, Shape, ShapeKind,
    ShapeOrigin, ShapeRole, Slide, TextBody, EMU_PER_INCH,
};
pub use package::TemplatePackage;
