//! Pipeline stages for certificate generation.
//!
//! Each submodule implements exactly one step; [`crate::generate`] runs them
//! in order against a [`scratch::Scratch`] registry.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ substitute ──▶ qr ──▶ convert ──▶ render ──▶ encode ──▶ publish
//! (store)   (deck model)  (PNG)  (LibreOffice) (pdfium)  (JPEG)    (store)
//! ```
//!
//! 1. [`fetch`]: template key → local copy, reused when present
//! 2. [`substitute`]: placeholder values into paragraph text (pure)
//! 3. [`qr`]: render the QR code, swap the marker shape for it (pure)
//! 4. [`convert`]: populated deck → PDF via an external converter, with
//!    timeout and output check
//! 5. [`render`]: rasterise page 1; runs in `spawn_blocking`
//! 6. [`encode`]: JPEG-encode the page image
//! 7. [`publish`]: upload to `<prefix>/jpg/<id>.jpg`
//!
//! [`scratch`] removes every temporary file on every exit path.

pub mod convert;
pub mod encode;
pub mod fetch;
pub mod publish;
pub mod qr;
pub mod render;
pub mod scratch;
pub mod substitute;
