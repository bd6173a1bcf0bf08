//! PPTX package I/O: zip container, slide ordering, relationships, media.
//!
//! Only three kinds of part are ever rewritten: slide XML, slide
//! relationship files and `[Content_Types].xml`. New pictures add one media
//! part each. Every other entry is raw-copied from the template, so layouts,
//! masters, themes and fonts survive byte for byte.

use super::model::{Deck, PictureSource, Shape, ShapeKind, ShapeOrigin};
use super::slide::{self, PictureElement};
use crate::error::DeckError;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = "[Content_Types].xml";
const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const EMPTY_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
);

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("static regex"));
static REL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"Id="rId(\d+)""#).expect("static regex"));

/// A slide part as loaded from the template.
#[derive(Debug, Clone)]
struct SlidePart {
    part: String,
    xml: String,
    rels: Option<String>,
    max_shape_id: u32,
}

/// An opened template: enough of the package to write a modified copy.
#[derive(Debug, Clone)]
pub struct TemplatePackage {
    source: PathBuf,
    slides: Vec<SlidePart>,
    content_types: String,
    entries: BTreeSet<String>,
}

impl TemplatePackage {
    /// Open a `.pptx` file and parse its slides into a [`Deck`].
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Deck), DeckError> {
        let path = path.as_ref();
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
        let entries: BTreeSet<String> = archive.file_names().map(str::to_string).collect();

        let content_types = read_part(&mut archive, CONTENT_TYPES)?;
        let order = slide_order(&mut archive, &entries)?;
        debug!("Template {} has {} slides", path.display(), order.len());

        let mut slides = Vec::with_capacity(order.len());
        let mut deck = Deck::default();
        for part in order {
            let xml = read_part(&mut archive, &part)?;
            let rels_name = rels_path(&part);
            let rels = if entries.contains(&rels_name) {
                Some(read_part(&mut archive, &rels_name)?)
            } else {
                None
            };
            let parsed = slide::parse_slide(&part, &xml)?;
            deck.slides.push(parsed.slide);
            slides.push(SlidePart {
                part,
                xml,
                rels,
                max_shape_id: parsed.max_shape_id,
            });
        }

        Ok((
            Self {
                source: path.to_path_buf(),
                slides,
                content_types,
                entries,
            },
            deck,
        ))
    }

    /// Write `deck` as a new package at `out`.
    ///
    /// `deck` must have been produced from this package's [`Deck`] (same
    /// slides; shapes removed, text changed or pictures inserted).
    pub fn save(&self, deck: &Deck, out: impl AsRef<Path>) -> Result<(), DeckError> {
        if deck.slides.len() != self.slides.len() {
            return Err(DeckError::ModelMismatch(format!(
                "deck has {} slides, template has {}",
                deck.slides.len(),
                self.slides.len()
            )));
        }

        let mut replaced: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut added: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut extensions: BTreeSet<String> = BTreeSet::new();
        let mut media_seq = 0usize;

        for (part, slide) in self.slides.iter().zip(&deck.slides) {
            let mut rels = part.rels.clone().unwrap_or_else(|| EMPTY_RELS.to_string());
            let mut next_rel = next_rel_id(&rels);
            let mut next_id = slide
                .shapes
                .iter()
                .map(|s| s.id)
                .max()
                .unwrap_or(0)
                .max(part.max_shape_id)
                + 1;

            let mut pictures = Vec::new();
            for shape in slide.shapes.iter().filter(|s| s.origin == ShapeOrigin::Inserted) {
                let Some((file, geometry)) = inserted_picture(shape) else {
                    continue;
                };
                let bytes = std::fs::read(file).map_err(|source| DeckError::Picture {
                    path: file.to_path_buf(),
                    source,
                })?;
                let ext = picture_extension(file);
                let media = loop {
                    media_seq += 1;
                    let candidate = format!("ppt/media/certgen{media_seq}.{ext}");
                    if !self.entries.contains(&candidate) && !added.contains_key(&candidate) {
                        break candidate;
                    }
                };
                let rel_id = format!("rId{next_rel}");
                next_rel += 1;
                rels = insert_before_close(
                    &rels,
                    "</Relationships>",
                    &format!(
                        r#"<Relationship Id="{rel_id}" Type="{REL_TYPE_IMAGE}" Target="../media/{}"/>"#,
                        media.trim_start_matches("ppt/media/")
                    ),
                )
                .ok_or_else(|| DeckError::xml(&rels_path(&part.part), "no </Relationships>"))?;

                pictures.push(PictureElement {
                    id: next_id,
                    name: shape.name.clone(),
                    geometry,
                    rel_id,
                });
                next_id += 1;
                extensions.insert(ext.to_string());
                added.insert(media, bytes);
            }

            let xml = slide::render_slide(&part.part, &part.xml, slide, &pictures)?;
            replaced.insert(part.part.clone(), xml.into_bytes());
            if !pictures.is_empty() {
                let name = rels_path(&part.part);
                if self.entries.contains(&name) {
                    replaced.insert(name, rels.into_bytes());
                } else {
                    added.insert(name, rels.into_bytes());
                }
            }
        }

        let content_types = ensure_defaults(&self.content_types, &extensions)?;
        replaced.insert(CONTENT_TYPES.to_string(), content_types.into_bytes());

        self.write_zip(out.as_ref(), replaced, added)
    }

    fn write_zip(
        &self,
        out: &Path,
        mut replaced: BTreeMap<String, Vec<u8>>,
        added: BTreeMap<String, Vec<u8>>,
    ) -> Result<(), DeckError> {
        let mut archive = ZipArchive::new(BufReader::new(File::open(&self.source)?))?;
        let mut writer = ZipWriter::new(File::create(out)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            match replaced.remove(&name) {
                Some(bytes) => {
                    drop(entry);
                    writer.start_file(name, options)?;
                    writer.write_all(&bytes)?;
                }
                None => writer.raw_copy_file(entry)?,
            }
        }
        for (name, bytes) in added {
            writer.start_file(name, options)?;
            writer.write_all(&bytes)?;
        }
        writer.finish()?;
        Ok(())
    }
}

fn inserted_picture(shape: &Shape) -> Option<(&Path, super::model::Geometry)> {
    match (&shape.kind, shape.geometry) {
        (ShapeKind::Picture(PictureSource::File(path)), Some(g)) => Some((path.as_path(), g)),
        _ => None,
    }
}

fn picture_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "jpeg",
        _ => "png",
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpeg" => "image/jpeg",
        _ => "image/png",
    }
}

/// Add a `<Default>` content type for each extension that lacks one.
fn ensure_defaults(content_types: &str, extensions: &BTreeSet<String>) -> Result<String, DeckError> {
    let mut out = content_types.to_string();
    for ext in extensions {
        let pattern = format!(r#"(?i)<Default\s[^>]*Extension="{}""#, regex::escape(ext));
        let present = Regex::new(&pattern)
            .map(|re| re.is_match(&out))
            .unwrap_or(false);
        if !present {
            let default = format!(
                r#"<Default Extension="{ext}" ContentType="{}"/>"#,
                content_type_for(ext)
            );
            out = insert_before_close(&out, "</Types>", &default)
                .ok_or_else(|| DeckError::xml(CONTENT_TYPES, "no </Types>"))?;
        }
    }
    Ok(out)
}

fn insert_before_close(xml: &str, close: &str, fragment: &str) -> Option<String> {
    let at = xml.rfind(close)?;
    let mut out = String::with_capacity(xml.len() + fragment.len());
    out.push_str(&xml[..at]);
    out.push_str(fragment);
    out.push_str(&xml[at..]);
    Some(out)
}

fn next_rel_id(rels: &str) -> u32 {
    REL_ID
        .captures_iter(rels)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, DeckError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DeckError::MissingPart(name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    let mut s = String::new();
    entry
        .read_to_string(&mut s)
        .map_err(|e| DeckError::xml(name, e))?;
    Ok(s)
}

/// Slides in presentation order: `p:sldIdLst` resolved through the
/// presentation relationships, or `slideN.xml` numbering when those parts
/// are absent.
fn slide_order<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    entries: &BTreeSet<String>,
) -> Result<Vec<String>, DeckError> {
    if entries.contains(PRESENTATION) && entries.contains(PRESENTATION_RELS) {
        let rels = read_part(archive, PRESENTATION_RELS)?;
        let targets: HashMap<String, String> = relationships(PRESENTATION_RELS, &rels)?
            .into_iter()
            .filter(|r| r.kind == REL_TYPE_SLIDE)
            .map(|r| (r.id, resolve_target("ppt", &r.target)))
            .collect();
        let presentation = read_part(archive, PRESENTATION)?;
        let order: Vec<String> = slide_rel_ids(&presentation)?
            .into_iter()
            .filter_map(|id| targets.get(&id).cloned())
            .filter(|part| entries.contains(part))
            .collect();
        if !order.is_empty() {
            return Ok(order);
        }
    }

    let mut numbered: Vec<(u32, String)> = entries
        .iter()
        .filter_map(|name| {
            SLIDE_PART
                .captures(name)
                .and_then(|c| c[1].parse().ok())
                .map(|n| (n, name.clone()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

#[derive(Debug)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn relationships(part: &str, xml: &str) -> Result<Vec<Relationship>, DeckError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event().map_err(|e| DeckError::xml(part, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let get = |key: &str| {
                    e.try_get_attribute(key)
                        .ok()
                        .flatten()
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.into_owned())
                        .unwrap_or_default()
                };
                rels.push(Relationship {
                    id: get("Id"),
                    kind: get("Type"),
                    target: get("Target"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn slide_rel_ids(presentation: &str) -> Result<Vec<String>, DeckError> {
    let mut reader = Reader::from_str(presentation);
    let mut ids = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|e| DeckError::xml(PRESENTATION, e))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some())
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Resolve a relationship target relative to the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
