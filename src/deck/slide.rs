//! Slide XML (`ppt/slides/slideN.xml`) reading and rewriting.
//!
//! Both directions walk the same event stream with the same depth rules, so a
//! shape's [`ShapeOrigin::Template`] index always names the same element:
//!
//! * shapes are the element children of `p:spTree` whose local name is one
//!   of [`SHAPE_ELEMENTS`]; group contents are not descended into
//! * geometry is the first `xfrm` that is a child or grandchild of the shape
//! * text is `txBody/p/r/t`; fields (`a:fld`) and breaks are not runs
//!
//! Rewriting streams the original events through unchanged except for run
//! text, removed shapes and pictures appended after the last shape of
//! `p:spTree` (before its `p:extLst`, which must stay the last child).

use super::model::{
    Geometry, Paragraph, PictureSource, PlaceholderKind, Run, Shape, ShapeKind, ShapeOrigin, Slide,
    TextBody,
};
use crate::error::DeckError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::collections::HashMap;

/// Local names of `p:spTree` children that are shapes.
pub const SHAPE_ELEMENTS: &[&[u8]] = &[b"sp", b"pic", b"graphicFrame", b"grpSp", b"cxnSp"];

/// A slide as parsed, plus the largest shape id used anywhere in its XML
/// (including inside groups, which the model does not descend into).
#[derive(Debug, Clone)]
pub struct ParsedSlide {
    pub slide: Slide,
    pub max_shape_id: u32,
}

/// A picture ready to be written: final shape id and relationship id.
#[derive(Debug, Clone)]
pub struct PictureElement {
    pub id: u32,
    pub name: String,
    pub geometry: Geometry,
    pub rel_id: String,
}

fn is_shape(local: &[u8]) -> bool {
    SHAPE_ELEMENTS.contains(&local)
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn attr_i64(e: &BytesStart<'_>, key: &str) -> Option<i64> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// In-progress state for the shape being read.
struct ShapeScan {
    depth: usize,
    index: usize,
    local: Vec<u8>,
    id: Option<u32>,
    name: Option<String>,
    placeholder: Option<PlaceholderKind>,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,
    xfrm_depth: Option<usize>,
    geometry_done: bool,
    text: Option<TextBody>,
    tx_depth: Option<usize>,
    in_run: bool,
    in_t: bool,
}

impl ShapeScan {
    fn new(depth: usize, index: usize, local: &[u8]) -> Self {
        Self {
            depth,
            index,
            local: local.to_vec(),
            id: None,
            name: None,
            placeholder: None,
            offset: None,
            extent: None,
            xfrm_depth: None,
            geometry_done: false,
            text: None,
            tx_depth: None,
            in_run: false,
            in_t: false,
        }
    }

    /// Handle a start or empty element at `depth` inside this shape.
    fn element(&mut self, e: &BytesStart<'_>, depth: usize, empty: bool) {
        let local = e.local_name();
        let local = local.as_ref();
        let rel = depth - self.depth;

        match local {
            b"cNvPr" if self.id.is_none() => {
                self.id = attr(e, "id").and_then(|v| v.parse().ok());
                self.name = attr(e, "name");
            }
            b"ph" if self.placeholder.is_none() => {
                self.placeholder = Some(match attr(e, "type") {
                    Some(t) if t == "pic" => PlaceholderKind::Picture,
                    other => PlaceholderKind::Other(other),
                });
            }
            b"xfrm" if !empty && !self.geometry_done && (rel == 1 || rel == 2) => {
                self.xfrm_depth = Some(depth);
            }
            b"off" if self.xfrm_depth == Some(depth - 1) => {
                if let (Some(x), Some(y)) = (attr_i64(e, "x"), attr_i64(e, "y")) {
                    self.offset = Some((x, y));
                }
            }
            b"ext" if self.xfrm_depth == Some(depth - 1) => {
                if let (Some(cx), Some(cy)) = (attr_i64(e, "cx"), attr_i64(e, "cy")) {
                    self.extent = Some((cx, cy));
                }
            }
            b"txBody" if rel == 1 && self.local == b"sp" => {
                self.text = Some(TextBody::default());
                if !empty {
                    self.tx_depth = Some(depth);
                }
            }
            _ => {}
        }

        let Some(tx) = self.tx_depth else { return };
        let Some(body) = self.text.as_mut() else { return };
        match local {
            b"p" if depth == tx + 1 => body.paragraphs.push(Paragraph::default()),
            b"r" if depth == tx + 2 => {
                if let Some(p) = body.paragraphs.last_mut() {
                    p.runs.push(Run::default());
                    self.in_run = !empty;
                }
            }
            b"t" if depth == tx + 3 && self.in_run => self.in_t = !empty,
            _ => {}
        }
    }

    fn text(&mut self, s: &str) {
        if !self.in_t {
            return;
        }
        if let Some(run) = self
            .text
            .as_mut()
            .and_then(|b| b.paragraphs.last_mut())
            .and_then(|p| p.runs.last_mut())
        {
            run.text.push_str(s);
        }
    }

    fn end(&mut self, local: &[u8], depth: usize) {
        match local {
            b"xfrm" if self.xfrm_depth == Some(depth) => {
                self.xfrm_depth = None;
                self.geometry_done = true;
            }
            b"txBody" if self.tx_depth == Some(depth) => self.tx_depth = None,
            b"r" => self.in_run = false,
            b"t" => self.in_t = false,
            _ => {}
        }
    }

    fn finish(self) -> Shape {
        let geometry = match (self.offset, self.extent) {
            (Some((left, top)), Some((width, height))) => Some(Geometry {
                left,
                top,
                width,
                height,
            }),
            _ => None,
        };
        let kind = match (self.local.as_slice(), self.text) {
            (b"sp", Some(body)) => ShapeKind::Text(body),
            (b"pic", _) => ShapeKind::Picture(PictureSource::Embedded),
            _ => ShapeKind::Other,
        };
        Shape {
            id: self.id.unwrap_or(0),
            name: self.name.unwrap_or_default(),
            origin: ShapeOrigin::Template(self.index),
            geometry,
            placeholder: self.placeholder,
            kind,
        }
    }
}

/// Parse the shapes of one slide part.
pub fn parse_slide(part: &str, xml: &str) -> Result<ParsedSlide, DeckError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut slide = Slide::default();
    let mut max_shape_id = 0u32;
    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut shape_count = 0usize;
    let mut current: Option<ShapeScan> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DeckError::xml(part, format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let el_depth = depth + 1;
                if !empty {
                    depth += 1;
                }
                let local = e.local_name();
                let local = local.as_ref();

                if local == b"cNvPr" {
                    if let Some(id) = attr(e, "id").and_then(|v| v.parse::<u32>().ok()) {
                        max_shape_id = max_shape_id.max(id);
                    }
                }

                if let Some(scan) = current.as_mut() {
                    scan.element(e, el_depth, empty);
                } else if local == b"spTree" && tree_depth.is_none() && !empty {
                    tree_depth = Some(el_depth);
                } else if tree_depth.map(|t| el_depth == t + 1).unwrap_or(false) && is_shape(local)
                {
                    let scan = ShapeScan::new(el_depth, shape_count, local);
                    shape_count += 1;
                    if empty {
                        slide.shapes.push(scan.finish());
                    } else {
                        current = Some(scan);
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some(scan) = current.as_mut() {
                    let s = t.unescape().map_err(|e| DeckError::xml(part, e))?;
                    scan.text(&s);
                }
            }
            Event::CData(ref c) => {
                if let Some(scan) = current.as_mut() {
                    scan.text(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::End(ref e) => {
                let el_depth = depth;
                depth = depth.saturating_sub(1);
                let local = e.local_name();
                let closes_shape = current.as_ref().map(|s| s.depth == el_depth).unwrap_or(false);
                if closes_shape {
                    if let Some(scan) = current.take() {
                        slide.shapes.push(scan.finish());
                    }
                } else if let Some(scan) = current.as_mut() {
                    scan.end(local.as_ref(), el_depth);
                } else if tree_depth == Some(el_depth) {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if tree_depth.is_none() {
        return Err(DeckError::xml(part, "no p:spTree element"));
    }

    Ok(ParsedSlide {
        slide,
        max_shape_id,
    })
}

/// Run-text cursor for the shape being rewritten.
struct TextCursor<'a> {
    body: &'a TextBody,
    tx_depth: Option<usize>,
    paragraph: Option<usize>,
    run: Option<usize>,
    in_run: bool,
}

impl<'a> TextCursor<'a> {
    fn current_text(&self) -> Option<&'a str> {
        let p = self.body.paragraphs.get(self.paragraph?)?;
        p.runs.get(self.run?).map(|r| r.text.as_str())
    }
}

struct RenderShape<'a> {
    depth: usize,
    text: Option<TextCursor<'a>>,
}

/// Rewrite one slide part from the model.
///
/// `slide` must come from [`parse_slide`] of the same `xml`; template shapes
/// missing from it are dropped, and `pictures` are appended to `p:spTree`
/// ahead of any tree-level `p:extLst`.
pub fn render_slide(
    part: &str,
    xml: &str,
    slide: &Slide,
    pictures: &[PictureElement],
) -> Result<String, DeckError> {
    let kept: HashMap<usize, &Shape> = slide
        .shapes
        .iter()
        .filter_map(|s| match s.origin {
            ShapeOrigin::Template(i) => Some((i, s)),
            ShapeOrigin::Inserted => None,
        })
        .collect();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 1024 * pictures.len()));
    let xml_err = |e| DeckError::xml(part, e);

    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut shape_count = 0usize;
    let mut skip_until: Option<usize> = None;
    let mut current: Option<RenderShape<'_>> = None;
    let mut replacing_t = false;
    let mut pictures_written = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DeckError::xml(part, format!("at byte {}: {e}", reader.buffer_position())))?;

        if let Some(stop) = skip_until {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == stop {
                        skip_until = None;
                    }
                    depth -= 1;
                }
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let el_depth = depth + 1;
                if !empty {
                    depth += 1;
                }
                let local = e.local_name();
                let local = local.as_ref();

                if current.is_none()
                    && tree_depth.map(|t| el_depth == t + 1).unwrap_or(false)
                    && is_shape(local)
                {
                    let index = shape_count;
                    shape_count += 1;
                    match kept.get(&index) {
                        None => {
                            if !empty {
                                skip_until = Some(el_depth);
                            }
                            continue;
                        }
                        Some(shape) if !empty => {
                            current = Some(RenderShape {
                                depth: el_depth,
                                text: shape.text_body().map(|body| TextCursor {
                                    body,
                                    tx_depth: None,
                                    paragraph: None,
                                    run: None,
                                    in_run: false,
                                }),
                            });
                        }
                        Some(_) => {}
                    }
                } else if local == b"spTree" && tree_depth.is_none() && !empty {
                    tree_depth = Some(el_depth);
                } else if current.is_none()
                    && local == b"extLst"
                    && tree_depth.map(|t| el_depth == t + 1).unwrap_or(false)
                {
                    if !pictures_written {
                        write_pictures(&mut writer, pictures);
                        pictures_written = true;
                    }
                } else if let Some(cursor) = current.as_mut().and_then(|c| {
                    let shape_depth = c.depth;
                    c.text.as_mut().map(|t| (shape_depth, t))
                }) {
                    let (shape_depth, cursor) = cursor;
                    match (local, cursor.tx_depth) {
                        (b"txBody", None) if el_depth == shape_depth + 1 && !empty => {
                            cursor.tx_depth = Some(el_depth);
                        }
                        (b"p", Some(tx)) if el_depth == tx + 1 => {
                            cursor.paragraph = Some(cursor.paragraph.map_or(0, |p| p + 1));
                            cursor.run = None;
                        }
                        (b"r", Some(tx)) if el_depth == tx + 2 => {
                            cursor.run = Some(cursor.run.map_or(0, |r| r + 1));
                            cursor.in_run = !empty;
                        }
                        (b"t", Some(tx)) if el_depth == tx + 3 && cursor.in_run => {
                            if let Some(text) = cursor.current_text() {
                                if empty {
                                    if !text.is_empty() {
                                        writer
                                            .write_event(Event::Start(e.to_owned()))
                                            .map_err(xml_err)?;
                                        writer
                                            .write_event(Event::Text(BytesText::new(text)))
                                            .map_err(xml_err)?;
                                        writer
                                            .write_event(Event::End(e.to_end()))
                                            .map_err(xml_err)?;
                                        continue;
                                    }
                                } else {
                                    writer.write_event(Event::Start(e.to_owned())).map_err(xml_err)?;
                                    if !text.is_empty() {
                                        writer
                                            .write_event(Event::Text(BytesText::new(text)))
                                            .map_err(xml_err)?;
                                    }
                                    replacing_t = true;
                                    continue;
                                }
                            }
                        }
                        _ => {}
                    }
                }
                writer.write_event(event).map_err(xml_err)?;
            }
            Event::Text(_) | Event::CData(_) if replacing_t => {}
            Event::End(ref e) => {
                let el_depth = depth;
                depth = depth.saturating_sub(1);
                let local = e.local_name();
                let local = local.as_ref();

                if replacing_t && local == b"t" {
                    replacing_t = false;
                }
                if let Some(shape) = current.as_mut() {
                    if shape.depth == el_depth {
                        current = None;
                    } else if let Some(cursor) = shape.text.as_mut() {
                        if local == b"r" {
                            cursor.in_run = false;
                        } else if local == b"txBody" && cursor.tx_depth == Some(el_depth) {
                            cursor.tx_depth = None;
                        }
                    }
                } else if tree_depth == Some(el_depth) && !pictures_written {
                    write_pictures(&mut writer, pictures);
                    pictures_written = true;
                }
                writer.write_event(event).map_err(xml_err)?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(xml_err)?,
        }
    }

    if tree_depth.is_none() {
        return Err(DeckError::xml(part, "no p:spTree element"));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| DeckError::xml(part, e))
}

fn write_pictures(writer: &mut Writer<Vec<u8>>, pictures: &[PictureElement]) {
    for picture in pictures {
        writer
            .get_mut()
            .extend_from_slice(picture_xml(picture).as_bytes());
    }
}

/// `p:pic` element for an inserted picture, stretched over its frame.
pub fn picture_xml(picture: &PictureElement) -> String {
    let g = &picture.geometry;
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{name}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id = picture.id,
        name = escape(picture.name.as_str()),
        rel = escape(picture.rel_id.as_str()),
        x = g.left,
        y = g.top,
        cx = g.width,
        cy = g.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Name"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr b="1"/><a:t>{{ful</a:t></a:r><a:r><a:t>lName}}</a:t></a:r></a:p><a:p><a:r><a:t>A &amp; B</a:t></a:r><a:br/><a:fld id="x"><a:t>7</a:t></a:fld></a:p></p:txBody></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="qr"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="914400" y="1828800"/><a:ext cx="914400" cy="457200"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>QR</a:t></a:r></a:p></p:txBody></p:sp><p:grpSp><p:nvGrpSpPr><p:cNvPr id="9" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/><a:chOff x="0" y="0"/><a:chExt cx="3" cy="4"/></a:xfrm></p:grpSpPr><p:sp><p:nvSpPr><p:cNvPr id="10" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp></p:grpSp><p:sp><p:nvSpPr><p:cNvPr id="4" name="Photo"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn parses_shapes_geometry_and_runs() {
        let parsed = parse_slide("slide1.xml", SLIDE).unwrap();
        let shapes = &parsed.slide.shapes;
        assert_eq!(shapes.len(), 4);
        assert_eq!(parsed.max_shape_id, 10);

        let name = &shapes[0];
        assert_eq!(name.name, "Name");
        assert_eq!(
            name.geometry,
            Some(Geometry {
                left: 100,
                top: 200,
                width: 300,
                height: 400
            })
        );
        let body = name.text_body().unwrap();
        assert_eq!(body.paragraphs.len(), 2);
        assert_eq!(body.paragraphs[0].runs.len(), 2);
        assert_eq!(body.paragraphs[0].text(), "{{fullName}}");
        // fields are not runs
        assert_eq!(body.paragraphs[1].text(), "A & B");

        assert_eq!(shapes[1].name, "qr");
        assert_eq!(shapes[2].name, "Group");
        assert_eq!(shapes[2].kind, ShapeKind::Other);
        assert_eq!(shapes[2].geometry.map(|g| g.width), Some(3));
        assert!(shapes[3].is_picture_placeholder());
        assert!(!shapes[3].has_geometry());
    }

    #[test]
    fn unchanged_model_round_trips_text() {
        let parsed = parse_slide("slide1.xml", SLIDE).unwrap();
        let out = render_slide("slide1.xml", SLIDE, &parsed.slide, &[]).unwrap();
        let again = parse_slide("slide1.xml", &out).unwrap();
        assert_eq!(again.slide, parsed.slide);
        assert!(out.contains("A &amp; B"));
        assert!(out.contains(r#"<a:rPr b="1"/>"#));
    }

    #[test]
    fn rewrites_runs_and_drops_removed_shape() {
        let mut slide = parse_slide("slide1.xml", SLIDE).unwrap().slide;
        if let ShapeKind::Text(body) = &mut slide.shapes[0].kind {
            body.paragraphs[0].collapse_into_first_run("Alice <Smith>".into());
        }
        slide.shapes.remove(1);
        let picture = PictureElement {
            id: 11,
            name: "QR Code".into(),
            geometry: Geometry {
                left: 914400,
                top: 1828800,
                width: 914400,
                height: 914400,
            },
            rel_id: "rId7".into(),
        };

        let out = render_slide("slide1.xml", SLIDE, &slide, &[picture]).unwrap();
        assert!(out.contains("Alice &lt;Smith&gt;"));
        assert!(!out.contains("lName}}"));
        assert!(!out.contains(r#"name="qr""#));
        assert!(out.contains(r#"<a:blip r:embed="rId7"/>"#));
        assert!(out.contains(r#"</p:pic></p:spTree>"#));

        let reparsed = parse_slide("slide1.xml", &out).unwrap().slide;
        let names: Vec<_> = reparsed.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Group", "Photo", "QR Code"]);
        assert_eq!(
            reparsed.shapes[0].text_body().unwrap().paragraphs[0].text(),
            "Alice <Smith>"
        );
        assert_eq!(reparsed.shapes[3].geometry.map(|g| g.height), Some(914400));
    }

    #[test]
    fn pictures_go_before_tree_extension_list() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="T"/></p:nvSpPr><p:spPr><a:extLst><a:ext uri="shape"/></a:extLst></p:spPr></p:sp><p:extLst><p:ext uri="tree"/></p:extLst></p:spTree></p:cSld></p:sld>"#;
        let slide = parse_slide("s", xml).unwrap().slide;
        let picture = PictureElement {
            id: 3,
            name: "QR Code".into(),
            geometry: Geometry {
                left: 0,
                top: 0,
                width: 10,
                height: 10,
            },
            rel_id: "rId2".into(),
        };

        let out = render_slide("s", xml, &slide, &[picture]).unwrap();
        assert_eq!(out.matches("<p:pic>").count(), 1);
        assert!(out.contains(r#"</p:pic><p:extLst><p:ext uri="tree"/></p:extLst></p:spTree>"#), "got: {out}");
        assert!(out.find("<p:pic>") > out.find(r#"uri="shape""#));

        let reparsed = parse_slide("s", &out).unwrap().slide;
        let names: Vec<_> = reparsed.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["T", "QR Code"]);
    }

    #[test]
    fn empty_text_element_receives_text() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="T"/></p:nvSpPr><p:txBody><a:p><a:r><a:t/></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;
        let mut slide = parse_slide("s", xml).unwrap().slide;
        if let ShapeKind::Text(body) = &mut slide.shapes[0].kind {
            body.paragraphs[0].runs[0].text = "filled".into();
        }
        let out = render_slide("s", xml, &slide, &[]).unwrap();
        assert!(out.contains("<a:t>filled</a:t>"), "got: {out}");
    }

    #[test]
    fn missing_shape_tree_is_an_error() {
        let err = parse_slide("s", "<p:sld xmlns:p=\"p\"/>").unwrap_err();
        assert!(err.to_string().contains("spTree"));
    }
}
