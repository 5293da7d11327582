//! Word and PowerPoint packages: zip containers of XML parts.

use crate::error::ExtractionError;
use crate::models::FileFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::warn;
use zip::ZipArchive;

type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn open_package(bytes: &[u8], format: FileFormat) -> Result<Package<'_>, ExtractionError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|error| ExtractionError::malformed(format, error))
}

fn read_part(
    package: &mut Package<'_>,
    name: &str,
    format: FileFormat,
) -> Result<String, ExtractionError> {
    let mut part = package
        .by_name(name)
        .map_err(|error| ExtractionError::malformed(format, format!("{name}: {error}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Body paragraphs of `word/document.xml`, one line each. Paragraphs inside tables are not part
/// of the body sequence and are left out.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut package = open_package(bytes, FileFormat::Docx)?;
    let xml = read_part(&mut package, "word/document.xml", FileFormat::Docx)?;
    let paragraphs = body_paragraphs(&xml)
        .map_err(|error| ExtractionError::malformed(FileFormat::Docx, error))?;
    Ok(paragraphs.join("\n"))
}

fn body_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut table_depth = 0usize;
    let mut paragraph_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"tbl" => table_depth += 1,
                b"p" => paragraph_depth += 1,
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                b"tab" if run_depth > 0 => current.push('\t'),
                b"br" | b"cr" if run_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"p" if paragraph_depth == 0 && table_depth == 0 => paragraphs.push(String::new()),
                b"tab" if run_depth > 0 => current.push('\t'),
                b"br" | b"cr" if run_depth > 0 => current.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text => current.push_str(&text.unescape()?),
            Event::End(element) => match element.local_name().as_ref() {
                b"tbl" => table_depth = table_depth.saturating_sub(1),
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                b"p" => {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    if paragraph_depth == 0 {
                        let text = std::mem::take(&mut current);
                        if table_depth == 0 {
                            paragraphs.push(text);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Slides in presentation order; each top-level `p:sp` shape contributes one entry, an empty one
/// when the shape has no text body. Slides that cannot be found or parsed are skipped.
pub fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let malformed = |error: quick_xml::Error| ExtractionError::malformed(FileFormat::Pptx, error);

    let mut package = open_package(bytes, FileFormat::Pptx)?;
    let presentation = read_part(&mut package, "ppt/presentation.xml", FileFormat::Pptx)?;
    let relationships = read_part(
        &mut package,
        "ppt/_rels/presentation.xml.rels",
        FileFormat::Pptx,
    )?;

    let slide_ids = slide_relationship_ids(&presentation).map_err(malformed)?;
    let targets = relationship_targets(&relationships).map_err(malformed)?;

    let mut entries = Vec::new();
    for (index, relationship_id) in slide_ids.iter().enumerate() {
        let slide_number = index + 1;
        let Some(target) = targets.get(relationship_id) else {
            warn!(slide = slide_number, %relationship_id, "slide relationship is missing");
            continue;
        };

        let part_name = resolve_part_name("ppt", target);
        let texts = read_part(&mut package, &part_name, FileFormat::Pptx)
            .and_then(|xml| slide_shape_texts(&xml).map_err(malformed));

        match texts {
            Ok(texts) => entries.extend(texts),
            Err(error) => warn!(slide = slide_number, %error, "skipping unreadable slide"),
        }
    }

    Ok(entries.join("\n"))
}

fn slide_relationship_ids(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sldId" =>
            {
                if let Some(id) = relationship_attribute(&element)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

/// The namespaced `r:id` attribute; the unprefixed `id` on `sldId` is a numeric slide id.
fn relationship_attribute(element: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == b"id" && attribute.key.prefix().is_some() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attribute in element.attributes() {
                    let attribute = attribute?;
                    match attribute.key.as_ref() {
                        b"Id" => id = Some(attribute.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attribute.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

fn resolve_part_name(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

struct ShapeText {
    depth: usize,
    paragraphs: Vec<String>,
    current: String,
    in_text: bool,
}

impl ShapeText {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            paragraphs: Vec::new(),
            current: String::new(),
            in_text: false,
        }
    }

    fn open(&mut self, name: &[u8]) {
        match name {
            b"p" => self.current.clear(),
            b"t" => self.in_text = true,
            b"br" => self.current.push('\n'),
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        match name {
            b"p" => self.paragraphs.push(String::new()),
            b"br" => self.current.push('\n'),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => {
                let paragraph = std::mem::take(&mut self.current);
                self.paragraphs.push(paragraph);
            }
            _ => {}
        }
    }
}

fn slide_shape_texts(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut texts = Vec::new();
    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut shape: Option<ShapeText> = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                let name = element.local_name();
                if let Some(active) = shape.as_mut() {
                    active.open(name.as_ref());
                } else if name.as_ref() == b"spTree" && tree_depth.is_none() {
                    tree_depth = Some(depth);
                } else if name.as_ref() == b"sp" && tree_depth.map(|tree| tree + 1) == Some(depth) {
                    shape = Some(ShapeText::new(depth));
                }
            }
            Event::Empty(element) => {
                if let Some(active) = shape.as_mut() {
                    active.empty(element.local_name().as_ref());
                }
            }
            Event::Text(text) => {
                if let Some(active) = shape.as_mut().filter(|active| active.in_text) {
                    active.current.push_str(&text.unescape()?);
                }
            }
            Event::End(element) => {
                let name = element.local_name();
                let closes_shape = name.as_ref() == b"sp"
                    && shape.as_ref().is_some_and(|active| active.depth == depth);

                if closes_shape {
                    if let Some(finished) = shape.take() {
                        texts.push(finished.paragraphs.join("\n"));
                    }
                } else if let Some(active) = shape.as_mut() {
                    active.close(name.as_ref());
                } else if name.as_ref() == b"spTree" && tree_depth == Some(depth) {
                    tree_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(texts)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{docx_package, pptx_package, pptx_parts, text_shape, zip_package};
    use super::{extract_docx, extract_pptx, resolve_part_name};

    #[test]
    fn docx_keeps_body_paragraphs_and_blank_lines() {
        let body = concat!(
            r#"<w:p><w:r><w:t>Quarterly report</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>"#,
            r#"<w:r><w:t xml:space="preserve">Revenue </w:t></w:r><w:r><w:t>grew</w:t><w:tab/><w:t>fast &amp; steady</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell text</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:r><w:t>Closing</w:t><w:br/><w:t>remarks</w:t></w:r></w:p>"#,
            r#"<w:sectPr/>"#,
        );
        let bytes = docx_package(body);

        let text = extract_docx(&bytes).expect("docx should be readable");

        assert_eq!(
            text,
            "Quarterly report\n\nRevenue grew\tfast & steady\nClosing\nremarks"
        );
    }

    #[test]
    fn docx_without_paragraph_text_is_empty_lines_only() {
        let bytes = docx_package("<w:p/><w:sectPr/>");
        assert_eq!(extract_docx(&bytes).expect("blank docx"), "");
    }

    #[test]
    fn docx_missing_document_part_is_rejected() {
        let bytes = super::fixtures::zip_package(&[("other.xml".to_string(), "<a/>".to_string())]);
        let error = extract_docx(&bytes).expect_err("document.xml is required");
        assert!(error.to_string().contains("word/document.xml"));
    }

    #[test]
    fn pptx_follows_presentation_order_and_top_level_shapes() {
        let title = text_shape(2, &["Roadmap"]);
        let bullets = text_shape(3, &["Ship beta", "", "Collect feedback"]);
        let grouped = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="4" name="Group"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>"#,
            text_shape(5, &["inside group"])
        );
        let no_body = r#"<p:sp><p:nvSpPr><p:cNvPr id="6" name="Line"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#;
        let first_slide = format!("{title}{grouped}{no_body}{bullets}");
        let second_slide = text_shape(7, &["Thanks"]);

        let bytes = pptx_package(&[
            ("rId3", "slide2.xml", first_slide.as_str()),
            ("rId2", "slide1.xml", second_slide.as_str()),
        ]);

        let text = extract_pptx(&bytes).expect("pptx should be readable");

        assert_eq!(text, "Roadmap\n\nShip beta\n\nCollect feedback\nThanks");
    }

    #[test]
    fn pptx_skips_slides_whose_part_is_missing_or_broken() {
        let first = text_shape(2, &["Kept first"]);
        let broken = "<p:sp><p:txBody></p:sp>";
        let last = text_shape(3, &["Kept last"]);
        let parts = pptx_parts(&[
            ("rId2", "slide1.xml", first.as_str()),
            ("rId3", "slide2.xml", text_shape(4, &["lost"]).as_str()),
            ("rId4", "slide3.xml", broken),
            ("rId5", "slide4.xml", last.as_str()),
        ])
        .into_iter()
        .filter(|(name, _)| name != "ppt/slides/slide2.xml")
        .collect::<Vec<_>>();

        let text = extract_pptx(&zip_package(&parts)).expect("remaining slides extract");

        assert_eq!(text, "Kept first\nKept last");
    }

    #[test]
    fn pptx_skips_slide_ids_without_relationship() {
        let kept = text_shape(2, &["Agenda"]);
        let parts = pptx_parts(&[
            ("rId2", "slide1.xml", kept.as_str()),
            ("rId9", "slide2.xml", text_shape(3, &["orphan"]).as_str()),
        ])
        .into_iter()
        .map(|(name, content)| {
            if name == "ppt/_rels/presentation.xml.rels" {
                let orphan = format!(
                    r#"<Relationship Id="rId9" Type="{}/slide" Target="slides/slide2.xml"/>"#,
                    super::fixtures::REL_NS
                );
                (name, content.replace(&orphan, ""))
            } else {
                (name, content)
            }
        })
        .collect::<Vec<_>>();

        let text = extract_pptx(&zip_package(&parts)).expect("remaining slides extract");

        assert_eq!(text, "Agenda");
    }

    #[test]
    fn pptx_line_breaks_stay_inside_one_entry() {
        let shape = r#"<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>Line one</a:t></a:r><a:br/><a:r><a:t>Line two</a:t></a:r></a:p></p:txBody></p:sp>"#;
        let bytes = pptx_package(&[("rId2", "slide1.xml", shape)]);

        assert_eq!(extract_pptx(&bytes).expect("pptx"), "Line one\nLine two");
    }

    #[test]
    fn pptx_without_slides_is_empty() {
        let bytes = pptx_package(&[]);
        assert_eq!(extract_pptx(&bytes).expect("empty deck"), "");
    }

    #[test]
    fn part_names_resolve_relative_and_absolute_targets() {
        assert_eq!(resolve_part_name("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_part_name("ppt/slides", "../media/a.png"), "ppt/media/a.png");
        assert_eq!(resolve_part_name("ppt", "/ppt/slides/slide9.xml"), "ppt/slides/slide9.xml");
    }
}
