//! Best-effort plain-text extraction for formats that are not reassembled
//!
//! PDFs and slide decks are flattened to UTF-8 text; their layout is not
//! preserved. Word-processor documents can be flattened too, for callers that
//! only want the text.

use crate::docx::DocxDocument;
use crate::error::{DocError, DocResult};
use crate::package;
use quick_xml::Reader;
use quick_xml::events::Event;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Extract the text layer of a PDF
///
/// Page breaks (form feeds) become blank lines.
pub fn pdf_text(bytes: &[u8]) -> DocResult<String> {
    let head = &bytes[..bytes.len().min(1024)];
    if !head.windows(5).any(|w| w == b"%PDF-") {
        return Err(DocError::Pdf("missing %PDF- header".to_string()));
    }

    // The parser can panic on damaged cross-reference tables.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| DocError::Pdf("parser aborted on damaged file".to_string()))?
        .map_err(|e| DocError::Pdf(e.to_string()))?;
    Ok(text.replace('\x0C', "\n\n").trim().to_string())
}

/// Extract the text of every slide, in slide order
///
/// Each DrawingML paragraph becomes one line; slides are separated by a
/// blank line.
pub fn slide_text(bytes: &[u8]) -> DocResult<String> {
    let mut slides: Vec<(u32, String)> = package::part_names(bytes)?
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    if slides.is_empty() {
        return Err(DocError::MissingPart(format!("{}*.xml", SLIDE_PREFIX)));
    }
    slides.sort_by_key(|(number, _)| *number);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = package::read_part(bytes, &name)?.unwrap_or_default();
        let text = drawing_text(&String::from_utf8_lossy(&xml), &name)?;
        if !text.is_empty() {
            texts.push(text);
        }
    }
    Ok(texts.join("\n\n"))
}

/// Flatten a word-processor document into one line per non-empty paragraph,
/// in fragment order
pub fn docx_text(bytes: &[u8]) -> DocResult<String> {
    let document = DocxDocument::parse(bytes)?;
    let lines: Vec<String> = document.fragments().into_iter().map(|f| f.text).collect();
    Ok(lines.join("\n"))
}

/// `ppt/slides/slide12.xml` → 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn drawing_text(xml: &str, part: &str) -> DocResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"a:t" => in_text = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"a:t" => in_text = false,
            Ok(Event::End(e)) if e.name().as_ref() == b"a:p" => {
                if !line.trim().is_empty() {
                    lines.push(line.trim().to_string());
                }
                line.clear();
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"a:br" => line.push(' '),
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| DocError::MalformedXml {
                    part: part.to_string(),
                    message: e.to_string(),
                })?;
                line.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocError::MalformedXml {
                    part: part.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::tests::{docx_with_body, para, table};
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn slide(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:rPr lang=\"en-US\"/><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!(
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            body
        )
    }

    fn pptx(slides: &[(&str, String)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, xml) in slides {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_slide_text_orders_slides_numerically() {
        let bytes = pptx(&[
            ("ppt/slides/slide10.xml", slide(&["Ten"])),
            ("ppt/slides/slide2.xml", slide(&["Two", "Deux"])),
            ("ppt/slides/slide1.xml", slide(&["One"])),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>".to_string()),
        ]);

        assert_eq!(slide_text(&bytes).unwrap(), "One\n\nTwo\nDeux\n\nTen");
    }

    #[test]
    fn test_slide_text_unescapes() {
        let bytes = pptx(&[("ppt/slides/slide1.xml", slide(&["R&amp;D"]))]);
        assert_eq!(slide_text(&bytes).unwrap(), "R&D");
    }

    #[test]
    fn test_slide_text_without_slides() {
        let bytes = pptx(&[("ppt/presentation.xml", "<p:presentation/>".to_string())]);
        assert!(matches!(slide_text(&bytes), Err(DocError::MissingPart(_))));
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn test_pdf_text_rejects_garbage() {
        assert_eq!(
            pdf_text(b"not a pdf"),
            Err(DocError::Pdf("missing %PDF- header".to_string()))
        );
    }

    #[test]
    fn test_docx_text_uses_fragment_order() {
        let body = format!("{}{}{}", para("Hello"), table(&[&["Foo"]]), para("World"));
        assert_eq!(docx_text(&docx_with_body(&body)).unwrap(), "Hello\nWorld\nFoo");
    }
}
