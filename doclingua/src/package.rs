//! Zip package helpers shared by the docx and pptx readers
//!
//! Office documents are zip archives of XML parts. Reading pulls single parts
//! out by name; writing replaces one part and copies every other entry raw,
//! so compressed bytes, ordering and metadata of untouched parts survive.

use crate::error::{DocError, DocResult};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Fallback location of the main document part
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

const PACKAGE_RELS_PART: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

fn open(bytes: &[u8]) -> DocResult<ZipArchive<Cursor<&[u8]>>> {
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Read a part by name, returning `None` when the package has no such entry
pub fn read_part(bytes: &[u8], name: &str) -> DocResult<Option<Vec<u8>>> {
    let mut archive = open(bytes)?;
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| DocError::InvalidPackage(format!("Failed to read '{}': {}", name, e)))?;
    Ok(Some(content))
}

/// Names of every entry in the package, in archive order
pub fn part_names(bytes: &[u8]) -> DocResult<Vec<String>> {
    let archive = open(bytes)?;
    Ok(archive.file_names().map(|name| name.to_string()).collect())
}

/// Locate the main document part through the package relationships
///
/// Falls back to `word/document.xml` when `_rels/.rels` is absent or does not
/// name an office document.
pub fn main_document_part(bytes: &[u8]) -> DocResult<String> {
    let Some(rels) = read_part(bytes, PACKAGE_RELS_PART)? else {
        return Ok(DEFAULT_DOCUMENT_PART.to_string());
    };
    let rels = String::from_utf8_lossy(&rels);

    let mut reader = Reader::from_str(&rels);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let rel_type = e
                    .try_get_attribute("Type")
                    .ok()
                    .flatten()
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if !rel_type.is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL)) {
                    continue;
                }
                let target = e
                    .try_get_attribute("Target")
                    .ok()
                    .flatten()
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(target) = target {
                    return Ok(target.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocError::MalformedXml {
                    part: PACKAGE_RELS_PART.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(DEFAULT_DOCUMENT_PART.to_string())
}

/// Produce a new package where `name` holds `content` and every other entry
/// is copied without recompression
pub fn replace_part(bytes: &[u8], name: &str, content: &[u8]) -> DocResult<Vec<u8>> {
    let mut archive = open(bytes)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut replaced = false;

    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        if file.name() == name {
            drop(file);
            writer
                .start_file(name, deflated())
                .map_err(|e| DocError::Write(e.to_string()))?;
            writer
                .write_all(content)
                .map_err(|e| DocError::Write(e.to_string()))?;
            replaced = true;
        } else {
            writer
                .raw_copy_file(file)
                .map_err(|e| DocError::Write(e.to_string()))?;
        }
    }

    if !replaced {
        return Err(DocError::MissingPart(name.to_string()));
    }

    let cursor = writer.finish().map_err(|e| DocError::Write(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Build a minimal, valid `.docx` package around the given main document XML
pub fn build_package(document_xml: &str) -> DocResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        (PACKAGE_RELS_PART, PACKAGE_RELS_XML),
        (DEFAULT_DOCUMENT_PART, document_xml),
    ];

    for (name, content) in parts {
        writer
            .start_file(name, deflated())
            .map_err(|e| DocError::Write(e.to_string()))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| DocError::Write(e.to_string()))?;
    }

    let cursor = writer.finish().map_err(|e| DocError::Write(e.to_string()))?;
    Ok(cursor.into_inner())
}
