//! Word-processor documents: parse, extract fragments, reassemble, write
//!
//! The main document part is kept as the exact stream of XML events it was
//! read from. Parsing builds a typed [`Node`] tree on the side and records,
//! for every paragraph, where its `w:t` runs live in that stream. Reassembly
//! registers rewrites against those positions; writing replays the stream and
//! substitutes only the rewritten runs, so everything else (paragraph and run
//! properties, bookmarks, section settings, untouched paragraphs) is emitted
//! as it was read.
//!
//! # Example
//!
//! ```ignore
//! let mut document = DocxDocument::parse(&bytes)?;
//! let fragments = document.fragments();
//! let translated: Vec<String> = fragments.iter().map(|f| f.text.to_uppercase()).collect();
//! document.reassemble(&fragments, &translated);
//! let output = document.to_bytes()?;
//! ```

use crate::error::{DocError, DocResult};
use crate::model::{Cell, Fragment, Node, ParagraphHandle, Row, Shape, Table, measure, walk_paragraphs};
use crate::package;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

const WORDPROCESSING_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Location of one `w:t` element in the event stream
#[derive(Debug, Clone, Copy)]
struct TextRun {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Default)]
struct ParagraphRecord {
    text: String,
    runs: Vec<TextRun>,
    /// Run-level `w:tab`/`w:br`/`w:cr` elements that contributed to `text`
    breaks: Vec<usize>,
}

/// Replacement for the events `start..=end`; `None` drops them
#[derive(Debug, Clone)]
struct Rewrite {
    end: usize,
    text: Option<String>,
}

/// A parsed `.docx` package owned by a single request
#[derive(Debug, Clone)]
pub struct DocxDocument {
    package: Vec<u8>,
    part_name: String,
    events: Vec<Event<'static>>,
    body: Vec<Node>,
    paragraphs: Vec<ParagraphRecord>,
    rewrites: BTreeMap<usize, Rewrite>,
}

impl DocxDocument {
    /// Parse a `.docx` package
    ///
    /// # Errors
    /// * `DocError::InvalidPackage` - the bytes are not a zip archive
    /// * `DocError::MissingPart` - the main document part is absent
    /// * `DocError::MalformedXml` - the main document part is not well-formed
    pub fn parse(bytes: &[u8]) -> DocResult<Self> {
        let part_name = package::main_document_part(bytes)?;
        let xml = package::read_part(bytes, &part_name)?
            .ok_or_else(|| DocError::MissingPart(part_name.clone()))?;
        let xml = String::from_utf8(xml).map_err(|e| DocError::MalformedXml {
            part: part_name.clone(),
            message: e.to_string(),
        })?;

        let (events, builder) = read_events(&xml, &part_name)?;
        debug!(
            part = %part_name,
            events = events.len(),
            paragraphs = builder.paragraphs.len(),
            "Parsed document part"
        );

        Ok(Self {
            package: bytes.to_vec(),
            part_name,
            events,
            body: builder.body,
            paragraphs: builder.paragraphs,
            rewrites: BTreeMap::new(),
        })
    }

    /// Build a new document holding `text` as a single paragraph
    ///
    /// Line breaks become `w:br` elements and tabs become `w:tab`, all within
    /// one run.
    pub fn from_plain_text(text: &str) -> DocResult<Self> {
        let mut writer = Writer::new(Vec::new());
        write_event(&mut writer, Event::Decl(quick_xml::events::BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let mut document = BytesStart::new("w:document");
        document.push_attribute(("xmlns:w", WORDPROCESSING_NS));
        write_event(&mut writer, Event::Start(document))?;
        write_event(&mut writer, Event::Start(BytesStart::new("w:body")))?;
        write_event(&mut writer, Event::Start(BytesStart::new("w:p")))?;
        write_event(&mut writer, Event::Start(BytesStart::new("w:r")))?;
        write_text_pieces(&mut writer, text)?;
        write_event(&mut writer, Event::End(BytesEnd::new("w:r")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("w:p")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("w:body")))?;
        write_event(&mut writer, Event::End(BytesEnd::new("w:document")))?;

        let xml = String::from_utf8(writer.into_inner()).map_err(|e| DocError::Write(e.to_string()))?;
        let bytes = package::build_package(&xml)?;
        Self::parse(&bytes)
    }

    /// Name of the main document part inside the package
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// Top-level body nodes
    pub fn body(&self) -> &[Node] {
        &self.body
    }

    /// Current text of a paragraph (reflects reassembly)
    ///
    /// # Panics
    /// Panics if the handle does not belong to this document.
    pub fn paragraph_text(&self, handle: ParagraphHandle) -> &str {
        &self.paragraphs[handle.0].text
    }

    /// Number of paragraphs, including empty ones
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Structural counts of the body tree
    pub fn shape(&self) -> Shape {
        let mut shape = Shape::default();
        measure(&self.body, &mut shape);
        shape
    }

    /// Ordered translatable fragments
    ///
    /// Top-level paragraphs come first, then tables in document order, each
    /// row top to bottom and each cell left to right. Paragraphs whose text
    /// is empty or whitespace are skipped and stay untouched on output.
    pub fn fragments(&self) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        walk_paragraphs(&self.body, &mut |handle| {
            let text = &self.paragraphs[handle.0].text;
            if !text.trim().is_empty() {
                fragments.push(Fragment::new(text.clone(), handle));
            }
        });
        fragments
    }

    /// Write translated texts back into the paragraphs the fragments refer to
    ///
    /// Each paragraph's first text run receives the whole translated string,
    /// its remaining runs are emptied, and its run-level tabs and breaks are
    /// re-emitted from the translated text. Paragraph and run properties are
    /// kept.
    ///
    /// # Panics
    /// Panics if `translated.len() != fragments.len()`, or if a fragment
    /// handle does not belong to this document. Both are caller bugs.
    pub fn reassemble(&mut self, fragments: &[Fragment], translated: &[String]) {
        assert_eq!(
            translated.len(),
            fragments.len(),
            "Translated text count must match fragment count"
        );

        for (fragment, text) in fragments.iter().zip(translated) {
            self.rewrite_paragraph(fragment.handle, text);
        }
    }

    fn rewrite_paragraph(&mut self, handle: ParagraphHandle, text: &str) {
        let record = &mut self.paragraphs[handle.0];
        let Some((first, rest)) = record.runs.split_first() else {
            return;
        };

        self.rewrites.insert(
            first.start,
            Rewrite {
                end: first.end,
                text: Some(text.to_string()),
            },
        );
        for run in rest {
            self.rewrites.insert(run.start, Rewrite { end: run.end, text: None });
        }
        for &index in &record.breaks {
            self.rewrites.insert(index, Rewrite { end: index, text: None });
        }
        record.text = text.to_string();
    }

    /// Whether any paragraph has been rewritten since parsing
    pub fn is_modified(&self) -> bool {
        !self.rewrites.is_empty()
    }

    /// Render the main document part, applying registered rewrites
    pub fn document_xml(&self) -> DocResult<String> {
        let mut writer = Writer::new(Vec::new());
        let mut index = 0;

        while index < self.events.len() {
            match self.rewrites.get(&index) {
                Some(rewrite) => {
                    if let Some(text) = &rewrite.text {
                        write_text_pieces(&mut writer, text)?;
                    }
                    index = rewrite.end + 1;
                }
                None => {
                    write_event(&mut writer, self.events[index].clone())?;
                    index += 1;
                }
            }
        }

        String::from_utf8(writer.into_inner()).map_err(|e| DocError::Write(e.to_string()))
    }

    /// Serialise the package
    ///
    /// An unmodified document returns its original bytes unchanged.
    pub fn to_bytes(&self) -> DocResult<Vec<u8>> {
        if !self.is_modified() {
            return Ok(self.package.clone());
        }
        let xml = self.document_xml()?;
        package::replace_part(&self.package, &self.part_name, xml.as_bytes())
    }
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> DocResult<()> {
    writer
        .write_event(event)
        .map_err(|e| DocError::Write(e.to_string()))
}

/// Emit `text` as `w:t` elements separated by `w:tab`/`w:br` elements
fn write_text_pieces<W: Write>(writer: &mut Writer<W>, text: &str) -> DocResult<()> {
    let mut piece = String::new();
    let mut wrote_text = false;

    for ch in text.chars() {
        let separator = match ch {
            '\t' => "w:tab",
            '\n' => "w:br",
            '\r' => continue,
            _ => {
                piece.push(ch);
                continue;
            }
        };
        if !piece.is_empty() {
            write_text_element(writer, &piece)?;
            piece.clear();
            wrote_text = true;
        }
        write_event(writer, Event::Empty(BytesStart::new(separator)))?;
    }

    if !piece.is_empty() || !wrote_text {
        write_text_element(writer, &piece)?;
    }
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, text: &str) -> DocResult<()> {
    let mut start = BytesStart::new("w:t");
    start.push_attribute(("xml:space", "preserve"));
    write_event(writer, Event::Start(start))?;
    if !text.is_empty() {
        write_event(writer, Event::Text(BytesText::new(text)))?;
    }
    write_event(writer, Event::End(BytesEnd::new("w:t")))
}

enum Frame {
    Table(Table),
    Row(Row),
    Cell(Cell),
}

/// Builds the node tree while the event stream is read
#[derive(Default)]
struct TreeBuilder {
    body: Vec<Node>,
    stack: Vec<Frame>,
    paragraphs: Vec<ParagraphRecord>,
    in_body: bool,
    saw_body: bool,
    /// Open `w:p` elements; only depth 1 paragraphs are translatable
    paragraph_depth: usize,
    run_depth: usize,
    open_text: Option<usize>,
}

impl TreeBuilder {
    fn current(&mut self) -> Option<&mut ParagraphRecord> {
        self.paragraphs.last_mut()
    }

    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(Frame::Cell(cell)) => cell.nodes.push(node),
            _ => self.body.push(node),
        }
    }

    fn open_paragraph(&mut self) -> ParagraphHandle {
        self.paragraphs.push(ParagraphRecord::default());
        ParagraphHandle(self.paragraphs.len() - 1)
    }

    fn start(&mut self, name: &[u8], index: usize) {
        if name == b"w:body" {
            self.in_body = true;
            self.saw_body = true;
            return;
        }
        if !self.in_body {
            return;
        }

        match name {
            b"w:p" => {
                self.paragraph_depth += 1;
                if self.paragraph_depth == 1 {
                    self.open_paragraph();
                }
            }
            b"w:r" if self.paragraph_depth == 1 => self.run_depth += 1,
            b"w:t" if self.paragraph_depth == 1 => self.open_text = Some(index),
            b"w:tbl" if self.paragraph_depth == 0 => self.stack.push(Frame::Table(Table::default())),
            b"w:tr" if self.paragraph_depth == 0 => self.stack.push(Frame::Row(Row::default())),
            b"w:tc" if self.paragraph_depth == 0 => self.stack.push(Frame::Cell(Cell::default())),
            _ => {}
        }
    }

    fn empty(&mut self, element: &BytesStart<'_>, index: usize) {
        if !self.in_body {
            return;
        }

        match element.name().as_ref() {
            b"w:p" if self.paragraph_depth == 0 => {
                let handle = self.open_paragraph();
                self.attach(Node::Paragraph(handle));
            }
            b"w:tab" if self.in_run() => self.push_break(index, '\t'),
            b"w:cr" if self.in_run() => self.push_break(index, '\n'),
            b"w:br" if self.in_run() && is_line_break(element) => self.push_break(index, '\n'),
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8], index: usize) {
        if name == b"w:body" {
            self.in_body = false;
            return;
        }
        if !self.in_body {
            return;
        }

        match name {
            b"w:p" => {
                if self.paragraph_depth == 1 {
                    let handle = ParagraphHandle(self.paragraphs.len() - 1);
                    self.attach(Node::Paragraph(handle));
                    self.run_depth = 0;
                }
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
            }
            b"w:r" if self.paragraph_depth == 1 => self.run_depth = self.run_depth.saturating_sub(1),
            b"w:t" if self.paragraph_depth == 1 => {
                if let Some(start) = self.open_text.take() {
                    if let Some(record) = self.current() {
                        record.runs.push(TextRun { start, end: index });
                    }
                }
            }
            b"w:tc" if self.paragraph_depth == 0 => {
                if let Some(Frame::Cell(cell)) = self.stack.pop() {
                    if let Some(Frame::Row(row)) = self.stack.last_mut() {
                        row.cells.push(cell);
                    }
                }
            }
            b"w:tr" if self.paragraph_depth == 0 => {
                if let Some(Frame::Row(row)) = self.stack.pop() {
                    if let Some(Frame::Table(table)) = self.stack.last_mut() {
                        table.rows.push(row);
                    }
                }
            }
            b"w:tbl" if self.paragraph_depth == 0 => {
                if let Some(Frame::Table(table)) = self.stack.pop() {
                    self.attach(Node::Table(table));
                }
            }
            _ => {}
        }
    }

    fn in_run(&self) -> bool {
        self.paragraph_depth == 1 && self.run_depth > 0 && self.open_text.is_none()
    }

    fn in_text(&self) -> bool {
        self.in_body && self.paragraph_depth == 1 && self.open_text.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(record) = self.current() {
            record.text.push_str(text);
        }
    }

    fn push_break(&mut self, index: usize, ch: char) {
        if let Some(record) = self.current() {
            record.text.push(ch);
            record.breaks.push(index);
        }
    }

    fn is_balanced(&self) -> bool {
        self.stack.is_empty() && self.paragraph_depth == 0 && !self.in_body
    }
}

/// Page and column breaks carry no text and are left in place
fn is_line_break(element: &BytesStart<'_>) -> bool {
    match element.try_get_attribute("w:type") {
        Ok(Some(attr)) => attr.value.as_ref() == b"textWrapping",
        _ => true,
    }
}

fn read_events(xml: &str, part: &str) -> DocResult<(Vec<Event<'static>>, TreeBuilder)> {
    let malformed = |message: String| DocError::MalformedXml {
        part: part.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut events = Vec::new();
    let mut builder = TreeBuilder::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("{} at byte {}", e, reader.buffer_position()))
        })?;
        let index = events.len();

        match &event {
            Event::Eof => break,
            Event::Start(e) => builder.start(e.name().as_ref(), index),
            Event::Empty(e) => builder.empty(e, index),
            Event::End(e) => builder.end(e.name().as_ref(), index),
            Event::Text(t) if builder.in_text() => {
                let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                builder.push_text(&text);
            }
            _ => {}
        }

        events.push(event.into_owned());
    }

    if !builder.saw_body {
        return Err(malformed("no w:body element".to_string()));
    }
    if !builder.is_balanced() {
        return Err(malformed("unexpected end of document".to_string()));
    }

    Ok((events, builder))
}
