//! Typed document tree and fragments
//!
//! A word-processor body is a sequence of [`Node`]s. Tables nest rows and
//! cells; a cell holds nodes again, so nested tables fall out of the same
//! shape. Paragraphs carry only a [`ParagraphHandle`]: the text and the
//! location of its runs live in the owning [`crate::DocxDocument`].

use serde::Serialize;

/// Stable identity of a paragraph inside one parsed document
///
/// Handles are indices into the document's paragraph table and are only
/// meaningful for the document that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParagraphHandle(pub(crate) usize);

impl ParagraphHandle {
    /// Position of the paragraph in the document part, counting empty ones
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A block-level node of the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Paragraph(ParagraphHandle),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub nodes: Vec<Node>,
}

/// One unit of translatable text and the paragraph it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub handle: ParagraphHandle,
}

impl Fragment {
    pub fn new(text: impl Into<String>, handle: ParagraphHandle) -> Self {
        Self {
            text: text.into(),
            handle,
        }
    }
}

/// Counts describing the shape of a document tree
///
/// Two documents with equal shapes have the same paragraphs, tables, rows
/// and cells in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub paragraphs: usize,
    pub tables: usize,
    pub rows: usize,
    pub cells: usize,
}

/// Walk nodes in fragment order: a container's paragraphs first, then its
/// tables in order, each table row-major, recursing into cells.
pub(crate) fn walk_paragraphs(nodes: &[Node], visit: &mut impl FnMut(ParagraphHandle)) {
    for node in nodes {
        if let Node::Paragraph(handle) = node {
            visit(*handle);
        }
    }
    for node in nodes {
        if let Node::Table(table) = node {
            for row in &table.rows {
                for cell in &row.cells {
                    walk_paragraphs(&cell.nodes, visit);
                }
            }
        }
    }
}

pub(crate) fn measure(nodes: &[Node], shape: &mut Shape) {
    for node in nodes {
        match node {
            Node::Paragraph(_) => shape.paragraphs += 1,
            Node::Table(table) => {
                shape.tables += 1;
                for row in &table.rows {
                    shape.rows += 1;
                    for cell in &row.cells {
                        shape.cells += 1;
                        measure(&cell.nodes, shape);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(i: usize) -> Node {
        Node::Paragraph(ParagraphHandle(i))
    }

    fn cell(nodes: Vec<Node>) -> Cell {
        Cell { nodes }
    }

    #[test]
    fn test_walk_visits_body_paragraphs_before_tables() {
        // Body: p0, table(p1 | p2), p3
        let table = Table {
            rows: vec![Row {
                cells: vec![cell(vec![p(1)]), cell(vec![p(2)])],
            }],
        };
        let nodes = vec![p(0), Node::Table(table), p(3)];

        let mut seen = Vec::new();
        walk_paragraphs(&nodes, &mut |h| seen.push(h.index()));
        assert_eq!(seen, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_walk_is_row_major() {
        let table = Table {
            rows: vec![
                Row {
                    cells: vec![cell(vec![p(0)]), cell(vec![p(1)])],
                },
                Row {
                    cells: vec![cell(vec![p(2)]), cell(vec![p(3)])],
                },
            ],
        };
        let mut seen = Vec::new();
        walk_paragraphs(&[Node::Table(table)], &mut |h| seen.push(h.index()));
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_walk_nested_table_after_cell_paragraphs() {
        let inner = Table {
            rows: vec![Row {
                cells: vec![cell(vec![p(1)])],
            }],
        };
        let outer = Table {
            rows: vec![Row {
                cells: vec![cell(vec![Node::Table(inner), p(0)])],
            }],
        };
        let mut seen = Vec::new();
        walk_paragraphs(&[Node::Table(outer)], &mut |h| seen.push(h.index()));
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_measure_counts_nested_structure() {
        let table = Table {
            rows: vec![Row {
                cells: vec![cell(vec![p(1), p(2)]), cell(vec![])],
            }],
        };
        let mut shape = Shape::default();
        measure(&[p(0), Node::Table(table)], &mut shape);
        assert_eq!(
            shape,
            Shape {
                paragraphs: 3,
                tables: 1,
                rows: 1,
                cells: 2
            }
        );
    }
}
