//! Transcript report rendering
//!
//! A4 pages, built-in Helvetica, bold role label followed by the full
//! untruncated turn text. The document-priming pair is not part of the
//! readable transcript and is skipped.

use crate::error::{SessionError, SessionResult};
use crate::session::ConversationTurn;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const TOP_MARGIN_MM: f32 = 20.0;
const LABEL_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 12.0;
const LABEL_LEAD_MM: f32 = 10.0;
const BODY_LEAD_MM: f32 = 6.0;
const SECTION_GAP_MM: f32 = 3.0;

// Fits Helvetica at 12pt inside the printable width.
const WRAP_COLUMNS: usize = 90;

/// Greedy word wrap preserving explicit line breaks. Words longer than the
/// column limit are emitted on their own line rather than split.
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
            } else if current.len() + 1 + word.len() <= columns {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }

    lines
}

struct PageCursor<'a> {
    doc: &'a printpdf::PdfDocumentReference,
    layer: PdfLayerReference,
    y_mm: f32,
}

impl<'a> PageCursor<'a> {
    /// Advance down the page, breaking to a new page when the next line
    /// would land below the bottom margin.
    fn advance(&mut self, lead_mm: f32) {
        self.y_mm -= lead_mm;
        if self.y_mm < MARGIN_MM + BODY_LEAD_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "transcript");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y_mm = PAGE_HEIGHT_MM - TOP_MARGIN_MM;
        }
    }

    fn write_line(&mut self, text: &str, size: f32, font: &IndirectFontRef, lead_mm: f32) {
        self.advance(lead_mm);
        if !text.is_empty() {
            self.layer
                .use_text(text, size, Mm(MARGIN_MM), Mm(self.y_mm), font);
        }
    }
}

/// Render `turns` (minus the two priming turns) to `path`.
pub fn render(path: &Path, turns: &[ConversationTurn]) -> SessionResult<()> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Interview Transcript",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "transcript",
    );

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| SessionError::Persistence(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| SessionError::Persistence(e.to_string()))?;

    let mut cursor = PageCursor {
        doc: &doc,
        layer: doc.get_page(first_page).get_layer(first_layer),
        y_mm: PAGE_HEIGHT_MM - TOP_MARGIN_MM,
    };

    for turn in turns.iter().skip(2) {
        cursor.write_line(
            &format!("{}:", turn.role.label()),
            LABEL_SIZE,
            &bold,
            LABEL_LEAD_MM,
        );
        for line in wrap_text(&turn.content, WRAP_COLUMNS) {
            cursor.write_line(&line, BODY_SIZE, &regular, BODY_LEAD_MM);
        }
        cursor.advance(SECTION_GAP_MM);
    }

    let file = File::create(path)
        .map_err(|e| SessionError::Persistence(format!("{}: {}", path.display(), e)))?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| SessionError::Persistence(e.to_string()))?;

    Ok(())
}
