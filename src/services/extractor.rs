//! Content Extractor Module
//!
//! Best-effort plain text extraction for the document types the pipeline
//! classifies. Pure Rust, no system libraries:
//! - PDF via pdf-extract
//! - Word (.docx) via docx-rs
//! - Plain text read directly, invalid UTF-8 replaced
//!
//! Extraction never fails from the caller's point of view. Any problem is
//! logged and yields an empty string, which the classifier routes to the
//! rule-based fallback.

use std::path::Path;

/// Maximum text length to extract (to avoid memory issues with huge docs)
const MAX_TEXT_LENGTH: usize = 200_000;

/// Source of plain text for a file
pub trait ContentExtractor: Send + Sync {
    /// Returns the file's text, or an empty string if nothing usable was found
    fn extract(&self, path: &Path) -> String;
}

/// Why a document produced no text
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("PDF extraction panicked - likely contains malformed fonts")]
    PdfPanic,

    #[error("failed to parse DOCX: {0}")]
    Docx(String),
}

/// Default extractor dispatching on file extension
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl ContentExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> String {
        match self.try_extract(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[Extractor] {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text, reporting failures instead of swallowing them
    pub fn try_extract(&self, path: &Path) -> Result<String, ExtractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase());

        let raw = match ext.as_deref() {
            Some("txt") => Self::read_plain_text(path)?,
            Some("pdf") => Self::extract_pdf(path)?,
            Some("docx") => Self::extract_docx(path)?,
            // Image metadata is not text; images are classified by extension
            _ => return Ok(String::new()),
        };

        let text = truncate_text(&clean_text(&raw));
        tracing::debug!(
            "[Extractor] {} chars from {}",
            text.len(),
            path.display()
        );
        Ok(text)
    }

    fn read_plain_text(path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Wrapped in catch_unwind: pdf-extract can panic on malformed fonts
    fn extract_pdf(path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;

        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(&bytes)
        })) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
            Err(_panic) => Err(ExtractError::PdfPanic),
        }
    }

    fn extract_docx(path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path)?;
        let doc = docx_rs::read_docx(&bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;

        let mut all_text = String::new();
        for child in &doc.document.children {
            collect_docx_text(child, &mut all_text);
        }
        Ok(all_text)
    }
}

fn collect_run_text(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        if let docx_rs::RunChild::Text(text) = run_child {
            output.push_str(&text.text);
        }
    }
}

fn collect_paragraph_text(para: &docx_rs::Paragraph, output: &mut String) {
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => collect_run_text(run, output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        collect_run_text(run, output);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Paragraphs become lines; table cells are joined with ` | `
fn collect_docx_text(element: &docx_rs::DocumentChild, output: &mut String) {
    match element {
        docx_rs::DocumentChild::Paragraph(para) => {
            collect_paragraph_text(para, output);
            output.push('\n');
        }
        docx_rs::DocumentChild::Table(table) => {
            for row in &table.rows {
                let docx_rs::TableChild::TableRow(tr) = row;
                for cell in &tr.cells {
                    let docx_rs::TableRowChild::TableCell(tc) = cell;
                    for content in &tc.children {
                        if let docx_rs::TableCellContent::Paragraph(para) = content {
                            collect_paragraph_text(para, output);
                            output.push_str(" | ");
                        }
                    }
                }
                output.push('\n');
            }
        }
        _ => {}
    }
}

/// Trim lines and drop blank ones
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to `MAX_TEXT_LENGTH` bytes on a char and word boundary
fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_TEXT_LENGTH {
        return text.to_string();
    }

    let mut end = MAX_TEXT_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];

    match truncated.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => truncated[..pos].to_string(),
        _ => truncated.to_string(),
    }
}
