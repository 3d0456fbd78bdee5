//! Source document loading.
//!
//! PDFs go through `pdf-extract` and are split into pages on form feeds.
//! Anything else is read as UTF-8 text and treated as a single page.

mod chunker;

pub use chunker::{Chunk, Chunker};

use crate::error::{ChartQaError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]+").expect("Invalid regex"));

/// One page of text from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// File the text came from.
    pub source: PathBuf,
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

/// Load every page from a set of source files, in order.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    for path in paths {
        documents.extend(load_file(path)?);
    }
    Ok(documents)
}

/// Load the pages of a single file.
#[instrument]
pub fn load_file(path: &Path) -> Result<Vec<SourceDocument>> {
    let bytes = std::fs::read(path)?;

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let pages = if is_pdf {
        let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
            ChartQaError::Document(format!("Failed to extract {}: {}", path.display(), e))
        })?;
        split_pages(&text)
    } else {
        let text = String::from_utf8(bytes).map_err(|e| {
            ChartQaError::Document(format!("{} is not UTF-8 text: {}", path.display(), e))
        })?;
        split_pages(&text)
    };

    if pages.is_empty() {
        warn!("No text found in {}", path.display());
    }
    debug!("Loaded {} page(s) from {}", pages.len(), path.display());

    Ok(pages
        .into_iter()
        .map(|(page, text)| SourceDocument {
            source: path.to_path_buf(),
            page,
            text,
        })
        .collect())
}

/// Split extracted text on form feeds, dropping blank pages.
fn split_pages(text: &str) -> Vec<(u32, String)> {
    text.split('\x0C')
        .enumerate()
        .map(|(i, page)| (i as u32 + 1, normalize_whitespace(page)))
        .filter(|(_, page)| !page.is_empty())
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("First page\n\ttext\x0C  \x0CThird page");
        assert_eq!(
            pages,
            vec![(1, "First page text".to_string()), (3, "Third page".to_string())]
        );
    }

    #[test]
    fn test_split_pages_without_form_feed() {
        assert_eq!(split_pages("  just one page "), vec![(1, "just one page".to_string())]);
        assert!(split_pages(" \n ").is_empty());
    }

    #[test]
    fn test_load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "Inflation eased to 3.1%\nin January.").unwrap();

        let docs = load_file(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page, 1);
        assert_eq!(docs[0].text, "Inflation eased to 3.1% in January.");
        assert_eq!(docs[0].source, path);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/report.pdf")).unwrap_err();
        assert!(matches!(err, ChartQaError::Io(_)));
    }

    #[test]
    fn test_load_invalid_pdf_is_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(matches!(err, ChartQaError::Document(_)));
    }
}
