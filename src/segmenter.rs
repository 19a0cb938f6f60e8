//! Document segmentation boundary.
//!
//! Text extraction from source documents is an external collaborator; the
//! core only consumes its output. The trait is deliberately narrow: bytes in,
//! ordered page-tagged segments out. An empty segment list is a valid
//! outcome (a scanned document with no extractable text) and is rejected
//! upstream by the ingestion pipeline, not here.

use crate::types::{Segment, VaultError};

/// Splits a source document into an ordered sequence of text segments with
/// page-level metadata.
pub trait DocumentSegmenter: Send + Sync {
    fn segment(&self, raw: &[u8], source: &str) -> Result<Vec<Segment>, VaultError>;
}

/// Reference segmenter for plain UTF-8 text.
///
/// Pages are delimited by form feed (`\x0c`), the conventional page-break
/// character in extracted text streams. Whitespace-only pages are dropped;
/// surviving pages are numbered one-based against the pre-drop total so page
/// numbers still point into the original document.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextSegmenter;

impl PlainTextSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSegmenter for PlainTextSegmenter {
    fn segment(&self, raw: &[u8], source: &str) -> Result<Vec<Segment>, VaultError> {
        let text = std::str::from_utf8(raw)
            .map_err(|err| VaultError::Segmentation(format!("document is not UTF-8: {err}")))?;

        let pages: Vec<&str> = text.split('\u{0c}').collect();
        let total_pages = pages.len() as u32;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter(|(_, page)| !page.trim().is_empty())
            .map(|(idx, page)| {
                Segment::new(page.trim(), source, idx as u32 + 1, total_pages)
            })
            .collect())
    }
}
