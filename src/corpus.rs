//! Corpus loading and document storage.
//!
//! A [`Corpus`] is an ordered, immutable collection of [`Document`]s loaded
//! from a newline-delimited JSON file (one record per line, each with a
//! `text` field). Document ids are assigned in load order and are stable for
//! the lifetime of the process.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RagError, Result};

/// Default per-document character budget applied at ingestion.
pub const MAX_DOCUMENT_CHARS: usize = 6000;

/// A single corpus entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Position of the document in load order; unique and stable.
    pub id: usize,
    /// The text content, truncated to the ingestion character budget.
    pub text: String,
}

/// One line of the corpus source file.
#[derive(Debug, Deserialize)]
struct CorpusRecord {
    text: String,
}

/// An ordered, immutable collection of documents.
///
/// Built once at startup and shared read-only thereafter (typically as an
/// `Arc<Corpus>`); never mutated after load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Load a corpus from a newline-delimited JSON file.
    ///
    /// Each line is parsed independently; a malformed line is skipped and
    /// logged rather than failing the whole load. Document text longer than
    /// `max_chars` is truncated at a character boundary.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingest`] if the file cannot be opened or if no
    /// line yields a usable document.
    pub fn load(path: impl AsRef<Path>, max_chars: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RagError::Ingest(format!("failed to open corpus file '{}': {e}", path.display()))
        })?;
        Self::from_reader(file, max_chars)
    }

    /// Load a corpus from any reader producing newline-delimited JSON.
    ///
    /// Same per-line semantics as [`load`](Corpus::load).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingest`] if reading fails or the resulting corpus
    /// is empty.
    pub fn from_reader(reader: impl Read, max_chars: usize) -> Result<Self> {
        let mut documents = Vec::new();
        for (line_no, line) in BufReader::new(reader).lines().enumerate() {
            let line =
                line.map_err(|e| RagError::Ingest(format!("failed to read corpus: {e}")))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CorpusRecord>(&line) {
                Ok(record) => {
                    let id = documents.len();
                    documents.push(Document { id, text: truncate_chars(&record.text, max_chars) });
                }
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "skipping malformed corpus line");
                }
            }
        }
        if documents.is_empty() {
            return Err(RagError::Ingest(
                "corpus contains no parseable records after filtering".to_string(),
            ));
        }
        info!(document_count = documents.len(), "loaded corpus");
        Ok(Self { documents })
    }

    /// Build a corpus directly from document texts, in order.
    ///
    /// Texts are truncated to [`MAX_DOCUMENT_CHARS`].
    pub fn from_texts(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let documents = texts
            .into_iter()
            .enumerate()
            .map(|(id, text)| Document {
                id,
                text: truncate_chars(&text.into(), MAX_DOCUMENT_CHARS),
            })
            .collect();
        Self { documents }
    }

    /// Return the document at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::OutOfRange`] if `index` is outside `[0, len)`.
    pub fn get(&self, index: usize) -> Result<&Document> {
        self.documents
            .get(index)
            .ok_or(RagError::OutOfRange { index, len: self.documents.len() })
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Iterate over documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }
}

/// Truncate a string to at most `max_chars` characters, respecting UTF-8
/// boundaries. Returns the input unchanged when it already fits.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
