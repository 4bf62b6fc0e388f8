// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A document the reader can be asked about: where it came from
// and its full text. By the time a Document exists the text has
// already been pulled out of whatever file format held it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Filename or path, so answers can be traced back to their source
    pub source: String,

    /// Full extracted text
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// True when there is nothing but whitespace to read.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Same source, different text (e.g. after cleaning).
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::new(self.source.clone(), text)
    }
}
