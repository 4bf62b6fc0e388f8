// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The reader never knows which model it is talking to. Anything
// that can tokenize, embed a document and score a question
// against that embedding can be plugged in:
//
//   - NeuralReaderModel → burn transformer + tokenizers (Layer 6)
//   - HashedReaderModel → deterministic random scores for tests
//
// The application layer only sees ReaderModel, so swapping one
// for the other is a type parameter change, nothing more.
//
// Embeddings travel as plain ndarray matrices so this layer
// stays free of any ML framework types.

use anyhow::Result as AnyResult;
use ndarray::Array2;

use crate::domain::document::Document;
use crate::error::Result;

// ─── Tokenized ────────────────────────────────────────────────────────────────
/// Tokens of a text plus the byte range each token covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens:  Vec<String>,
    /// Half-open `(start, end)` byte offsets into the tokenized text,
    /// one per token, non-decreasing and non-overlapping
    pub offsets: Vec<(usize, usize)>,
}

impl Tokenized {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// ─── SpanLogits ───────────────────────────────────────────────────────────────
/// Unnormalised start/end scores, one of each per document token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanLogits {
    pub start: Vec<f32>,
    pub end:   Vec<f32>,
}

impl SpanLogits {
    pub fn new(start: Vec<f32>, end: Vec<f32>) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }
}

// ─── ReaderModel ──────────────────────────────────────────────────────────────
/// The capability set an extractive reader model must provide.
///
/// The document embedding is question-independent and usually the
/// expensive part, so callers may cache it and reuse it for every
/// question asked against the same document.
pub trait ReaderModel {
    /// Split text into tokens with their byte offsets.
    fn tokenize(&self, text: &str) -> Result<Tokenized>;

    /// Embed a document: one row per token, shape `(num_tokens, dim)`.
    fn get_document_embedding(&self, text: &str) -> Result<Array2<f32>>;

    /// Score every document token as an answer start and end.
    /// Both vectors have one entry per embedding row.
    fn get_logits(&self, question: &str, document_embedding: &Array2<f32>) -> Result<SpanLogits>;
}

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load documents from a source.
///
/// Implementations:
///   - DocumentLoader → .docx / .txt / .md files from a path
pub trait DocumentSource {
    fn load_all(&self) -> AnyResult<Vec<Document>>;
}
