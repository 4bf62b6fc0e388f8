// ============================================================
// Reader Errors
// ============================================================
// Every failure the reader can report, one variant per kind.
//
// These are all precondition-style failures: they are detected
// at the boundary where the broken invariant is first checkable
// and are never retried here. Callers match on the variant to
// decide whether to retry upstream (re-tokenize, re-embed) or
// reject the request outright.
//
// The application and CLI layers wrap these in anyhow::Error
// with extra context; the library layers return them as-is.

use thiserror::Error;

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

#[derive(Error, Debug)]
pub enum ReaderError {
    /// A document or question tokenized to zero tokens,
    /// or softmax was handed an empty logit vector.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Token accounting disagrees with an independent tokenization.
    /// Points at a tokenizer/model inconsistency, never padded or truncated away.
    #[error("Token count mismatch: expected {expected}, got {actual}")]
    TokenCountMismatch { expected: usize, actual: usize },

    /// Empty or mismatched chunk/overlap lists, or arrays of unequal length.
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// The decoder ran out of probability mass before producing
    /// the requested number of spans.
    #[error("Decoder exhausted: requested {requested} spans, produced {produced}")]
    DecoderExhausted { requested: usize, produced: usize },

    /// An answer record violated its construction invariants.
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// Configuration values out of range (e.g. top_k = 0).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external reader model failed. Propagated unchanged.
    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        ReaderError::EmptyInput(msg.into())
    }

    pub fn invalid_structure(msg: impl Into<String>) -> Self {
        ReaderError::InvalidStructure(msg.into())
    }

    pub fn invalid_answer(msg: impl Into<String>) -> Self {
        ReaderError::InvalidAnswer(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        ReaderError::Model(msg.into())
    }

    /// True for failures that point at upstream inconsistency
    /// (tokenizer or model), where re-running upstream may help.
    pub fn is_upstream_inconsistency(&self) -> bool {
        matches!(self, ReaderError::TokenCountMismatch { .. } | ReaderError::Model(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_counts() {
        let e = ReaderError::TokenCountMismatch { expected: 175, actual: 174 };
        assert_eq!(e.to_string(), "Token count mismatch: expected 175, got 174");

        let e = ReaderError::DecoderExhausted { requested: 10, produced: 3 };
        assert!(e.to_string().contains("requested 10"));
    }

    #[test]
    fn test_upstream_classification() {
        assert!(ReaderError::model("boom").is_upstream_inconsistency());
        assert!(!ReaderError::empty_input("doc").is_upstream_inconsistency());
    }
}
