// ============================================================
// Layer 3 — Answer Record
// ============================================================
// The immutable result handed back to callers for one answer.
//
// An answer has two views of the same location in the document:
//   - the short answer: exactly the decoded span
//       "Denver Broncos"
//   - the long answer:  the span widened by N tokens each side
//       "... (AFC) champion Denver Broncos defeated the National ..."
//
// Both views carry a character span (byte offsets into the
// source text) and, when produced by the decoder, a token span.
//
// Construction is validated: a span is either fully present or
// fully absent, and both scores must lie in [0, 1]. A record
// that breaks these rules is an invariant violation, so new()
// returns an error instead of building it.

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, Result};

// ─── Span ─────────────────────────────────────────────────────────────────────
/// A pair of offsets into a document.
///
/// For character spans the range is half-open `[start, end)`;
/// for token spans both ends are inclusive `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end:   usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Validate a possibly-missing pair of bounds.
    ///
    /// `(Some, Some)` → `Some(Span)`, `(None, None)` → `None`,
    /// anything half-open is rejected.
    pub fn from_bounds(bounds: (Option<usize>, Option<usize>), what: &str) -> Result<Option<Self>> {
        match bounds {
            (Some(start), Some(end)) => Ok(Some(Self::new(start, end))),
            (None, None)             => Ok(None),
            (Some(_), None) => Err(ReaderError::invalid_answer(format!("{what} is unclosed"))),
            (None, Some(_)) => Err(ReaderError::invalid_answer(format!("{what} is unopened"))),
        }
    }

    /// True when two inclusive token spans share at least one index.
    #[cfg(test)]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

// ─── MachineReaderAnswer ──────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineReaderAnswer {
    /// The short answer text
    pub text: String,

    /// Byte range of `text` in the document
    pub span: Option<Span>,

    /// The answer with surrounding context
    pub long_text: String,

    /// Byte range of `long_text` in the document
    pub long_text_span: Option<Span>,

    /// Inclusive token range of the short answer
    pub token_span: Option<Span>,

    /// Inclusive token range of the long answer
    pub long_token_span: Option<Span>,

    /// start_prob × end_prob of the decoded span, in [0, 1]
    pub score_reader: f64,

    /// Reserved: whether the document contains an answer at all.
    /// Always 0 today, so its threshold never filters anything.
    pub score_answer_in_document: f64,
}

impl MachineReaderAnswer {
    pub fn new(
        text:                     impl Into<String>,
        span:                     (Option<usize>, Option<usize>),
        long_text:                impl Into<String>,
        long_text_span:           (Option<usize>, Option<usize>),
        score_reader:             f64,
        score_answer_in_document: f64,
    ) -> Result<Self> {
        check_score(score_reader, "score_reader")?;
        check_score(score_answer_in_document, "score_answer_in_document")?;

        Ok(Self {
            text:            text.into(),
            span:            Span::from_bounds(span, "span")?,
            long_text:       long_text.into(),
            long_text_span:  Span::from_bounds(long_text_span, "long_text_span")?,
            token_span:      None,
            long_token_span: None,
            score_reader,
            score_answer_in_document,
        })
    }

    /// Attach the token-index spans the decoder produced.
    pub fn with_token_spans(mut self, token_span: Span, long_token_span: Span) -> Self {
        self.token_span      = Some(token_span);
        self.long_token_span = Some(long_token_span);
        self
    }
}

fn check_score(score: f64, name: &str) -> Result<()> {
    // NaN fails the range check too
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(ReaderError::invalid_answer(format!("{name} {score} is outside [0, 1]")))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn build(
        span:           (Option<usize>, Option<usize>),
        long_text_span: (Option<usize>, Option<usize>),
        score_reader:   f64,
        score_in_doc:   f64,
    ) -> Result<MachineReaderAnswer> {
        MachineReaderAnswer::new("test", span, "long_test", long_text_span, score_reader, score_in_doc)
    }

    #[test]
    fn test_answer_creation() {
        let a = build((Some(1), Some(5)), (Some(3), Some(9)), 0.5, 0.1).unwrap();
        assert_eq!(a.text, "test");
        assert_eq!(a.span, Some(Span::new(1, 5)));
        assert_eq!(a.long_text, "long_test");
        assert_eq!(a.long_text_span, Some(Span::new(3, 9)));
        assert_eq!(a.score_reader, 0.5);
        assert_eq!(a.score_answer_in_document, 0.1);
        assert_eq!(a.token_span, None);
    }

    #[test]
    fn test_fully_absent_spans_are_allowed() {
        let a = build((None, None), (None, None), 0.0, 0.0).unwrap();
        assert_eq!(a.span, None);
        assert_eq!(a.long_text_span, None);
    }

    #[test]
    fn test_unclosed_and_unopened_spans_fail() {
        assert!(matches!(
            build((Some(1), None), (Some(3), Some(9)), 0.5, 0.1),
            Err(ReaderError::InvalidAnswer(_))
        ));
        assert!(build((None, Some(5)), (Some(3), Some(9)), 0.5, 0.1).is_err());
        assert!(build((Some(1), Some(5)), (Some(1), None), 0.5, 0.1).is_err());
        assert!(build((Some(1), Some(5)), (None, Some(5)), 0.5, 0.1).is_err());
    }

    #[test]
    fn test_scores_outside_unit_interval_fail() {
        assert!(build((Some(1), Some(5)), (Some(3), Some(9)), 20.0, 0.1).is_err());
        assert!(build((Some(1), Some(5)), (Some(3), Some(9)), 0.5, 20.0).is_err());
        assert!(build((Some(1), Some(5)), (Some(3), Some(9)), -0.1, 0.0).is_err());
        assert!(build((Some(1), Some(5)), (Some(3), Some(9)), f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_with_token_spans() {
        let a = build((Some(0), Some(4)), (Some(0), Some(20)), 0.9, 0.0)
            .unwrap()
            .with_token_spans(Span::new(0, 0), Span::new(0, 3));
        assert_eq!(a.token_span, Some(Span::new(0, 0)));
        assert_eq!(a.long_token_span, Some(Span::new(0, 3)));
    }

    #[test]
    fn test_span_overlap() {
        assert!(Span::new(2, 5).overlaps(&Span::new(5, 8)));
        assert!(!Span::new(2, 4).overlaps(&Span::new(5, 8)));
    }
}
