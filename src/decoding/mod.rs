// ============================================================
// Layer 5 — Answer Decoding
// ============================================================
// Pure array computation, no model and no I/O:
//
//   logits ──► softmax ──► SpanDecoder ──► materializer ──► AnswerSpan
//
// Each decoding session owns its own probability buffers, so
// independent sessions can run side by side without sharing
// anything.

/// Numerically stable softmax
pub mod softmax;

/// Lazy best-first (start, end) span search with duplicate suppression
pub mod span_decoder;

/// Token spans → text, character spans and long-answer windows
pub mod materializer;

pub use materializer::{find_best_spans, AnswerSpan, BestSpans};
pub use softmax::softmax;
pub use span_decoder::{DecodedSpan, SpanDecoder};
