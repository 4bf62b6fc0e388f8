// ============================================================
// Layer 5 — Span Materializer
// ============================================================
// Turns decoded token spans back into text.
//
// For a decoded span (start, end) over a token offset table:
//
//   short answer   bytes [offsets[start].0, offsets[end].1)
//   long answer    the same, after widening the token range by
//                  `expansion` tokens each side, clipped to
//                  [0, N-1]
//
// Example (expansion = 2):
//   tokens:  The  Denver  Broncos  defeated  the  Carolina  Panthers
//   span:              [1 ───── 2]
//   long:    [0 ──────────────────────────── 4]
//
// The caller's probability vectors are copied into the decoding
// session, never mutated. Exactly `top_k` answers are produced;
// if the decoder runs dry first, the last item is a
// DecoderExhausted error so callers can tell "ran out of
// candidates" apart from an empty result.

use std::borrow::Cow;

use crate::decoding::span_decoder::SpanDecoder;
use crate::domain::answer::Span;
use crate::domain::config::DecoderConfig;
use crate::error::{ReaderError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSpan {
    pub answer_text:         String,
    pub character_span:      Span,
    pub token_span:          Span,
    pub long_answer_text:    String,
    pub long_character_span: Span,
    pub long_token_span:     Span,
    pub score:               f64,
}

// ─── BestSpans ────────────────────────────────────────────────────────────────
/// Lazy sequence of the top-k answer spans, best first.
pub struct BestSpans<'a> {
    context:   &'a str,
    offsets:   Cow<'a, [(usize, usize)]>,
    decoder:   SpanDecoder,
    requested: usize,
    produced:  usize,
    expansion: usize,
    done:      bool,
}

/// Start decoding the top `top_k` answers of `context`.
///
/// `offsets` holds one half-open byte range per token, borrowed or
/// owned; both probability vectors must have one entry per token.
pub fn find_best_spans<'a>(
    context:     &'a str,
    offsets:     impl Into<Cow<'a, [(usize, usize)]>>,
    start_probs: &[f64],
    end_probs:   &[f64],
    top_k:       usize,
    config:      &DecoderConfig,
) -> Result<BestSpans<'a>> {
    let offsets = offsets.into();
    if offsets.len() != start_probs.len() {
        return Err(ReaderError::TokenCountMismatch {
            expected: offsets.len(),
            actual:   start_probs.len(),
        });
    }

    let decoder = SpanDecoder::new(start_probs.to_vec(), end_probs.to_vec(), config)?;

    Ok(BestSpans {
        context,
        offsets,
        decoder,
        requested: top_k,
        produced:  0,
        expansion: config.long_answer_expansion,
        done:      false,
    })
}

impl BestSpans<'_> {
    fn materialize(&self, token_span: Span, score: f64) -> Result<AnswerSpan> {
        let last = self.offsets.len() - 1;
        let long_token_span = Span::new(
            token_span.start.saturating_sub(self.expansion),
            (token_span.end + self.expansion).min(last),
        );

        let (answer_text, character_span)           = self.text_for(token_span)?;
        let (long_answer_text, long_character_span) = self.text_for(long_token_span)?;

        Ok(AnswerSpan {
            answer_text,
            character_span,
            token_span,
            long_answer_text,
            long_character_span,
            long_token_span,
            score,
        })
    }

    fn text_for(&self, tokens: Span) -> Result<(String, Span)> {
        let chars = Span::new(self.offsets[tokens.start].0, self.offsets[tokens.end].1);
        let text  = self.context.get(chars.start..chars.end).ok_or_else(|| {
            ReaderError::invalid_structure(format!(
                "token offsets {}..{} do not fall on the document text",
                chars.start, chars.end
            ))
        })?;
        Ok((text.to_string(), chars))
    }
}

impl Iterator for BestSpans<'_> {
    type Item = Result<AnswerSpan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.produced >= self.requested {
            return None;
        }

        match self.decoder.next() {
            Some(decoded) => {
                self.produced += 1;
                let item = self.materialize(decoded.span, decoded.score);
                self.done = item.is_err();
                Some(item)
            }
            None => {
                self.done = true;
                Some(Err(ReaderError::DecoderExhausted {
                    requested: self.requested,
                    produced:  self.produced,
                }))
            }
        }
    }
}
