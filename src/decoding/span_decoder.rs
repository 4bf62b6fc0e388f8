// ============================================================
// Layer 5 — Span Decoder
// ============================================================
// Produces answer spans from two probability vectors over the
// document tokens:
//
//   start_probs[i] = P(answer starts at token i)
//   end_probs[i]   = P(answer ends at token i)
//
// Each call to next() finds the best (start, end) pair, wipes
// it (plus a small margin) out of both vectors so it cannot be
// picked again, and yields it. Spans therefore come out best
// first, and the sequence is lazy: stop pulling whenever you
// have enough.
//
// Finding the best pair in O(N) instead of O(N²):
//   For an end position i, the best start is simply the highest
//   start probability at or before i. A single left-to-right
//   scan keeps that running maximum (and where it occurred), so
//   every end is scored against its best start in one pass.
//
//   The end probability is decayed by 1% per token of distance
//   from that best start, so a strong start far to the left
//   cannot drag in a very long answer. The decay only steers
//   selection; the reported score is the plain product
//   start_probs[start] × end_probs[end].
//
// Near-duplicates:
//   Greedy suppression alone can surface an overlapping span
//   with slightly shifted boundaries. Every returned window is
//   recorded; a new window touching a recorded one is skipped.
//   Skips are capped by a retry budget so the decoder can never
//   stall. Once the budget is spent, spans are yielded unchecked.
//   A window that removes no mass ends the session only if it was
//   already handed out (or can no longer be checked); otherwise it
//   is yielded like any other, with its zero score.
//
// Reference: Seo et al. (2017) BiDAF, linear-time span search
//            Rust Book §13 (Iterators)

use std::ops::Range;

use crate::domain::answer::Span;
use crate::domain::config::DecoderConfig;
use crate::error::{ReaderError, Result};

/// One decoded span and its reported score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSpan {
    /// Inclusive token range
    pub span:  Span,
    /// start_probs[start] × end_probs[end], before suppression
    pub score: f64,
}

// ─── UsedIntervals ────────────────────────────────────────────────────────────
/// Disjoint half-open token ranges already handed out, kept sorted by start.
#[derive(Debug, Default)]
struct UsedIntervals {
    ranges: Vec<Range<usize>>,
}

impl UsedIntervals {
    fn intersects(&self, window: &Range<usize>) -> bool {
        // First range ending after the window starts is the only candidate
        let idx = self.ranges.partition_point(|r| r.end <= window.start);
        self.ranges
            .get(idx)
            .is_some_and(|r| r.start < window.end)
    }

    fn insert(&mut self, window: Range<usize>) {
        let idx = self.ranges.partition_point(|r| r.start < window.start);
        self.ranges.insert(idx, window);
    }
}

// ─── SpanDecoder ──────────────────────────────────────────────────────────────
/// One decoding session. Owns private copies of both vectors and
/// mutates them as spans are consumed; drop it to abandon the session.
#[derive(Debug)]
pub struct SpanDecoder {
    start_probs:       Vec<f64>,
    end_probs:         Vec<f64>,
    used:              UsedIntervals,
    remaining_retries: usize,
    config:            DecoderConfig,
    finished:          bool,
}

impl SpanDecoder {
    pub fn new(start_probs: Vec<f64>, end_probs: Vec<f64>, config: &DecoderConfig) -> Result<Self> {
        if start_probs.is_empty() {
            return Err(ReaderError::empty_input("cannot decode spans over zero tokens"));
        }
        if start_probs.len() != end_probs.len() {
            return Err(ReaderError::invalid_structure(format!(
                "start and end distributions differ in length ({} vs {})",
                start_probs.len(),
                end_probs.len()
            )));
        }

        Ok(Self {
            start_probs,
            end_probs,
            used:              UsedIntervals::default(),
            remaining_retries: config.retry_budget,
            config:            config.clone(),
            finished:          false,
        })
    }

    pub fn len(&self) -> usize {
        self.start_probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_probs.is_empty()
    }

    /// Start-probability mass not yet suppressed.
    pub fn remaining_mass(&self) -> f64 {
        self.start_probs.iter().sum()
    }

    /// Near-duplicates that may still be skipped before the guard switches off.
    pub fn remaining_retries(&self) -> usize {
        self.remaining_retries
    }

    /// Best (start, end) under the decayed score. Ties keep the earliest
    /// candidate: both the running maximum and the best pair only move
    /// on strict improvement.
    fn best_candidate(&self) -> (usize, usize) {
        let mut best       = (0, 0);
        let mut best_value = self.start_probs[0] * self.end_probs[0];

        let mut prefix_max    = self.start_probs[0];
        let mut prefix_argmax = 0;

        for i in 1..self.len() {
            if self.start_probs[i] > prefix_max {
                prefix_max    = self.start_probs[i];
                prefix_argmax = i;
            }

            let distance    = (i - prefix_argmax) as f64;
            let decayed_end = (self.end_probs[i] * (1.0 - self.config.decay_rate * distance)).max(0.0);

            let value = prefix_max * decayed_end;
            if value > best_value {
                best_value = value;
                best       = (prefix_argmax, i);
            }
        }

        best
    }

    /// Token range zeroed around a chosen span. Always covers the span
    /// itself; the margin widens it on both sides.
    fn suppression_window(&self, start: usize, end: usize) -> Range<usize> {
        let lo = start.saturating_sub(self.config.margin);
        let hi = (end + self.config.margin.max(1)).min(self.len());
        lo..hi
    }

    /// Zero both vectors over `window`, returning the mass removed.
    fn suppress(&mut self, window: Range<usize>) -> f64 {
        let mut removed = 0.0;
        for p in self.start_probs[window.clone()]
            .iter_mut()
            .chain(self.end_probs[window].iter_mut())
        {
            removed += *p;
            *p = 0.0;
        }
        removed
    }
}

impl Iterator for SpanDecoder {
    type Item = DecodedSpan;

    fn next(&mut self) -> Option<DecodedSpan> {
        while !self.finished {
            if self.remaining_mass() <= self.config.epsilon {
                self.finished = true;
                break;
            }

            let (start, end) = self.best_candidate();
            let score        = self.start_probs[start] * self.end_probs[end];
            let window       = self.suppression_window(start, end);

            let removed = self.suppress(window.clone());
            if removed == 0.0 && (self.remaining_retries == 0 || self.used.intersects(&window)) {
                // Nothing changed since this window was last handed out;
                // every later pass would pick the same candidate again.
                tracing::debug!(start, end, "span decoder stalled, ending session");
                self.finished = true;
                break;
            }

            if self.remaining_retries > 0 {
                if self.used.intersects(&window) {
                    self.remaining_retries -= 1;
                    tracing::debug!(
                        start,
                        end,
                        remaining_retries = self.remaining_retries,
                        "skipping near-duplicate span"
                    );
                    continue;
                }
                self.used.insert(window);
            }

            return Some(DecodedSpan { span: Span::new(start, end), score });
        }
        None
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::softmax::softmax;
    use pretty_assertions::assert_eq;

    fn decoder(start: Vec<f64>, end: Vec<f64>) -> SpanDecoder {
        SpanDecoder::new(start, end, &DecoderConfig::default()).unwrap()
    }

    fn spans(d: impl Iterator<Item = DecodedSpan>) -> Vec<(usize, usize)> {
        d.map(|s| (s.span.start, s.span.end)).collect()
    }

    /// Deterministic, bumpy distribution over `n` tokens.
    fn wavy(n: usize, phase: f32) -> Vec<f64> {
        let logits: Vec<f32> = (0..n)
            .map(|i| ((i as f32) * 0.37 + phase).sin() * 3.0 + ((i as f32) * 0.11).cos())
            .collect();
        softmax(&logits).unwrap()
    }

    #[test]
    fn test_single_token_document() {
        let mut d = decoder(vec![1.0], vec![1.0]);
        let first = d.next().unwrap();
        assert_eq!(first.span, Span::new(0, 0));
        assert_eq!(first.score, 1.0);
        assert!(d.next().is_none());
    }

    #[test]
    fn test_all_zero_vectors_yield_nothing() {
        assert!(decoder(vec![0.0; 8], vec![0.0; 8]).next().is_none());
    }

    #[test]
    fn test_dominant_peak() {
        let mut start = vec![0.01; 10];
        let mut end   = vec![0.01; 10];
        start[3] = 0.91;
        end[5]   = 0.91;

        let best = decoder(start, end).next().unwrap();
        assert_eq!(best.span, Span::new(3, 5));
        assert!((best.score - 0.91 * 0.91).abs() < 1e-12);
    }

    #[test]
    fn test_peaks_come_out_best_first() {
        let mut start = vec![0.0f32; 40];
        let mut end   = vec![0.0f32; 40];
        for (pos, strength) in [(5, 4.0), (15, 3.0), (25, 2.0)] {
            start[pos]   = strength;
            end[pos + 1] = strength;
        }
        let d = decoder(softmax(&start).unwrap(), softmax(&end).unwrap());
        let decoded: Vec<DecodedSpan> = d.take(5).collect();

        assert_eq!(
            decoded.iter().take(3).map(|s| (s.span.start, s.span.end)).collect::<Vec<_>>(),
            vec![(5, 6), (15, 16), (25, 26)]
        );
        assert!(decoded.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_start_never_after_end_and_in_bounds() {
        let n = 120;
        for s in decoder(wavy(n, 0.0), wavy(n, 1.3)).take(30) {
            assert!(s.span.start <= s.span.end);
            assert!(s.span.end < n);
        }
    }

    #[test]
    fn test_ties_keep_the_earliest_start() {
        let best = decoder(vec![0.5, 0.5, 0.0, 0.0], vec![0.0, 0.0, 1.0, 0.0])
            .next()
            .unwrap();
        assert_eq!(best.span, Span::new(0, 2));
    }

    #[test]
    fn test_distance_decay_prefers_nearby_end() {
        let mut start = vec![0.0; 100];
        let mut end   = vec![0.0; 100];
        start[0] = 1.0;
        end[3]   = 0.45;
        end[60]  = 0.55;

        // 0.55 decays to 0.55 × 0.4 = 0.22, below 0.45 × 0.97
        let best = decoder(start, end).next().unwrap();
        assert_eq!(best.span, Span::new(0, 3));
        assert!((best.score - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_decay_is_floored_at_zero() {
        let mut start = vec![0.0; 200];
        let mut end   = vec![0.0; 200];
        start[1]  = 1.0;
        end[150]  = 1.0;

        // The only end sits 149 tokens past the start and decays to zero,
        // so the empty seed pair wins once, then the window repeats
        let mut d = decoder(start, end);
        let first = d.next().unwrap();
        assert_eq!(first.span, Span::new(0, 0));
        assert_eq!(first.score, 0.0);
        assert!(d.next().is_none());
    }

    #[test]
    fn test_zero_score_pair_in_fresh_window_is_yielded() {
        let mut start = vec![0.0; 10];
        let mut end   = vec![0.0; 10];
        start[6] = 1.0;
        end[2]   = 1.0;

        // No end follows the start; (0, 0) removes nothing but was never handed out
        let got: Vec<DecodedSpan> = decoder(start, end).take(1).collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].span, Span::new(0, 0));
    }

    #[test]
    fn test_empty_window_with_spent_budget_ends_session() {
        let cfg = DecoderConfig { retry_budget: 0, ..DecoderConfig::default() };
        let mut start = vec![0.0; 10];
        start[6] = 1.0;
        let d = SpanDecoder::new(start, vec![0.0; 10], &cfg).unwrap();
        assert_eq!(spans(d), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_near_duplicates_are_skipped() {
        // Uniform: (0,0) then (1,1) touches its window and is skipped, etc.
        let d = decoder(vec![0.2; 5], vec![0.2; 5]);
        assert_eq!(spans(d), vec![(0, 0), (2, 2), (4, 4)]);
    }

    #[test]
    fn test_exhausted_retry_budget_allows_overlaps() {
        let cfg = DecoderConfig { retry_budget: 0, ..DecoderConfig::default() };
        let d   = SpanDecoder::new(vec![0.2; 5], vec![0.2; 5], &cfg).unwrap();
        assert_eq!(spans(d), vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn test_windows_do_not_overlap_while_budget_remains() {
        let mut d = decoder(wavy(200, 0.4), wavy(200, 2.1));
        let decoded: Vec<DecodedSpan> = d.by_ref().take(10).collect();
        assert!(decoded.len() >= 5);
        assert!(d.remaining_retries() > 0);

        let windows: Vec<Range<usize>> = decoded
            .iter()
            .map(|s| s.span.start.saturating_sub(1)..(s.span.end + 1).min(200))
            .collect();
        for (i, a) in windows.iter().enumerate() {
            for b in &windows[i + 1..] {
                assert!(a.end <= b.start || b.end <= a.start, "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_zero_margin_suppresses_exact_span() {
        let cfg = DecoderConfig { margin: 0, ..DecoderConfig::default() };
        let d   = SpanDecoder::new(vec![0.25; 4], vec![0.25; 4], &cfg).unwrap();
        assert_eq!(spans(d), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_session_terminates_when_mass_is_spent() {
        let mut d = decoder(wavy(60, 0.0), wavy(60, 0.7));
        let count = d.by_ref().count();
        assert!(count > 0);
        assert!(d.next().is_none());
    }

    #[test]
    fn test_stalled_session_ends() {
        // Start mass sits where no end can pair with it
        let d = decoder(vec![0.0, 1.0], vec![1.0, 0.0]);
        assert_eq!(spans(d), vec![(0, 0)]);
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let err = SpanDecoder::new(vec![0.5, 0.5], vec![1.0], &DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidStructure(_)));
        assert!(SpanDecoder::new(vec![], vec![], &DecoderConfig::default()).is_err());
    }

    #[test]
    fn test_used_interval_lookup() {
        let mut used = UsedIntervals::default();
        used.insert(10..14);
        used.insert(2..5);
        assert!(used.intersects(&(4..6)));
        assert!(used.intersects(&(0..20)));
        assert!(!used.intersects(&(5..10)));
        assert!(!used.intersects(&(14..30)));
    }
}
