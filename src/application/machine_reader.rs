// ============================================================
// Layer 2 — Machine Reader
// ============================================================
// Turns a ReaderModel's raw start/end logits into ranked answers.
//
// Single chunk:
//   get_answers(config, text, question)
//     = get_logits(text, question) ──► get_answers_from_logits
//
// Long documents are split upstream into chunks that carry a
// little overlap text on each side. Every chunk is scored with
// its overlaps, then the overlap tokens are trimmed off again
// and the remainders are stitched into one document-wide pair of
// logit vectors:
//
//   chunk 0:  [ text0 ........ | after ]
//   chunk 1:  [ before | text1 ....... ]
//   stitched: [ text0 ........ text1 ....... ]
//
// One softmax runs over the whole document, so answers from
// different chunks compete on the same scale.
//
// Every precondition is checked before the model is called or
// before any decoding starts; failures come back as ReaderError.

use ndarray::Array2;

use crate::decoding::{find_best_spans, softmax, BestSpans};
use crate::domain::answer::MachineReaderAnswer;
use crate::domain::config::ReaderConfig;
use crate::domain::traits::{ReaderModel, SpanLogits};
use crate::error::{ReaderError, Result};

/// Number of overlap tokens to trim from the (front, back) of a chunk's logits.
pub type OverlapTokens = (usize, usize);

pub struct MachineReader<M> {
    model: M,
}

impl<M: ReaderModel> MachineReader<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    // ─── Embedding ────────────────────────────────────────────────────────────
    /// Embed `before_overlap + text + after_overlap`. The result can be
    /// cached and handed to every later get_logits call for this chunk.
    pub fn get_document_embedding(
        &self,
        text:           &str,
        before_overlap: &str,
        after_overlap:  &str,
    ) -> Result<Array2<f32>> {
        self.require_tokens(text, "document")?;
        self.model.get_document_embedding(&combine_overlaps(text, before_overlap, after_overlap))
    }

    // ─── Logits ───────────────────────────────────────────────────────────────
    /// Score `question` against one chunk. Returns the logits over every
    /// token of `before_overlap + text + after_overlap`, plus how many of
    /// those tokens belong to each overlap.
    pub fn get_logits(
        &self,
        text:               &str,
        question:           &str,
        before_overlap:     &str,
        after_overlap:      &str,
        document_embedding: Option<&Array2<f32>>,
    ) -> Result<(SpanLogits, OverlapTokens)> {
        let n_text = self.require_tokens(text, "document")?;
        self.require_tokens(question, "question")?;

        let doc      = combine_overlaps(text, before_overlap, after_overlap);
        let n_total  = self.count_tokens(&doc)?;
        let n_before = self.count_tokens(before_overlap)?;
        let n_after  = self.count_tokens(after_overlap)?;
        if n_total != n_before + n_text + n_after {
            return Err(ReaderError::TokenCountMismatch {
                expected: n_total,
                actual:   n_before + n_text + n_after,
            });
        }

        let computed;
        let embedding = match document_embedding {
            Some(embedding) => embedding,
            None => {
                computed = self.model.get_document_embedding(&doc)?;
                &computed
            }
        };

        let logits = self.model.get_logits(question, embedding)?;
        if logits.start.len() != n_total || logits.end.len() != n_total {
            return Err(ReaderError::TokenCountMismatch {
                expected: n_total,
                actual:   logits.start.len().max(logits.end.len()),
            });
        }

        Ok((logits, (n_before, n_after)))
    }

    // ─── Answers ──────────────────────────────────────────────────────────────
    /// Stitch per-chunk logits into one distribution over `full_text` and
    /// decode the best answers, best first.
    ///
    /// `full_text` must be the chunk texts (without overlaps) concatenated,
    /// so its tokens line up with the stitched logits.
    pub fn get_answers_from_logits<'a>(
        &self,
        config:             &ReaderConfig,
        logits_per_chunk:   &[SpanLogits],
        overlaps_per_chunk: &[OverlapTokens],
        full_text:          &'a str,
    ) -> Result<ReaderAnswers<'a>> {
        config.validate()?;
        if logits_per_chunk.is_empty() {
            return Err(ReaderError::invalid_structure("need at least one block of logits"));
        }
        if overlaps_per_chunk.is_empty() {
            return Err(ReaderError::invalid_structure("need at least one block of overlaps"));
        }
        if logits_per_chunk.len() != overlaps_per_chunk.len() {
            return Err(ReaderError::invalid_structure(format!(
                "{} logit blocks but {} overlap pairs",
                logits_per_chunk.len(),
                overlaps_per_chunk.len()
            )));
        }

        let (start_logits, end_logits) = stitch(logits_per_chunk, overlaps_per_chunk)?;

        let tokenized = self.model.tokenize(full_text)?;
        if start_logits.len() != tokenized.len() {
            return Err(ReaderError::TokenCountMismatch {
                expected: tokenized.len(),
                actual:   start_logits.len(),
            });
        }

        let start_probs = softmax(&start_logits)?;
        let end_probs   = softmax(&end_logits)?;

        let spans = find_best_spans(
            full_text,
            tokenized.offsets,
            &start_probs,
            &end_probs,
            config.top_k,
            &config.decoding,
        )?;

        tracing::debug!(
            "Decoding {} answers over {} tokens from {} chunks",
            config.top_k, start_logits.len(), logits_per_chunk.len()
        );

        Ok(ReaderAnswers {
            spans,
            threshold_reader:             config.threshold_reader,
            threshold_answer_in_document: config.threshold_answer_in_document,
            done:                         false,
        })
    }

    /// Answer `question` from a single unchunked document.
    pub fn get_answers<'a>(
        &self,
        config:        &ReaderConfig,
        document_text: &'a str,
        question:      &str,
    ) -> Result<ReaderAnswers<'a>> {
        let (logits, overlaps) = self.get_logits(document_text, question, "", "", None)?;
        self.get_answers_from_logits(config, &[logits], &[overlaps], document_text)
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.model.tokenize(text)?.len())
    }

    fn require_tokens(&self, text: &str, what: &str) -> Result<usize> {
        match self.count_tokens(text)? {
            0 => Err(ReaderError::empty_input(format!("{what} cannot be empty: {text:?}"))),
            n => Ok(n),
        }
    }
}

fn combine_overlaps(text: &str, before_overlap: &str, after_overlap: &str) -> String {
    [before_overlap, text, after_overlap].concat()
}

/// Drop each chunk's overlap tokens and concatenate what is left.
fn stitch(logits_per_chunk: &[SpanLogits], overlaps_per_chunk: &[OverlapTokens]) -> Result<(Vec<f32>, Vec<f32>)> {
    let mut start = Vec::new();
    let mut end   = Vec::new();

    for (i, (logits, &(before, after))) in logits_per_chunk.iter().zip(overlaps_per_chunk).enumerate() {
        let n = logits.start.len();
        if logits.end.len() != n {
            return Err(ReaderError::invalid_structure(format!(
                "chunk {i}: {n} start logits but {} end logits",
                logits.end.len()
            )));
        }
        if before + after > n {
            return Err(ReaderError::invalid_structure(format!(
                "chunk {i}: overlaps ({before}, {after}) exceed its {n} logits"
            )));
        }
        start.extend_from_slice(&logits.start[before..n - after]);
        end.extend_from_slice(&logits.end[before..n - after]);
    }

    Ok((start, end))
}

// ─── ReaderAnswers ────────────────────────────────────────────────────────────
/// Lazy, best-first answers. Stops at the first answer below either
/// threshold; a decoder that runs dry before top_k ends the sequence
/// with `ReaderError::DecoderExhausted`.
pub struct ReaderAnswers<'a> {
    spans:                        BestSpans<'a>,
    threshold_reader:             f64,
    threshold_answer_in_document: f64,
    done:                         bool,
}

impl Iterator for ReaderAnswers<'_> {
    type Item = Result<MachineReaderAnswer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let span = match self.spans.next()? {
            Ok(span) => span,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        // No answer-in-document model yet; the hook always scores 0.
        let score_answer_in_document = 0.0;
        if span.score < self.threshold_reader
            || score_answer_in_document < self.threshold_answer_in_document
        {
            self.done = true;
            return None;
        }

        let answer = MachineReaderAnswer::new(
            span.answer_text,
            (Some(span.character_span.start), Some(span.character_span.end)),
            span.long_answer_text,
            (Some(span.long_character_span.start), Some(span.long_character_span.end)),
            span.score,
            score_answer_in_document,
        )
        .map(|a| a.with_token_spans(span.token_span, span.long_token_span));

        self.done = answer.is_err();
        Some(answer)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::Tokenized;
    use crate::ml::hashed::HashedReaderModel;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    const CONTEXT: &str = "Super Bowl 50 was an American football game to determine the champion of the \
        National Football League (NFL) for the 2015 season. The American Football Conference (AFC) \
        champion Denver Broncos defeated the National Football Conference (NFC) champion Carolina \
        Panthers 24–10 to earn their third Super Bowl title. The game was played on February 7, 2016, \
        at Levi's Stadium in the San Francisco Bay Area at Santa Clara, California.";
    const QUESTION: &str = "Which NFL team represented the AFC at Super Bowl 50?";
    const BEFORE:   &str = "This is some before text. ";
    const AFTER:    &str = " This is some text to go afterwards.";

    fn reader() -> MachineReader<HashedReaderModel> {
        MachineReader::new(HashedReaderModel::with_embedding_dim(16))
    }

    /// Counts embedding and scoring calls on top of the hashed model.
    #[derive(Default)]
    struct CountingModel {
        inner: HashedReaderModel,
        calls: Cell<usize>,
    }

    impl ReaderModel for CountingModel {
        fn tokenize(&self, text: &str) -> Result<Tokenized> {
            self.inner.tokenize(text)
        }

        fn get_document_embedding(&self, text: &str) -> Result<Array2<f32>> {
            self.calls.set(self.calls.get() + 1);
            self.inner.get_document_embedding(text)
        }

        fn get_logits(&self, question: &str, embedding: &Array2<f32>) -> Result<SpanLogits> {
            self.calls.set(self.calls.get() + 1);
            self.inner.get_logits(question, embedding)
        }
    }

    fn flat_logits(n: usize) -> SpanLogits {
        SpanLogits::new(vec![0.0; n], vec![0.0; n])
    }

    #[test]
    fn test_get_answers_produces_answers() {
        let answers: Vec<_> = reader()
            .get_answers(&ReaderConfig::default(), CONTEXT, QUESTION)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(answers.len(), 1);
        let a = &answers[0];
        let span = a.span.unwrap();
        assert_eq!(&CONTEXT[span.start..span.end], a.text);
        assert!(a.long_text.contains(&a.text));
        assert_eq!(a.score_answer_in_document, 0.0);
    }

    #[test]
    fn test_get_answers_produces_top_k_answers() {
        let cfg     = ReaderConfig::default().with_top_k(10);
        let answers = reader().get_answers(&cfg, CONTEXT, QUESTION).unwrap();
        assert_eq!(answers.collect::<Result<Vec<_>>>().unwrap().len(), 10);
    }

    #[test]
    fn test_answers_from_precomputed_logits() {
        let mr  = reader();
        let cfg = ReaderConfig::default().with_top_k(10);

        let (logits, overlaps) = mr.get_logits(CONTEXT, QUESTION, "", "", None).unwrap();
        assert_eq!(overlaps, (0, 0));

        let answers = mr.get_answers_from_logits(&cfg, &[logits], &[overlaps], CONTEXT).unwrap();
        assert_eq!(answers.count(), 10);
    }

    #[test]
    fn test_repeated_token_document() {
        let doc = vec!["the"; 500].join(" ");
        let mr  = reader();

        let one = mr.get_answers(&ReaderConfig::default(), &doc, "what?").unwrap();
        assert_eq!(one.count(), 1);

        let ten: Vec<MachineReaderAnswer> = mr
            .get_answers(&ReaderConfig::default().with_top_k(10), &doc, "what?")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(ten.len(), 10);
        for (i, a) in ten.iter().enumerate() {
            for b in &ten[i + 1..] {
                assert!(!a.token_span.unwrap().overlaps(&b.token_span.unwrap()));
            }
        }
    }

    #[test]
    fn test_embedding_includes_overlaps() {
        let mr  = reader();
        let emb = mr.get_document_embedding(CONTEXT, BEFORE, AFTER).unwrap();

        let count = |t: &str| mr.model().tokenize(t).unwrap().len();
        assert_eq!(emb.nrows(), count(CONTEXT) + count(BEFORE) + count(AFTER));
    }

    #[test]
    fn test_get_logits_shape_with_and_without_embedding() {
        let mr    = reader();
        let count = |t: &str| mr.model().tokenize(t).unwrap().len();
        let total = count(CONTEXT) + count(BEFORE) + count(AFTER);

        let (fresh, overlaps) = mr.get_logits(CONTEXT, QUESTION, BEFORE, AFTER, None).unwrap();
        assert_eq!(fresh.start.len(), total);
        assert_eq!(fresh.end.len(), total);
        assert_eq!(overlaps, (count(BEFORE), count(AFTER)));

        let emb = mr.get_document_embedding(CONTEXT, BEFORE, AFTER).unwrap();
        let (cached, overlaps) = mr.get_logits(CONTEXT, QUESTION, BEFORE, AFTER, Some(&emb)).unwrap();
        assert_eq!(cached, fresh);
        assert_eq!(overlaps, (count(BEFORE), count(AFTER)));
    }

    #[test]
    fn test_empty_document_fails_before_model_call() {
        let mr = MachineReader::new(CountingModel::default());

        let err = mr.get_answers(&ReaderConfig::default(), "", QUESTION).err().unwrap();
        assert!(matches!(err, ReaderError::EmptyInput(_)));
        assert!(matches!(
            mr.get_document_embedding("  \n", "", "").unwrap_err(),
            ReaderError::EmptyInput(_)
        ));
        assert_eq!(mr.model().calls.get(), 0);
    }

    #[test]
    fn test_empty_question_fails_before_model_call() {
        let mr  = MachineReader::new(CountingModel::default());
        let err = mr.get_logits(CONTEXT, " ", "", "", None).unwrap_err();
        assert!(matches!(err, ReaderError::EmptyInput(_)));
        assert_eq!(mr.model().calls.get(), 0);
    }

    #[test]
    fn test_overlap_token_accounting_mismatch() {
        // "abc" + "def" tokenizes as one word, not two
        let err = reader().get_logits("def", QUESTION, "abc", "", None).unwrap_err();
        assert!(matches!(err, ReaderError::TokenCountMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn test_stitches_chunks_without_overlaps() {
        // 120 - 10 = 110 and 80 - 15 = 65 → 175 tokens
        let logits   = [flat_logits(120), flat_logits(80)];
        let overlaps = [(10, 0), (0, 15)];

        let (start, end) = stitch(&logits, &overlaps).unwrap();
        assert_eq!(start.len(), 175);
        assert_eq!(end.len(), 175);

        let full_text = vec!["w"; 175].join(" ");
        let answers   = reader()
            .get_answers_from_logits(&ReaderConfig::default(), &logits, &overlaps, &full_text)
            .unwrap();
        assert_eq!(answers.count(), 1);

        let short_text = vec!["w"; 174].join(" ");
        let err = reader()
            .get_answers_from_logits(&ReaderConfig::default(), &logits, &overlaps, &short_text)
            .err()
            .unwrap();
        assert!(matches!(err, ReaderError::TokenCountMismatch { expected: 174, actual: 175 }));
    }

    #[test]
    fn test_stitching_keeps_chunk_order() {
        let first  = SpanLogits::new(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]);
        let second = SpanLogits::new(vec![7.0, 8.0, 9.0], vec![10.0, 11.0, 12.0]);

        let (start, end) = stitch(&[first, second], &[(0, 1), (1, 0)]).unwrap();
        assert_eq!(start, vec![1.0, 2.0, 8.0, 9.0]);
        assert_eq!(end, vec![4.0, 5.0, 11.0, 12.0]);
    }

    #[test]
    fn test_structural_preconditions() {
        let mr  = reader();
        let cfg = ReaderConfig::default();

        let no_logits = mr.get_answers_from_logits(&cfg, &[], &[(0, 0)], "a").err().unwrap();
        assert!(matches!(no_logits, ReaderError::InvalidStructure(_)));

        let no_overlaps = mr.get_answers_from_logits(&cfg, &[flat_logits(1)], &[], "a").err().unwrap();
        assert!(matches!(no_overlaps, ReaderError::InvalidStructure(_)));

        let mismatched = mr
            .get_answers_from_logits(&cfg, &[flat_logits(1), flat_logits(1)], &[(0, 0)], "a b")
            .err()
            .unwrap();
        assert!(matches!(mismatched, ReaderError::InvalidStructure(_)));

        let oversized = mr.get_answers_from_logits(&cfg, &[flat_logits(3)], &[(2, 2)], "a").err().unwrap();
        assert!(matches!(oversized, ReaderError::InvalidStructure(_)));
    }

    #[test]
    fn test_reader_threshold_stops_early() {
        let mut cfg = ReaderConfig::default().with_top_k(5);
        cfg.threshold_reader = 0.5;

        // Peaked logits: the first answer clears 0.5, nothing after it can
        let mut start = vec![0.0f32; 6];
        let mut end   = vec![0.0f32; 6];
        start[1] = 5.0;
        end[2]   = 5.0;

        let answers: Vec<_> = reader()
            .get_answers_from_logits(&cfg, &[SpanLogits::new(start, end)], &[(0, 0)], "a b c d e f")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].text, "b c");
    }

    #[test]
    fn test_positive_answer_in_document_threshold_filters_everything() {
        let mut cfg = ReaderConfig::default().with_top_k(2);
        cfg.threshold_answer_in_document = 0.1;

        let answers = reader().get_answers(&cfg, CONTEXT, QUESTION).unwrap();
        assert_eq!(answers.count(), 0);
    }

    #[test]
    fn test_exhaustion_is_surfaced() {
        let cfg     = ReaderConfig::default().with_top_k(3);
        let results: Vec<_> = reader().get_answers(&cfg, "solo", "q").unwrap().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ReaderError::DecoderExhausted { requested: 3, produced: 1 })
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = ReaderConfig::default().with_top_k(0);
        let err = reader().get_answers(&cfg, CONTEXT, QUESTION).err().unwrap();
        assert!(matches!(err, ReaderError::InvalidConfig(_)));
    }
}
