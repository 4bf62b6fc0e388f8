// ============================================================
// Layer 6 — Hashed Reader Model (deterministic stand-in)
// ============================================================
// A ReaderModel with no weights at all. Scores are random but
// reproducible: every random stream is seeded from a SHA-256
// digest of its input, so the same document and question always
// produce the same embedding and the same logits.
//
//   tokenize               whitespace-separated words, byte offsets
//   get_document_embedding (num_tokens × 240) uniform randoms,
//                          seeded by the document text
//   get_logits             start: uniform randoms seeded by the
//                          question and the embedding's sum
//                          end:   start shifted right by 1–4 tokens,
//                          the gap filled with min(start)
//
// It exists to exercise the reader end to end (tests, demos,
// CLI without a checkpoint), never to find real answers.

use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::domain::traits::{ReaderModel, SpanLogits, Tokenized};
use crate::error::Result;

pub const DEFAULT_EMBEDDING_DIM: usize = 240;

#[derive(Debug, Clone)]
pub struct HashedReaderModel {
    embedding_dim: usize,
}

impl HashedReaderModel {
    pub fn new() -> Self {
        Self::with_embedding_dim(DEFAULT_EMBEDDING_DIM)
    }

    pub fn with_embedding_dim(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }
}

impl Default for HashedReaderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderModel for HashedReaderModel {
    fn tokenize(&self, text: &str) -> Result<Tokenized> {
        let mut out   = Tokenized::default();
        let mut start = None;

        for (i, c) in text.char_indices() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    out.tokens.push(text[s..i].to_string());
                    out.offsets.push((s, i));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            out.tokens.push(text[s..].to_string());
            out.offsets.push((s, text.len()));
        }

        Ok(out)
    }

    fn get_document_embedding(&self, text: &str) -> Result<Array2<f32>> {
        let n_tokens = self.tokenize(text)?.len();
        let mut rng  = StdRng::seed_from_u64(digest_seed(text));
        Ok(Array2::from_shape_fn((n_tokens, self.embedding_dim), |_| rng.gen::<f32>()))
    }

    fn get_logits(&self, question: &str, document_embedding: &Array2<f32>) -> Result<SpanLogits> {
        let n_tokens = document_embedding.nrows();

        let embedding_seed = (f64::from(document_embedding.sum()) * 1e6) as u64 % 100_000_000;
        let mut rng = StdRng::seed_from_u64(digest_seed(question).wrapping_add(embedding_seed));

        let start: Vec<f32> = (0..n_tokens).map(|_| rng.gen::<f32>()).collect();
        let shift           = rng.gen_range(1..5usize).min(n_tokens);
        let floor           = start.iter().copied().fold(f32::INFINITY, f32::min);

        let end: Vec<f32> = std::iter::repeat(floor)
            .take(shift)
            .chain(start[shift..].iter().copied())
            .collect();

        Ok(SpanLogits::new(start, end))
    }
}

/// First 8 bytes of the SHA-256 digest, as a seed.
fn digest_seed(text: &str) -> u64 {
    let digest    = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
