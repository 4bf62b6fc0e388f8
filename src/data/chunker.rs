// ============================================================
// Layer 4 — Document Chunker
// ============================================================
// Splits a long document into windows the model can take, while
// keeping each window's neighbourhood as overlap context.
//
// Unlike a plain sliding window, the chunk TEXTS tile the
// document exactly (no word belongs to two chunks) and the
// overlap travels separately as before/after strings:
//
//   document:  A B C D E F G H I J        chunk_words = 4
//                                         overlap_words = 2
//   chunk 0:   before ""     text "A B C D "  after "E F "
//   chunk 1:   before "C D " text "E F G H "  after "I J"
//   chunk 2:   before "G H " text "I J"       after ""
//
// The model reads before + text + after, so answers near a
// boundary still see their context; the reader then trims the
// overlap tokens back off and stitches the chunks into one
// document-wide distribution. Because the texts concatenate to
// the original string, stitched token offsets line up with it.
//
// Splits happen only at whitespace, so tokenizing the pieces and
// tokenizing the whole give the same token count.

/// One window of a document, borrowed from the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChunk<'a> {
    pub before_overlap: &'a str,
    pub text:           &'a str,
    pub after_overlap:  &'a str,
}

pub struct Chunker {
    /// Words owned by each chunk
    chunk_words: usize,
    /// Words of context borrowed from each neighbour
    overlap_words: usize,
}

impl Chunker {
    /// # Panics
    /// Panics if `chunk_words` is 0: the document could never be consumed.
    pub fn new(chunk_words: usize, overlap_words: usize) -> Self {
        assert!(chunk_words > 0, "chunk_words must be at least 1");
        Self { chunk_words, overlap_words }
    }

    pub fn split<'a>(&self, text: &'a str) -> Vec<DocumentChunk<'a>> {
        let word_starts = word_starts(text);
        let n           = word_starts.len();
        if n == 0 {
            return Vec::new();
        }

        // Byte position where word k begins; chunk 0 also owns any
        // leading whitespace and the last chunk owns the tail.
        let bound = |k: usize| -> usize {
            if k == 0 {
                0
            } else if k >= n {
                text.len()
            } else {
                word_starts[k]
            }
        };

        (0..self.num_chunks(n))
            .map(|c| c * self.chunk_words)
            .map(|start| {
                let end = (start + self.chunk_words).min(n);
                DocumentChunk {
                    before_overlap: &text[bound(start.saturating_sub(self.overlap_words))..bound(start)],
                    text:           &text[bound(start)..bound(end)],
                    after_overlap:  &text[bound(end)..bound(end + self.overlap_words)],
                }
            })
            .collect()
    }

    /// How many chunks a text of `word_count` words produces.
    pub fn num_chunks(&self, word_count: usize) -> usize {
        word_count.div_ceil(self.chunk_words)
    }
}

/// Byte index of the first character of every whitespace-separated word.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts   = Vec::new();
    let mut in_space = true;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space && !space {
            starts.push(i);
        }
        in_space = space;
    }
    starts
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunks_with_overlap() {
        let chunks = Chunker::new(4, 2).split("A B C D E F G H I J");
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[1],
            DocumentChunk { before_overlap: "C D ", text: "E F G H ", after_overlap: "I J" }
        );
        assert_eq!(chunks[0].before_overlap, "");
        assert_eq!(chunks[2].after_overlap, "");
    }

    #[test]
    fn test_texts_tile_the_document() {
        let doc    = "  Super Bowl 50 was\nan American football game   to determine the champion ";
        let chunks = Chunker::new(3, 5).split(doc);
        let joined: String = chunks.iter().map(|c| c.text).collect();
        assert_eq!(joined, doc);
    }

    #[test]
    fn test_overlap_is_clipped_at_document_edges() {
        let chunks = Chunker::new(2, 10).split("a b c d");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].after_overlap, "c d");
        assert_eq!(chunks[1].before_overlap, "a b ");
    }

    #[test]
    fn test_short_text_gives_one_chunk() {
        let chunks = Chunker::new(100, 10).split("just a few words");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just a few words");
    }

    #[test]
    fn test_empty_text_gives_no_chunks() {
        assert!(Chunker::new(5, 2).split(" \n ").is_empty());
    }

    #[test]
    fn test_num_chunks() {
        let c = Chunker::new(4, 1);
        assert_eq!(c.num_chunks(0), 0);
        assert_eq!(c.num_chunks(10), 3);
        assert_eq!(c.num_chunks(10), c.split("A B C D E F G H I J").len());
    }

    #[test]
    #[should_panic]
    fn test_zero_chunk_size_panics() {
        let _ = Chunker::new(0, 2);
    }
}
