// ============================================================
// Layer 7 — Tokenizer Store
// ============================================================
// Builds, saves, and loads the word-level tokenizer the neural
// reader uses.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper, so instead of training we write the
// tokenizer JSON ourselves and load it with Tokenizer::from_file.
//
// Layout of tokenizer.json:
//   normalizer     BertNormalizer (lowercase, clean text)
//   pre_tokenizer  Whitespace     (\w+ | [^\w\s]+ pieces)
//   model          WordLevel      (unknown words → [UNK])
//
// Ids are dense so they always index into the embedding table:
//   0 [PAD]  1 [UNK]  2 [CLS]  3 [SEP]  4 [MASK]  5.. words by
//   descending corpus frequency, ties broken alphabetically.

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::{collections::HashMap, fs, path::PathBuf};
use tokenizers::Tokenizer;

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;

const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn exists(&self) -> bool {
        self.dir.join(TOKENIZER_FILE).exists()
    }

    /// Load the saved tokenizer, or build one from `texts` if none exists yet.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.dir.display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
    }

    /// Write a tokenizer whose vocabulary holds the `vocab_size - 5`
    /// most frequent pieces of `texts`, then load it back.
    pub fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        anyhow::ensure!(
            vocab_size > SPECIAL_TOKENS.len(),
            "vocab_size must exceed the {} special tokens",
            SPECIAL_TOKENS.len()
        );
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // ── Step 1: word frequencies ──────────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for piece in pre_tokenize(&text.to_lowercase()) {
                *freq.entry(piece.to_string()).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size - SPECIAL_TOKENS.len());

        // ── Step 2: dense vocabulary ──────────────────────────────────────────
        let mut vocab = Map::new();
        for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
            vocab.insert(token.to_string(), json!(id));
        }
        for (word, _) in &words {
            let next_id = vocab.len();
            vocab.entry(word.clone()).or_insert_with(|| json!(next_id));
        }
        let vocab_len = vocab.len();

        // ── Step 3: HuggingFace tokenizer JSON ────────────────────────────────
        let added_tokens: Vec<Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, token)| json!({
                "id": id, "content": token,
                "single_word": false, "lstrip": false, "rstrip": false,
                "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.dir.join(TOKENIZER_FILE);
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!("Tokenizer built with {} entries, saved to '{}'", vocab_len, path.display());

        self.load()
    }
}

/// Split like the Whitespace pre-tokenizer: runs of word characters,
/// and runs of anything else that is not whitespace.
fn pre_tokenize(text: &str) -> Vec<&str> {
    let mut pieces  = Vec::new();
    // (byte start, is a word run)
    let mut current: Option<(usize, bool)> = None;

    for (i, c) in text.char_indices() {
        let class = (!c.is_whitespace()).then(|| c.is_alphanumeric() || c == '_');
        if let Some((s, word)) = current {
            if class == Some(word) {
                continue;
            }
            pieces.push(&text[s..i]);
        }
        current = class.map(|word| (i, word));
    }
    if let Some((s, _)) = current {
        pieces.push(&text[s..]);
    }
    pieces
}
