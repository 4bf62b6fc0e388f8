// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `ask` and `init`, and all their
// configurable flags.
//
// clap's derive macros generate the --help text, the errors
// for missing args, and the string → number conversions.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::init_use_case::InitConfig;
use crate::domain::config::ReaderConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one or more questions about a set of documents
    Ask(AskArgs),

    /// Build a tokenizer and an initial neural checkpoint from documents
    Init(InitArgs),
}

// ─── ask ──────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to answer; repeat the flag to ask several
    #[arg(long = "question", short = 'q', required = true)]
    pub questions: Vec<String>,

    /// A document, or a directory of .docx / .txt / .md files
    #[arg(long, default_value = "data/docs")]
    pub docs: PathBuf,

    /// Checkpoint directory for the neural reader.
    /// Without it, a deterministic hashed stand-in model is used.
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// JSON reader config; the flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of answers per question and document
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Stop at the first answer whose reader score is below this
    #[arg(long)]
    pub threshold_reader: Option<f64>,

    /// Stop at the first answer whose answer-in-document score is below this
    #[arg(long)]
    pub threshold_answer_in_document: Option<f64>,

    /// Words owned by each document chunk
    #[arg(long, default_value_t = 200)]
    pub chunk_words: usize,

    /// Words of neighbouring context each chunk is scored with
    #[arg(long, default_value_t = 20)]
    pub overlap_words: usize,

    /// Print answers as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl AskArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn reader_config(&self) -> Result<ReaderConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReaderConfig::from_json_file(path)?,
            None       => ReaderConfig::default(),
        };

        if let Some(top_k) = self.top_k {
            cfg.top_k = top_k;
        }
        if let Some(t) = self.threshold_reader {
            cfg.threshold_reader = t;
        }
        if let Some(t) = self.threshold_answer_in_document {
            cfg.threshold_answer_in_document = t;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

// ─── init ─────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct InitArgs {
    /// A document, or a directory of .docx / .txt / .md files
    #[arg(long, default_value = "data/docs")]
    pub docs: PathBuf,

    /// Directory to write the tokenizer, model config, and weights to
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Tokens per encoder window
    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,

    /// Hidden dimension of the encoder; also the embedding width
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Attention heads; d_model must be divisible by this
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    /// Stacked encoder layers
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Upper bound on the tokenizer vocabulary, special tokens included
    #[arg(long, default_value_t = 8192)]
    pub vocab_size: usize,
}

/// The application layer never sees clap types.
impl From<InitArgs> for InitConfig {
    fn from(a: InitArgs) -> Self {
        InitConfig {
            docs_path:      a.docs,
            checkpoint_dir: a.checkpoint_dir,
            max_seq_len:    a.max_seq_len,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            num_layers:     a.num_layers,
            d_ff:           a.d_ff,
            dropout:        a.dropout,
            vocab_size:     a.vocab_size,
        }
    }
}
