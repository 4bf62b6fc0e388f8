// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Provisions a checkpoint directory the neural reader can load:
//
//   Step 1: Load documents            (Layer 4 - data)
//   Step 2: Clean the text            (Layer 4 - data)
//   Step 3: Build / load tokenizer    (Layer 7 - infra)
//   Step 4: Save the model config     (Layer 7 - infra)
//   Step 5: Save initial weights      (Layer 7 - infra)
//
// The weights are freshly initialised, not trained. Answers from
// such a checkpoint are well-formed but meaningless until real
// weights are dropped into the same directory.

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, NdArray};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{loader::DocumentLoader, preprocessor::Preprocessor};
use crate::domain::traits::DocumentSource;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::model::ReaderNetConfig;

// ─── Init Configuration ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    pub docs_path:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub max_seq_len:    usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub dropout:        f64,
    pub vocab_size:     usize,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            docs_path:      PathBuf::from("data/docs"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            max_seq_len:    256,
            d_model:        128,
            num_heads:      4,
            num_layers:     2,
            d_ff:           512,
            dropout:        0.1,
            vocab_size:     8192,
        }
    }
}

impl InitConfig {
    fn model_config(&self) -> ReaderNetConfig {
        ReaderNetConfig::new(
            self.vocab_size, self.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff,
        )
        .with_dropout(self.dropout)
    }
}

// ─── InitUseCase ──────────────────────────────────────────────────────────────
pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        anyhow::ensure!(
            cfg.num_heads > 0 && cfg.d_model % cfg.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            cfg.d_model,
            cfg.num_heads
        );

        // ── Step 1 + 2: load and clean ────────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let texts: Vec<String> = DocumentLoader::new(&cfg.docs_path)
            .load_all()?
            .iter()
            .map(|d| preprocessor.clean(&d.text))
            .filter(|t| !t.is_empty())
            .collect();
        anyhow::ensure!(
            !texts.is_empty(),
            "No readable documents under '{}' to build a vocabulary from",
            cfg.docs_path.display()
        );

        // ── Step 3: tokenizer ─────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir)
            .load_or_build(&texts, cfg.vocab_size)?;

        // The network only needs rows for ids the tokenizer can emit
        let mut model_cfg = cfg.model_config();
        model_cfg.vocab_size = tokenizer.get_vocab_size(true).min(cfg.vocab_size).max(1);

        // ── Step 4 + 5: config and weights ────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(&model_cfg)?;

        let net = model_cfg.init::<NdArray>(&NdArrayDevice::default());
        ckpt.save_model(&net)
            .with_context(|| format!("Cannot initialise '{}'", cfg.checkpoint_dir.display()))?;

        tracing::warn!(
            "Checkpoint in '{}' holds untrained weights; answers will not be meaningful",
            cfg.checkpoint_dir.display()
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::ReaderModel;
    use crate::ml::neural::NeuralReaderModel;
    use std::fs;

    fn tiny(docs: PathBuf, checkpoint_dir: PathBuf) -> InitConfig {
        InitConfig {
            docs_path: docs,
            checkpoint_dir,
            max_seq_len: 16,
            d_model: 8,
            num_heads: 2,
            num_layers: 1,
            d_ff: 16,
            dropout: 0.0,
            vocab_size: 64,
        }
    }

    #[test]
    fn test_init_produces_loadable_checkpoint() {
        let docs = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        fs::write(docs.path().join("nfl.txt"), "The Denver Broncos won Super Bowl 50.").unwrap();

        InitUseCase::new(tiny(docs.path().into(), ckpt.path().into())).execute().unwrap();

        let saved = CheckpointManager::new(ckpt.path()).load_config().unwrap();
        // 5 special tokens + 8 distinct pieces
        assert_eq!(saved.vocab_size, 13);

        let model = NeuralReaderModel::from_checkpoint(ckpt.path()).unwrap();
        assert_eq!(model.get_document_embedding("Denver won").unwrap().dim(), (2, 8));
    }

    #[test]
    fn test_init_requires_documents() {
        let docs = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        assert!(InitUseCase::new(tiny(docs.path().into(), ckpt.path().into())).execute().is_err());
    }

    #[test]
    fn test_init_rejects_indivisible_heads() {
        let docs = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        let mut cfg = tiny(docs.path().into(), ckpt.path().into());
        cfg.num_heads = 3;
        assert!(InitUseCase::new(cfg).execute().is_err());
    }
}
