// ============================================================
// Layer 6 — Neural Reader Model
// ============================================================
// The production ReaderModel: a word-level tokenizer plus the
// burn ReaderNet, run on the CPU NdArray backend.
//
//   tokenize               tokenizer.encode(text) without special
//                          tokens; offsets are bytes into `text`
//   get_document_embedding encode ids in windows of max_seq_len,
//                          stack the hidden states → (n, d_model)
//   get_logits             encode the question (first max_seq_len
//                          ids), score every embedding row
//
// Ids the network has no embedding row for are mapped to [UNK],
// so a tokenizer that grew after the checkpoint was written
// cannot index out of bounds.

use anyhow::Context;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
    tensor::TensorData,
};
use ndarray::Array2;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::domain::traits::{ReaderModel, SpanLogits, Tokenized};
use crate::error::{ReaderError, Result};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::tokenizer_store::{TokenizerStore, UNK_ID};
use crate::ml::model::{ReaderNet, ReaderNetConfig};

type ReaderBackend = NdArray;

pub struct NeuralReaderModel {
    net:       ReaderNet<ReaderBackend>,
    tokenizer: Tokenizer,
    config:    ReaderNetConfig,
    device:    NdArrayDevice,
}

impl NeuralReaderModel {
    pub fn new(net: ReaderNet<ReaderBackend>, tokenizer: Tokenizer, config: ReaderNetConfig) -> Self {
        Self { net, tokenizer, config, device: NdArrayDevice::default() }
    }

    /// Rebuild the network from `model_config.json` and load its weights
    /// and tokenizer from the same directory.
    pub fn from_checkpoint(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir    = dir.as_ref();
        let device = NdArrayDevice::default();

        let ckpt      = CheckpointManager::new(dir);
        let config    = ckpt.load_config()?.with_dropout(0.0);
        let net       = ckpt.load_model(config.init::<ReaderBackend>(&device), &device)?;
        let tokenizer = TokenizerStore::new(dir)
            .load()
            .with_context(|| format!("No tokenizer next to the checkpoint in '{}'", dir.display()))?;

        tracing::info!(
            "Neural reader loaded (d_model={}, layers={}, vocab={})",
            config.d_model, config.num_layers, config.vocab_size
        );
        Ok(Self { net, tokenizer, config, device })
    }

    fn token_ids(&self, text: &str) -> Result<Vec<i32>> {
        let encoding = self.tokenizer
            .encode(text, false)
            .map_err(|e| ReaderError::model(format!("tokenize: {e}")))?;

        Ok(encoding
            .get_ids()
            .iter()
            .map(|&id| if (id as usize) < self.config.vocab_size { id } else { UNK_ID })
            .map(|id| id as i32)
            .collect())
    }

    /// [1, len] → [1, len, d_model]
    fn encode_window(&self, ids: &[i32]) -> Tensor<ReaderBackend, 3> {
        let input = Tensor::<ReaderBackend, 1, Int>::from_ints(ids, &self.device).unsqueeze::<2>();
        self.net.encode(input)
    }
}

impl ReaderModel for NeuralReaderModel {
    fn tokenize(&self, text: &str) -> Result<Tokenized> {
        let encoding = self.tokenizer
            .encode(text, false)
            .map_err(|e| ReaderError::model(format!("tokenize: {e}")))?;

        Ok(Tokenized {
            tokens:  encoding.get_tokens().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
        })
    }

    fn get_document_embedding(&self, text: &str) -> Result<Array2<f32>> {
        let ids     = self.token_ids(text)?;
        let d_model = self.config.d_model;

        let mut flat = Vec::with_capacity(ids.len() * d_model);
        for window in ids.chunks(self.config.max_seq_len.max(1)) {
            let hidden = self.encode_window(window)
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| ReaderError::model(format!("read document states: {e:?}")))?;
            flat.extend(hidden);
        }

        Array2::from_shape_vec((ids.len(), d_model), flat)
            .map_err(|e| ReaderError::model(format!("document embedding shape: {e}")))
    }

    fn get_logits(&self, question: &str, document_embedding: &Array2<f32>) -> Result<SpanLogits> {
        let (n_tokens, d_model) = document_embedding.dim();
        if d_model != self.config.d_model {
            return Err(ReaderError::invalid_structure(format!(
                "embedding width {d_model} does not match the model's d_model {}",
                self.config.d_model
            )));
        }
        if n_tokens == 0 {
            return Ok(SpanLogits::default());
        }

        let mut question_ids = self.token_ids(question)?;
        question_ids.truncate(self.config.max_seq_len);
        if question_ids.is_empty() {
            return Err(ReaderError::empty_input("question has no tokens"));
        }

        let document = Tensor::<ReaderBackend, 2>::from_data(
            TensorData::new(document_embedding.iter().copied().collect::<Vec<f32>>(), [n_tokens, d_model]),
            &self.device,
        )
        .unsqueeze::<3>();
        let question = self.encode_window(&question_ids);

        let output = self.net.span_logits(document, question);
        let start  = output.start_logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ReaderError::model(format!("read start logits: {e:?}")))?;
        let end    = output.end_logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ReaderError::model(format!("read end logits: {e:?}")))?;

        Ok(SpanLogits::new(start, end))
    }
}
