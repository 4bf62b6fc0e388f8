// ============================================================
// Layer 7 — Checkpoint Manager
// ============================================================
// Saves and restores ReaderNet weights using Burn's
// CompactRecorder, next to the architecture they belong to.
//
// Directory layout:
//   checkpoints/
//     reader_net.mpk       ← weights (recorder adds the extension)
//     model_config.json    ← ReaderNetConfig
//     tokenizer.json       ← written by TokenizerStore
//
// The config is saved separately because the weights alone
// cannot rebuild the network: load_model() needs a ReaderNet of
// the exact same shape to load the record into.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::ml::model::{ReaderNet, ReaderNetConfig};

const WEIGHTS_FILE: &str = "reader_net";
const CONFIG_FILE:  &str = "model_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    pub fn has_config(&self) -> bool {
        self.dir.join(CONFIG_FILE).exists()
    }

    pub fn save_model<B: Backend>(&self, model: &ReaderNet<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        // Path without extension; the recorder adds it
        let path = self.dir.join(WEIGHTS_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;

        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend>(&self, model: ReaderNet<B>, device: &B::Device) -> Result<ReaderNet<B>> {
        let path   = self.dir.join(WEIGHTS_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load weights '{}'. Have you run 'init' first?", path.display())
            })?;

        tracing::info!("Loaded weights from '{}'", path.display());
        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &ReaderNetConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ReaderNetConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read config from '{}'. Have you run 'init' first?", path.display())
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed model config '{}'", path.display()))
    }
}
