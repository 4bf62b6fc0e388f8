// ============================================================
// Layer 3 — Reader Configuration
// ============================================================
// Two plain value types:
//
//   ReaderConfig  — what the caller asks for: how many answers
//                   (top_k) and the minimum scores an answer
//                   must reach to be returned.
//
//   DecoderConfig — the span decoder's tuning constants. The
//                   defaults reproduce the reference behaviour
//                   exactly; change them only deliberately.
//
// Both derive Serialize/Deserialize with #[serde(default)], so a
// JSON file only needs the fields it wants to override:
//
//   { "top_k": 5, "decoding": { "margin": 0 } }

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReaderError, Result};

// ─── DecoderConfig ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Stop once the remaining start-probability mass drops below this
    pub epsilon: f64,

    /// Tokens zeroed on each side of a returned span (0 = exact span)
    pub margin: usize,

    /// Linear end-probability decay per token of distance from the best start
    pub decay_rate: f64,

    /// How many near-duplicate spans may be silently skipped per session
    pub retry_budget: usize,

    /// Tokens added on each side of the short answer to form the long answer
    pub long_answer_expansion: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            epsilon:               1e-6,
            margin:                1,
            decay_rate:            0.01,
            retry_budget:          100,
            long_answer_expansion: 20,
        }
    }
}

// ─── ReaderConfig ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Answers scoring below this stop the output
    pub threshold_reader: f64,

    /// Reserved. The answer-in-document score is always 0, so with
    /// the default of 0 this threshold never filters anything.
    pub threshold_answer_in_document: f64,

    /// Number of answers to decode (at least 1)
    pub top_k: usize,

    pub decoding: DecoderConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            threshold_reader:             0.0,
            threshold_answer_in_document: 0.0,
            top_k:                        1,
            decoding:                     DecoderConfig::default(),
        }
    }
}

impl ReaderConfig {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Load a config from JSON. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let cfg: Self = serde_json::from_str(&json).map_err(|e| {
            ReaderError::InvalidConfig(format!("'{}': {e}", path.as_ref().display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ReaderError::InvalidConfig("top_k must be at least 1".into()));
        }
        let d = &self.decoding;
        for (name, value) in [("epsilon", d.epsilon), ("decay_rate", d.decay_rate)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReaderError::InvalidConfig(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
