// ============================================================
// Layer 7 — Infrastructure Layer
// ============================================================
// Persistence for the neural reader:
//
//   checkpoint.rs      — ReaderNet weights (Burn CompactRecorder)
//                        and model_config.json, so a reader can
//                        rebuild the exact architecture it loads
//
//   tokenizer_store.rs — Builds a word-level tokenizer from the
//                        document corpus, or loads the saved one,
//                        so every run shares one vocabulary
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;
