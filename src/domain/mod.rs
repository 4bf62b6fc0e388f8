// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits describing what the reader works
// with: documents, answers, configuration, and the model seam.
//
// Rules for this layer:
//   - NO burn or tokenizers types
//   - NO file I/O, except loading a config file
//   - Only plain data and the traits other layers implement

/// A loaded document
pub mod document;

/// The validated answer record and its spans
pub mod answer;

/// Reader thresholds, top_k and decoder constants
pub mod config;

/// ReaderModel and DocumentSource abstractions
pub mod traits;
