// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Gets documents from disk into the shape the reader wants:
//
//   .docx / .txt / .md files
//       │
//       ▼
//   DocumentLoader   → reads files, extracts raw text
//       │
//       ▼
//   Preprocessor     → normalises whitespace and control chars
//       │
//       ▼
//   Chunker          → tiles long documents into model-sized
//                      windows with before/after overlap text
//
// Each step is independently testable and replaceable.

/// Loads documents from a file or directory
pub mod loader;

/// Cleans and normalises raw extracted text
pub mod preprocessor;

/// Splits long documents into overlapping windows
pub mod chunker;
