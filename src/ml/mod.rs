// ============================================================
// Layer 6 — ML / Model Layer
// ============================================================
// Concrete ReaderModel implementations. The burn-specific code
// lives only in model.rs and neural.rs; everything above this
// layer sees the ReaderModel trait and ndarray matrices.
//
//   model.rs   — ReaderNet: transformer encoder with a
//                question-conditioned start/end span head
//
//   neural.rs  — NeuralReaderModel: tokenizer + ReaderNet on the
//                CPU backend, loaded from a checkpoint directory
//
//   hashed.rs  — HashedReaderModel: deterministic random scores,
//                for tests and for running without a checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

/// Transformer encoder and span head
pub mod model;

/// Production reader model backed by ReaderNet
pub mod neural;

/// Seeded random stand-in reader model
pub mod hashed;
