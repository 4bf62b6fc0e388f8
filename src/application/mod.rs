// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination on top of the lower layers:
//
//   machine_reader.rs — logits in, ranked answers out; the
//                       stitching, softmax, decoding, and
//                       threshold filtering for one question
//
//   ask_use_case.rs   — documents and questions in, answers per
//                       document out; embeds each chunk once
//
//   init_use_case.rs  — provisions a checkpoint directory for
//                       the neural reader
//
// No printing here (that's Layer 1) and no model math (that's
// Layers 5 and 6).

/// Answer extraction from model logits
pub mod machine_reader;

/// The question-answering workflow over a document corpus
pub mod ask_use_case;

/// Checkpoint provisioning workflow
pub mod init_use_case;
