#![recursion_limit = "256"]

//! Extractive question answering: decode ranked answer spans from a
//! reader model's start/end logits.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod decoding;
pub mod ml;
pub mod infra;
pub mod error;

pub use application::machine_reader::{MachineReader, ReaderAnswers};
pub use domain::answer::{MachineReaderAnswer, Span};
pub use domain::config::{DecoderConfig, ReaderConfig};
pub use domain::traits::ReaderModel;
pub use error::{ReaderError, Result};
