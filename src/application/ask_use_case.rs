// ============================================================
// Layer 2 — AskUseCase
// ============================================================
// Answers a batch of questions against every document:
//
//   Step 1: Load documents                 (Layer 4 - data)
//   Step 2: Clean each document            (Layer 4 - data)
//   Step 3: Split it into overlap chunks   (Layer 4 - data)
//   Step 4: Embed every chunk ONCE         (Layer 6 - ml)
//   Step 5: Per question, score each chunk
//           with its cached embedding and
//           decode over the whole document (Layer 2 - reader)
//
// Embedding is question-independent and the expensive step, so
// asking ten questions costs one embedding pass per chunk, not
// ten.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::machine_reader::MachineReader;
use crate::data::{chunker::Chunker, preprocessor::Preprocessor};
use crate::domain::answer::MachineReaderAnswer;
use crate::domain::config::ReaderConfig;
use crate::domain::document::Document;
use crate::domain::traits::{DocumentSource, ReaderModel};
use crate::error::ReaderError;

/// Answers to one question from one document, best first.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnswers {
    pub source:   String,
    pub question: String,
    pub answers:  Vec<MachineReaderAnswer>,
}

pub struct AskUseCase<M> {
    reader:       MachineReader<M>,
    config:       ReaderConfig,
    chunker:      Chunker,
    preprocessor: Preprocessor,
}

impl<M: ReaderModel> AskUseCase<M> {
    pub fn new(model: M, config: ReaderConfig, chunker: Chunker) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader: MachineReader::new(model),
            config,
            chunker,
            preprocessor: Preprocessor::new(),
        })
    }

    /// Answer every question against every document `source` yields.
    pub fn execute(&self, source: &dyn DocumentSource, questions: &[String]) -> Result<Vec<DocumentAnswers>> {
        let documents = source.load_all()?;
        if documents.is_empty() {
            tracing::warn!("No documents found");
        }

        let mut results = Vec::new();
        for doc in &documents {
            let answers = self
                .answer_document(doc, questions)
                .with_context(|| format!("Cannot answer questions on '{}'", doc.source))?;
            results.extend(answers);
        }

        tracing::info!(
            "Answered {} question(s) over {} document(s)",
            questions.len(),
            documents.len()
        );
        Ok(results)
    }

    /// Answer every question against one document.
    ///
    /// Character spans refer to the CLEANED document text.
    pub fn answer_document(&self, doc: &Document, questions: &[String]) -> Result<Vec<DocumentAnswers>> {
        let cleaned = doc.with_text(self.preprocessor.clean(&doc.text));
        if cleaned.is_blank() {
            tracing::warn!("Skipping '{}': no text after cleaning", doc.source);
            return Ok(Vec::new());
        }

        let chunks = self.chunker.split(&cleaned.text);
        let embeddings = chunks
            .iter()
            .map(|c| self.reader.get_document_embedding(c.text, c.before_overlap, c.after_overlap))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!("'{}': {} chunk(s) embedded", doc.source, chunks.len());

        let mut results = Vec::with_capacity(questions.len());
        for question in questions {
            let mut logits   = Vec::with_capacity(chunks.len());
            let mut overlaps = Vec::with_capacity(chunks.len());
            for (chunk, embedding) in chunks.iter().zip(&embeddings) {
                let (l, o) = self.reader.get_logits(
                    chunk.text,
                    question,
                    chunk.before_overlap,
                    chunk.after_overlap,
                    Some(embedding),
                ).map_err(|e| flag_upstream(&doc.source, e))?;
                logits.push(l);
                overlaps.push(o);
            }

            let mut answers = Vec::with_capacity(self.config.top_k);
            for answer in self.reader.get_answers_from_logits(&self.config, &logits, &overlaps, &cleaned.text)? {
                match answer {
                    Ok(a) => answers.push(a),
                    Err(ReaderError::DecoderExhausted { requested, produced }) => {
                        tracing::info!(
                            "'{}': only {produced} of {requested} answers available for {question:?}",
                            doc.source
                        );
                        break;
                    }
                    Err(e) => return Err(flag_upstream(&doc.source, e).into()),
                }
            }

            results.push(DocumentAnswers {
                source:   doc.source.clone(),
                question: question.clone(),
                answers,
            });
        }

        Ok(results)
    }
}

/// Tokenizer/model disagreements usually mean a checkpoint and its
/// tokenizer were built separately; say so before the error bubbles up.
fn flag_upstream(source: &str, e: ReaderError) -> ReaderError {
    if e.is_upstream_inconsistency() {
        tracing::warn!("'{source}': tokenizer and model disagree ({e}); rebuild the checkpoint");
    }
    e
}
