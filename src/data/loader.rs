// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Reads documents from a single file or every supported file in
// a directory:
//
//   .docx       → paragraphs pulled out with docx-rs
//   .txt / .md  → read as UTF-8
//
// A .docx is a ZIP of XML; docx-rs exposes it as
//   Document → Paragraph → Run → Text
// and we join each paragraph's text runs, one paragraph per line.
//
// A file that cannot be read is logged and skipped; it never
// aborts the whole load.

use anyhow::{Context, Result};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["docx", "txt", "md"];

pub struct DocumentLoader {
    path: PathBuf,
}

impl DocumentLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for DocumentLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if self.path.is_file() {
            return Ok(vec![load_single(&self.path)?]);
        }

        if !self.path.exists() {
            tracing::warn!("'{}' does not exist, returning an empty corpus", self.path.display());
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.path)
            .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_supported(p))
            .collect();
        // read_dir order is platform-dependent
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            match load_single(&path) {
                Ok(doc) => {
                    tracing::debug!("Loaded: {} ({} bytes)", doc.source, doc.text.len());
                    docs.push(doc);
                }
                Err(e) => tracing::warn!("Skipping '{}': {e:#}", path.display()),
            }
        }

        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.path.display());
        Ok(docs)
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn load_single(path: &Path) -> Result<Document> {
    let text = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("docx") => docx_text(path)?,
        _ => fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?,
    };

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(Document::new(source, text))
}

fn docx_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    let docx  = read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("docx-rs parse error in '{}': {e:?}", path.display()))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .filter(|text| !text.trim().is_empty())
        .collect();

    Ok(paragraphs.join("\n"))
}

/// Text runs of one paragraph, concatenated without separators.
fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    para.children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.children.iter())
        .filter_map(|rc| match rc {
            RunChild::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect()
}
