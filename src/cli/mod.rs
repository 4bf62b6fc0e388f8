// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction. Parses arguments
// with clap and delegates everything else to Layer 2.
//
// Two commands are supported:
//   1. `init` — builds a tokenizer and an initial checkpoint
//   2. `ask`  — answers questions about documents, with the
//               neural reader if a checkpoint is given, or the
//               hashed stand-in otherwise
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AskArgs, Commands, InitArgs};

use crate::application::{
    ask_use_case::{AskUseCase, DocumentAnswers},
    init_use_case::InitUseCase,
};
use crate::data::{chunker::Chunker, loader::DocumentLoader};
use crate::domain::{config::ReaderConfig, traits::ReaderModel};
use crate::ml::{hashed::HashedReaderModel, neural::NeuralReaderModel};

#[derive(Parser, Debug)]
#[command(
    name = "machine-reader",
    version,
    about = "Extract ranked answer spans from documents with an extractive reader."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. The CLI never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Ask(args)  => run_ask(args),
            Commands::Init(args) => run_init(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    tracing::info!("Initialising checkpoint from documents in: {}", args.docs.display());

    let dir = args.checkpoint_dir.clone();
    InitUseCase::new(args.into()).execute()?;

    println!("Checkpoint written to '{}'.", dir.display());
    Ok(())
}

fn run_ask(args: AskArgs) -> Result<()> {
    anyhow::ensure!(args.chunk_words > 0, "--chunk-words must be at least 1");

    let config  = args.reader_config()?;
    let chunker = Chunker::new(args.chunk_words, args.overlap_words);

    let results = match &args.checkpoint_dir {
        Some(dir) => answer_all(NeuralReaderModel::from_checkpoint(dir)?, config, chunker, &args)?,
        None => {
            tracing::warn!("No --checkpoint-dir given; using the hashed stand-in model");
            answer_all(HashedReaderModel::new(), config, chunker, &args)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_answers(&results);
    }
    Ok(())
}

fn answer_all<M: ReaderModel>(
    model:   M,
    config:  ReaderConfig,
    chunker: Chunker,
    args:    &AskArgs,
) -> Result<Vec<DocumentAnswers>> {
    let use_case = AskUseCase::new(model, config, chunker)?;
    use_case.execute(&DocumentLoader::new(&args.docs), &args.questions)
}

fn print_answers(results: &[DocumentAnswers]) {
    if results.is_empty() {
        println!("No answers.");
        return;
    }

    for r in results {
        println!("\n[{}] {}", r.source, r.question);
        if r.answers.is_empty() {
            println!("  (no answer above the thresholds)");
        }
        for (rank, a) in r.answers.iter().enumerate() {
            println!("  {}. {:?}  (score {:.4})", rank + 1, a.text, a.score_reader);
            println!("     … {} …", a.long_text.replace('\n', " "));
        }
    }
}
