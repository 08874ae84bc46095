// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, hands off to a Layer 2 use case
// and prints the result. Nothing is computed here.
//
//   train       — fit the model, write checkpoints
//   evaluate    — mean loss of a checkpoint on a dataset
//   generate    — question/answer for one context
//   flashcards  — deck JSON for a document
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, FlashcardsArgs, GenerateArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "qa-generator",
    version,
    about = "Train a seq2seq transformer that writes question/answer flashcards from text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)      => run_train(args),
            Commands::Evaluate(args)   => run_evaluate(args),
            Commands::Generate(args)   => run_generate(args),
            Commands::Flashcards(args) => run_flashcards(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let base = match &args.config {
        Some(path) => TrainConfig::from_file(path)?,
        None       => TrainConfig::default(),
    };
    let cfg = args.apply(base);
    tracing::info!("Starting training on '{}'", cfg.train_file);

    let summary = TrainUseCase::new(cfg.clone()).execute()?;

    println!("Training completed!");
    match summary.best_step {
        Some(step) => println!(
            "Best validation loss {:.4} at step {} ({} steps, {} validations)",
            summary.best_val_loss, step, summary.steps, summary.validations
        ),
        None => println!("No validation ran in {} steps; only the final model was saved", summary.steps),
    }
    println!("Final model and tokenizer saved in '{}'", cfg.checkpoint_dir);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let use_case = EvaluateUseCase {
        checkpoint_dir: args.checkpoint_dir,
        data_file:      args.data_file,
        kind:           args.checkpoint.into(),
        batch_size:     args.batch_size,
        max_examples:   args.max_examples,
        device:         args.device.into(),
    };
    let loss = use_case.execute()?;
    println!("Final Evaluation Loss: {:.4}", loss);
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let use_case = GenerateUseCase {
        checkpoint_dir: args.checkpoint_dir,
        kind:           args.checkpoint.into(),
        settings:       args.decoding.into(),
        device:         args.device.into(),
    };

    match use_case.execute(&args.context)? {
        Ok(pair) => {
            println!("question: {}", pair.question);
            println!("answer: {}", pair.answer);
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Malformed generation: {:?}", e.raw_output());
            Err(e.into())
        }
    }
}

fn run_flashcards(args: FlashcardsArgs) -> Result<()> {
    use crate::application::flashcards_use_case::FlashcardsUseCase;

    let use_case = FlashcardsUseCase {
        document:       args.document,
        checkpoint_dir: args.checkpoint_dir,
        kind:           args.checkpoint.into(),
        settings:       args.decoding.into(),
        max_words:      args.max_words,
        subject:        args.subject,
        output:         args.output,
        device:         args.device.into(),
    };

    let (deck, path) = use_case.execute()?;
    println!(
        "Wrote {} flashcards for '{}' to '{}'",
        deck.flashcards.len(),
        deck.subject,
        path.display()
    );
    Ok(())
}
