// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands: `train`, `evaluate`, `generate`, `flashcards`.
//
// clap types stop here: every Args struct is converted into
// an application-layer value before anything runs.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::infra::checkpoint::CheckpointKind;
use crate::ml::{decoding::DecodingSettings, DeviceKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the question/answer generator on a labelled dataset
    Train(TrainArgs),

    /// Mean loss of a trained checkpoint over a dataset
    Evaluate(EvaluateArgs),

    /// Generate a question and answer for one context
    Generate(GenerateArgs),

    /// Write a flashcard deck for a .docx or text document
    Flashcards(FlashcardsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    /// wgpu if a GPU adapter is present, else cpu
    Auto,
    Wgpu,
    Cpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Auto => DeviceKind::Auto,
            DeviceArg::Wgpu => DeviceKind::Wgpu,
            DeviceArg::Cpu  => DeviceKind::Cpu,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointArg {
    /// Parameters after the last epoch
    Final,
    /// Parameters with the lowest validation loss
    Best,
}

impl From<CheckpointArg> for CheckpointKind {
    fn from(c: CheckpointArg) -> Self {
        match c {
            CheckpointArg::Final => CheckpointKind::Final,
            CheckpointArg::Best  => CheckpointKind::Best,
        }
    }
}

// ─── train ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON file with a full or partial training config.
    /// Flags given on the command line override it.
    #[arg(long)]
    pub config: Option<String>,

    /// SQuAD v1.1 JSON or .jsonl file with {context, question, answer} rows
    #[arg(long)]
    pub train_file: Option<String>,

    /// Held-out dataset; without it a slice of the training data is used
    #[arg(long)]
    pub valid_file: Option<String>,

    /// Directory for checkpoints, tokenizer and metrics
    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    /// Tokens per source sequence, including </s>
    #[arg(long)]
    pub max_source_len: Option<usize>,

    /// Tokens per target sequence, including </s>
    #[arg(long)]
    pub max_target_len: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    /// Peak learning rate
    #[arg(long)]
    pub lr: Option<f64>,

    /// Steps of linear warmup before the linear decay
    #[arg(long)]
    pub warmup_steps: Option<usize>,

    /// Run validation every N optimiser steps
    #[arg(long)]
    pub valid_step: Option<usize>,

    #[arg(long)]
    pub weight_decay: Option<f32>,

    #[arg(long)]
    pub d_model: Option<usize>,

    /// d_model must be divisible by num_heads
    #[arg(long)]
    pub num_heads: Option<usize>,

    #[arg(long)]
    pub num_encoder_layers: Option<usize>,

    #[arg(long)]
    pub num_decoder_layers: Option<usize>,

    #[arg(long)]
    pub d_ff: Option<usize>,

    #[arg(long)]
    pub dropout: Option<f64>,

    /// Upper bound on vocabulary size, special tokens included
    #[arg(long)]
    pub vocab_size: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Share of the training file kept for training when no --valid-file is given
    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Only use the first N examples of the training file
    #[arg(long)]
    pub max_examples: Option<usize>,

    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

impl TrainArgs {
    /// Overlay the flags that were given onto `base`.
    pub fn apply(self, base: TrainConfig) -> TrainConfig {
        TrainConfig {
            train_file:         self.train_file.unwrap_or(base.train_file),
            valid_file:         self.valid_file.or(base.valid_file),
            checkpoint_dir:     self.checkpoint_dir.unwrap_or(base.checkpoint_dir),
            max_source_len:     self.max_source_len.unwrap_or(base.max_source_len),
            max_target_len:     self.max_target_len.unwrap_or(base.max_target_len),
            batch_size:         self.batch_size.unwrap_or(base.batch_size),
            epochs:             self.epochs.unwrap_or(base.epochs),
            lr:                 self.lr.unwrap_or(base.lr),
            warmup_steps:       self.warmup_steps.unwrap_or(base.warmup_steps),
            valid_step:         self.valid_step.unwrap_or(base.valid_step),
            weight_decay:       self.weight_decay.unwrap_or(base.weight_decay),
            d_model:            self.d_model.unwrap_or(base.d_model),
            num_heads:          self.num_heads.unwrap_or(base.num_heads),
            num_encoder_layers: self.num_encoder_layers.unwrap_or(base.num_encoder_layers),
            num_decoder_layers: self.num_decoder_layers.unwrap_or(base.num_decoder_layers),
            d_ff:               self.d_ff.unwrap_or(base.d_ff),
            dropout:            self.dropout.unwrap_or(base.dropout),
            vocab_size:         self.vocab_size.unwrap_or(base.vocab_size),
            seed:               self.seed.unwrap_or(base.seed),
            train_fraction:     self.train_fraction.unwrap_or(base.train_fraction),
            max_examples:       self.max_examples.or(base.max_examples),
            device:             self.device.map(DeviceKind::from).unwrap_or(base.device),
        }
    }
}

// ─── Shared generation flags ──────────────────────────────────────────────────
#[derive(Args, Debug, Clone)]
pub struct DecodingArgs {
    /// Maximum generated tokens
    #[arg(long, default_value_t = 128)]
    pub max_output_len: usize,

    /// 1 = greedy decoding
    #[arg(long, default_value_t = 1)]
    pub num_beams: usize,

    /// Length exponent when ranking finished beams
    #[arg(long, default_value_t = 1.0)]
    pub length_penalty: f32,
}

impl From<DecodingArgs> for DecodingSettings {
    fn from(a: DecodingArgs) -> Self {
        DecodingSettings {
            max_output_len: a.max_output_len,
            num_beams:      a.num_beams,
            length_penalty: a.length_penalty,
        }
    }
}

// ─── evaluate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Dataset to evaluate on (SQuAD JSON or .jsonl)
    #[arg(long)]
    pub data_file: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = CheckpointArg::Best)]
    pub checkpoint: CheckpointArg,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long)]
    pub max_examples: Option<usize>,

    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    pub device: DeviceArg,
}

// ─── generate ─────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text to write a question about
    #[arg(long)]
    pub context: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = CheckpointArg::Best)]
    pub checkpoint: CheckpointArg,

    #[command(flatten)]
    pub decoding: DecodingArgs,

    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    pub device: DeviceArg,
}

// ─── flashcards ───────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct FlashcardsArgs {
    /// .docx, .txt or .md file
    #[arg(long)]
    pub document: String,

    /// Deck subject (default: document file name)
    #[arg(long)]
    pub subject: Option<String>,

    /// Where to write the deck JSON (default: <document>_flashcards.json)
    #[arg(long)]
    pub output: Option<String>,

    /// Words per context chunk
    #[arg(long, default_value_t = 120)]
    pub max_words: usize,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, value_enum, default_value_t = CheckpointArg::Best)]
    pub checkpoint: CheckpointArg,

    #[command(flatten)]
    pub decoding: DecodingArgs,

    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    pub device: DeviceArg,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_flags_override_config_file_values() {
        let cli = Cli::try_parse_from([
            "qa-generator", "train", "--epochs", "3", "--device", "cpu", "--valid-step", "10",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let base = TrainConfig { epochs: 7, batch_size: 16, ..TrainConfig::default() };
        let cfg  = args.apply(base);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.valid_step, 10);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.device, DeviceKind::Cpu);
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["qa-generator", "generate", "--context", "Barry lives in Tripoli."]).unwrap();
        let Commands::Generate(args) = cli.command else { panic!("expected generate") };

        assert_eq!(CheckpointKind::from(args.checkpoint), CheckpointKind::Best);
        assert_eq!(DecodingSettings::from(args.decoding), DecodingSettings::default());
        assert_eq!(DeviceKind::from(args.device), DeviceKind::Auto);
    }
}
