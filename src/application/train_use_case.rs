// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load labelled examples     (Layer 4 - data)
//   Step 2: Train / validation split   (Layer 4 - data)
//   Step 3: Build / load tokenizer     (Layer 6 - infra)
//   Step 4: Encode samples             (Layer 4 - data)
//   Step 5: Save run config            (Layer 6 - infra)
//   Step 6: Build model                (Layer 5 - ml)
//   Step 7: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{
    dataset::QaDataset,
    encoder::Seq2SeqEncoder,
    splitter::split_train_val,
    squad::open_examples,
};
use crate::domain::example::QaExample;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    cpu_device,
    model::{QaModel, QaModelConfig},
    trainer::{TrainSummary, TrainingRun},
    wgpu_device, BackendChoice, CpuTrainBackend, DeviceKind, WgpuTrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Written to
// train_config.json next to the checkpoints; can also be read
// from a JSON file, where missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_file:         String,
    /// Held-out set; when absent a slice of the training file is used
    pub valid_file:         Option<String>,
    pub checkpoint_dir:     String,
    pub max_source_len:     usize,
    pub max_target_len:     usize,
    pub batch_size:         usize,
    pub epochs:             usize,
    pub lr:                 f64,
    pub warmup_steps:       usize,
    pub valid_step:         usize,
    pub weight_decay:       f32,
    pub d_model:            usize,
    pub num_heads:          usize,
    pub num_encoder_layers: usize,
    pub num_decoder_layers: usize,
    pub d_ff:               usize,
    pub dropout:            f64,
    pub vocab_size:         usize,
    pub seed:               u64,
    pub train_fraction:     f64,
    pub max_examples:       Option<usize>,
    pub device:             DeviceKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:         "data/train-v1.1.json".to_string(),
            valid_file:         None,
            checkpoint_dir:     "checkpoints".to_string(),
            max_source_len:     512,
            max_target_len:     128,
            batch_size:         8,
            epochs:             10,
            lr:                 5e-5,
            warmup_steps:       0,
            valid_step:         5000,
            weight_decay:       0.01,
            d_model:            256,
            num_heads:          8,
            num_encoder_layers: 3,
            num_decoder_layers: 3,
            d_ff:               1024,
            dropout:            0.1,
            vocab_size:         32000,
            seed:               42,
            train_fraction:     0.9,
            max_examples:       None,
            device:             DeviceKind::Auto,
        }
    }
}

impl TrainConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read training config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid training config '{}'", path.display()))
    }

    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(self.epochs > 0, "epochs must be positive");
        anyhow::ensure!(self.valid_step > 0, "valid_step must be positive");
        anyhow::ensure!(self.lr > 0.0, "lr must be positive");
        anyhow::ensure!(
            self.max_source_len >= 2 && self.max_target_len >= 2,
            "max_source_len and max_target_len must be at least 2"
        );
        anyhow::ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        anyhow::ensure!((0.0..1.0).contains(&self.dropout), "dropout must be in [0, 1)");
        anyhow::ensure!(
            self.train_fraction > 0.0 && self.train_fraction < 1.0,
            "train_fraction must be between 0 and 1"
        );
        Ok(())
    }

    /// Model architecture for a vocabulary of `vocab_size` tokens.
    pub fn model_config(&self, vocab_size: usize) -> QaModelConfig {
        QaModelConfig::new(vocab_size, self.max_source_len, self.max_target_len)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_encoder_layers(self.num_encoder_layers)
            .with_num_decoder_layers(self.num_decoder_layers)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
    }
}

/// Texts the vocabulary is built from: templated contexts, questions, answers.
fn tokenizer_corpus(examples: &[QaExample]) -> Vec<String> {
    examples
        .iter()
        .flat_map(|e| {
            [
                Seq2SeqEncoder::source_text(&e.context),
                e.question.clone(),
                e.answer.clone(),
            ]
        })
        .collect()
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Validate the config, then run on the configured device.
    pub fn execute(&self) -> Result<TrainSummary> {
        self.config.validate()?;
        match self.config.device.select() {
            BackendChoice::Wgpu => self.execute_on::<WgpuTrainBackend>(wgpu_device()),
            BackendChoice::Cpu  => self.execute_on::<CpuTrainBackend>(cpu_device()),
        }
    }

    fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Load labelled examples ────────────────────────────────────
        let examples = open_examples(&cfg.train_file, cfg.max_examples)?;
        anyhow::ensure!(!examples.is_empty(), "No training examples in '{}'", cfg.train_file);

        // ── Step 2: Train / validation split ──────────────────────────────────
        let (train_examples, val_examples) = match &cfg.valid_file {
            Some(path) => (examples, open_examples(path, None)?),
            None       => split_train_val(examples, cfg.train_fraction, cfg.seed),
        };
        tracing::info!(
            "Split: {} train, {} validation",
            train_examples.len(),
            val_examples.len()
        );
        if val_examples.is_empty() {
            tracing::warn!("Validation set is empty; no best checkpoint will be written");
        }

        // ── Step 3: Build / load tokenizer ────────────────────────────────────
        // Built from the training split only
        let tok_store = TokenizerStore::new(&cfg.checkpoint_dir);
        let tokenizer = tok_store.load_or_build(&tokenizer_corpus(&train_examples), cfg.vocab_size)?;

        // ── Step 4: Encode samples ────────────────────────────────────────────
        let encoder       = Seq2SeqEncoder::new(&tokenizer, cfg.max_source_len, cfg.max_target_len)?;
        let train_dataset = QaDataset::new(encoder.encode_all(&train_examples)?);
        let val_dataset   = QaDataset::new(encoder.encode_all(&val_examples)?);

        // ── Step 5: Save run config ───────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir)?;
        checkpoints.save_train_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Build model ───────────────────────────────────────────────
        B::seed(cfg.seed);
        let model_config = cfg.model_config(tokenizer.get_vocab_size(true));
        let model: QaModel<B> = model_config.init(&device);
        tracing::info!(
            "Model ready: {}+{} layers, d_model={}, vocab={}",
            cfg.num_encoder_layers, cfg.num_decoder_layers, cfg.d_model, model_config.vocab_size
        );

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        let run = TrainingRun::<B> {
            cfg,
            model_config: &model_config,
            tokenizer:    &tokenizer,
            checkpoints:  &checkpoints,
            metrics:      &metrics,
            device,
        };
        let (_, summary) = run.run(model, train_dataset, val_dataset)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { valid_step: 0, ..TrainConfig::default() },
            TrainConfig { d_model: 250, num_heads: 8, ..TrainConfig::default() },
            TrainConfig { train_fraction: 1.0, ..TrainConfig::default() },
            TrainConfig { max_target_len: 1, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn test_partial_json_config_takes_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"epochs": 2, "valid_step": 100, "device": "cpu"}"#).unwrap();

        let cfg = TrainConfig::from_file(&path).unwrap();
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.valid_step, 100);
        assert_eq!(cfg.device, DeviceKind::Cpu);
        assert_eq!(cfg.batch_size, TrainConfig::default().batch_size);
    }

    #[test]
    fn test_cpu_run_from_jsonl() {
        let dir   = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.jsonl");
        let lines = [
            r#"{"context": "Barry lives in Tripoli.", "question": "Where does Barry live?", "answer": "Tripoli"}"#,
            r#"{"context": "Tripoli is in Libya.", "question": "Where is Tripoli?", "answer": "Libya"}"#,
            r#"{"context": "Cairo is in Egypt.", "question": "Where is Cairo?", "answer": "Egypt"}"#,
            r#"{"context": "Rome is in Italy.", "question": "Where is Rome?", "answer": "Italy"}"#,
        ];
        fs::write(&train, lines.join("\n")).unwrap();

        let cfg = TrainConfig {
            train_file:         train.display().to_string(),
            checkpoint_dir:     dir.path().join("ckpt").display().to_string(),
            max_source_len:     8,
            max_target_len:     8,
            batch_size:         2,
            epochs:             1,
            lr:                 1e-3,
            valid_step:         1,
            d_model:            16,
            num_heads:          2,
            num_encoder_layers: 1,
            num_decoder_layers: 1,
            d_ff:               32,
            dropout:            0.0,
            vocab_size:         64,
            train_fraction:     0.5,
            device:             DeviceKind::Cpu,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.steps, 1);
        assert!(dir.path().join("ckpt/train_config.json").exists());
        assert!(dir.path().join("ckpt/best_model.mpk.gz").exists());
    }
}
