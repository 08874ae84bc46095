// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Mean loss of a saved checkpoint over a labelled dataset file.
// Sources are encoded with the checkpoint's own sequence lengths
// and tokenizer, so the numbers are comparable with the
// validation losses logged during training.

use anyhow::Result;
use burn::prelude::*;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{build_loader, Seq2SeqBatcher},
    dataset::QaDataset,
    encoder::Seq2SeqEncoder,
    squad::open_examples,
};
use crate::infra::{
    checkpoint::{CheckpointKind, CheckpointManager},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    cpu_device, model::QaModel, validator::validate, wgpu_device, BackendChoice, CpuBackend,
    DeviceKind, WgpuBackend,
};

pub struct EvaluateUseCase {
    pub checkpoint_dir: String,
    pub data_file:      String,
    pub kind:           CheckpointKind,
    pub batch_size:     usize,
    pub max_examples:   Option<usize>,
    pub device:         DeviceKind,
}

impl EvaluateUseCase {
    pub fn execute(&self) -> Result<f64> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        match self.device.select() {
            BackendChoice::Wgpu => self.execute_on::<WgpuBackend>(wgpu_device()),
            BackendChoice::Cpu  => self.execute_on::<CpuBackend>(cpu_device()),
        }
    }

    fn execute_on<B: Backend>(&self, device: B::Device) -> Result<f64> {
        let checkpoints = CheckpointManager::new(&self.checkpoint_dir)?;
        let tokenizer   = TokenizerStore::new(&self.checkpoint_dir).load()?;
        let config      = checkpoints.load_model_config()?;
        let model: QaModel<B> = checkpoints.load_model(checkpoints.resolve(self.kind), &device)?;
        log_run_config(&checkpoints);

        let examples = open_examples(&self.data_file, self.max_examples)?;
        let encoder  = Seq2SeqEncoder::new(&tokenizer, config.max_source_len, config.max_target_len)?;
        let dataset  = QaDataset::new(encoder.encode_all(&examples)?);
        tracing::info!("Evaluating on {} examples", dataset.sample_count());

        let batcher = Seq2SeqBatcher::<B>::new(device, encoder.specials().pad);
        let loader  = build_loader(dataset, batcher, self.batch_size, None);

        // Checkpoints hold no autodiff state, so the loaded model is
        // already in inference mode
        Ok(validate(&model, &loader))
    }
}

/// train_config.json is informational; checkpoints saved without it still evaluate.
fn log_run_config(checkpoints: &CheckpointManager) -> Option<TrainConfig> {
    match checkpoints.load_train_config() {
        Ok(cfg) => {
            tracing::info!(
                "Checkpoint trained on '{}' for {} epochs (lr={}, batch_size={})",
                cfg.train_file, cfg.epochs, cfg.lr, cfg.batch_size
            );
            Some(cfg)
        }
        Err(e) => {
            tracing::debug!("No training config next to the checkpoint: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_tokenizer;
    use crate::ml::model::QaModelConfig;
    use std::fs;

    #[test]
    fn test_evaluate_saved_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("eval.jsonl");
        fs::write(
            &data,
            r#"{"context": "Barry lives in Tripoli.", "question": "Where does Barry live?", "answer": "Tripoli"}"#,
        )
        .unwrap();

        let tokenizer = build_tokenizer(
            &["context: Barry lives in Tripoli.".to_string(), "Where does Barry live? Tripoli".to_string()],
            64,
        )
        .unwrap();
        let config = QaModelConfig::new(tokenizer.get_vocab_size(true), 8, 8)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_encoder_layers(1)
            .with_num_decoder_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0);
        let model: QaModel<CpuBackend> = config.init(&Default::default());
        CheckpointManager::new(dir.path())
            .unwrap()
            .save_final(&model, &config, &tokenizer)
            .unwrap();

        let use_case = EvaluateUseCase {
            checkpoint_dir: dir.path().display().to_string(),
            data_file:      data.display().to_string(),
            kind:           CheckpointKind::Final,
            batch_size:     4,
            max_examples:   None,
            device:         DeviceKind::Cpu,
        };
        let first = use_case.execute().unwrap();
        assert!(first.is_finite() && first > 0.0);
        assert_eq!(first, use_case.execute().unwrap());
    }

    #[test]
    fn test_run_config_is_optional() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(log_run_config(&ckpt).is_none());

        let cfg = TrainConfig { epochs: 4, train_file: "squad.json".to_string(), ..TrainConfig::default() };
        ckpt.save_train_config(&cfg).unwrap();
        let loaded = log_run_config(&ckpt).unwrap();
        assert_eq!(loaded.epochs, 4);
        assert_eq!(loaded.train_file, "squad.json");
    }
}
