// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Everything a trained model needs lives in one directory:
//
//   checkpoints/
//     model.mpk.gz          ← final parameters (end of training)
//     best_model.mpk.gz     ← parameters with the lowest val loss
//     model_config.json     ← architecture, rebuilt before loading
//     tokenizer.json        ← vocabulary (see tokenizer_store)
//     qa_model_config.json  ← {"model_type": "QAModel"}
//     train_config.json     ← hyperparameters of the run
//     metrics.csv           ← one row per validation (see metrics)
//
// Parameters go through Burn's NamedMpkGzFileRecorder at full
// precision, so a model loaded back produces exactly the same
// tokens as the one that was saved.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder},
};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::application::train_use_case::TrainConfig;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::model::{QaModel, QaModelConfig};

const MODEL_CONFIG_FILE: &str = "model_config.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";
const TAG_FILE:          &str = "qa_model_config.json";

/// Value of `model_type` in the tag file.
pub const MODEL_TYPE: &str = "QAModel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// Parameters after the last epoch
    Final,
    /// Parameters with the lowest validation loss
    Best,
}

impl CheckpointKind {
    /// File stem; the recorder appends `.mpk.gz`.
    pub fn stem(self) -> &'static str {
        match self {
            CheckpointKind::Final => "model",
            CheckpointKind::Best  => "best_model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTag {
    pub model_type: String,
}

type Recorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn model_path(&self, kind: CheckpointKind) -> PathBuf {
        self.dir.join(kind.stem())
    }

    pub fn exists(&self, kind: CheckpointKind) -> bool {
        self.model_path(kind).with_extension("mpk.gz").exists()
    }

    /// `Best` is only written when validation ran; fall back to
    /// `Final` when it is missing.
    pub fn resolve(&self, kind: CheckpointKind) -> CheckpointKind {
        if kind == CheckpointKind::Best && !self.exists(kind) && self.exists(CheckpointKind::Final) {
            tracing::warn!("No best checkpoint in '{}', using the final one", self.dir.display());
            return CheckpointKind::Final;
        }
        kind
    }

    // ─── Parameters ───────────────────────────────────────────────────────────
    pub fn save_model<B: Backend>(&self, model: &QaModel<B>, kind: CheckpointKind) -> Result<()> {
        let path = self.model_path(kind);
        model
            .clone()
            .save_file(path.clone(), &Recorder::new())
            .map_err(|e| anyhow::anyhow!("Failed to save checkpoint to '{}': {e:?}", path.display()))?;

        tracing::debug!("Saved {:?} checkpoint to '{}'", kind, path.display());
        Ok(())
    }

    /// Rebuild the architecture from model_config.json and load the
    /// parameters of `kind` into it.
    pub fn load_model<B: Backend>(&self, kind: CheckpointKind, device: &B::Device) -> Result<QaModel<B>> {
        self.verify_tag()?;
        let config = self.load_model_config()?;
        let path   = self.model_path(kind);

        let model = config
            .init::<B>(device)
            .load_file(path.clone(), &Recorder::new(), device)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Cannot load checkpoint '{}'. Have you trained the model first? ({e:?})",
                    path.display()
                )
            })?;

        tracing::info!("Loaded {:?} checkpoint from '{}'", kind, path.display());
        Ok(model)
    }

    // ─── Configuration files ──────────────────────────────────────────────────
    pub fn save_model_config(&self, config: &QaModelConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        config
            .save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<QaModelConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        QaModelConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read model config from '{}': {e:?}", path.display()))
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    // ─── Tag ──────────────────────────────────────────────────────────────────
    pub fn save_tag(&self) -> Result<()> {
        let tag  = ModelTag { model_type: MODEL_TYPE.to_string() };
        let path = self.dir.join(TAG_FILE);
        fs::write(&path, serde_json::to_string(&tag)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    /// Fails unless the directory carries a QAModel tag.
    pub fn verify_tag(&self) -> Result<()> {
        let path = self.dir.join(TAG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("'{}' is missing. Have you run 'train' first?", path.display())
        })?;

        let tag: ModelTag = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a valid model tag", path.display()))?;
        anyhow::ensure!(
            tag.model_type == MODEL_TYPE,
            "Unsupported model type '{}' in '{}'",
            tag.model_type,
            path.display()
        );
        Ok(())
    }

    /// End-of-training bundle: final parameters, tokenizer,
    /// architecture and tag.
    pub fn save_final<B: Backend>(
        &self,
        model:     &QaModel<B>,
        config:    &QaModelConfig,
        tokenizer: &Tokenizer,
    ) -> Result<()> {
        self.save_model(model, CheckpointKind::Final)?;
        TokenizerStore::new(&self.dir).save(tokenizer)?;
        self.save_model_config(config)?;
        self.save_tag()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_tokenizer;
    use crate::ml::decoding::{greedy_decode, DecodingSettings};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> QaModelConfig {
        QaModelConfig::new(12, 6, 5)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_encoder_layers(1)
            .with_num_decoder_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0)
    }

    fn ids(values: Vec<i64>) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(values, [1, 6]), &Default::default())
    }

    #[test]
    fn test_save_then_load_generates_the_same_tokens() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = config();

        TestBackend::seed(11);
        let model: QaModel<TestBackend> = cfg.init(&Default::default());
        let tokenizer = build_tokenizer(&["a b c".to_string()], 12).unwrap();
        ckpt.save_final(&model, &cfg, &tokenizer).unwrap();
        ckpt.save_model(&model, CheckpointKind::Best).unwrap();

        let settings = DecodingSettings::greedy(5);
        let input    = ids(vec![4, 5, 6, 1, 0, 0]);
        let mask     = ids(vec![1, 1, 1, 1, 0, 0]);
        let before   = greedy_decode(&model, input.clone(), mask.clone(), &settings).unwrap();

        for kind in [CheckpointKind::Final, CheckpointKind::Best] {
            assert!(ckpt.exists(kind));
            let loaded: QaModel<TestBackend> = ckpt.load_model(kind, &Default::default()).unwrap();
            let after = greedy_decode(&loaded, input.clone(), mask.clone(), &settings).unwrap();
            assert_eq!(before, after);
        }
        assert!(dir.path().join("tokenizer.json").exists());
    }

    #[test]
    fn test_tag_round_trip_and_mismatch() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        assert!(ckpt.verify_tag().is_err());
        ckpt.save_tag().unwrap();
        ckpt.verify_tag().unwrap();

        let raw = fs::read_to_string(dir.path().join(TAG_FILE)).unwrap();
        assert_eq!(raw, r#"{"model_type":"QAModel"}"#);

        fs::write(dir.path().join(TAG_FILE), r#"{"model_type":"Other"}"#).unwrap();
        assert!(ckpt.verify_tag().is_err());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_tag().unwrap();
        ckpt.save_model_config(&config()).unwrap();

        assert!(!ckpt.exists(CheckpointKind::Best));
        assert!(ckpt.load_model::<TestBackend>(CheckpointKind::Best, &Default::default()).is_err());
        // Nothing to fall back to either
        assert_eq!(ckpt.resolve(CheckpointKind::Best), CheckpointKind::Best);

        let model: QaModel<TestBackend> = config().init(&Default::default());
        ckpt.save_model(&model, CheckpointKind::Final).unwrap();
        assert_eq!(ckpt.resolve(CheckpointKind::Best), CheckpointKind::Final);
        assert_eq!(ckpt.resolve(CheckpointKind::Final), CheckpointKind::Final);
    }

    #[test]
    fn test_train_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = TrainConfig { epochs: 3, valid_step: 7, ..TrainConfig::default() };

        ckpt.save_train_config(&cfg).unwrap();
        let loaded = ckpt.load_train_config().unwrap();
        assert_eq!(loaded.epochs, 3);
        assert_eq!(loaded.valid_step, 7);
    }
}
