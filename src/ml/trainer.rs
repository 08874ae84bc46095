// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Seq2seq fine-tuning with AdamW and a warmup/linear-decay LR.
//
//   for epoch in 1..=epochs
//     for batch in shuffled train set
//       loss = model.score(batch)          teacher-forced CE
//       grads = loss.backward()
//       model = adamw.step(lr(step), model, grads)
//       step += 1
//       if step % valid_step == 0
//         val_loss = validate(model.valid(), val set)
//         if val_loss < best → save best_model
//
// After the last epoch the final parameters, tokenizer, model
// config and tag are written to the checkpoint directory.
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend with
//     dropout off; the validation batcher uses that backend too
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tokenizers::Tokenizer;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{build_loader, Seq2SeqBatcher},
    dataset::QaDataset,
    encoder::SpecialTokens,
};
use crate::infra::{
    checkpoint::{CheckpointKind, CheckpointManager},
    metrics::{MetricsLogger, StepMetrics},
};
use crate::ml::{
    model::{QaModel, QaModelConfig, Seq2SeqModel},
    schedule::LinearWarmupSchedule,
    validator::validate,
};

/// What happened during a run.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub steps:         usize,
    pub validations:   usize,
    /// +inf when validation never ran or never produced a finite loss
    pub best_val_loss: f64,
    pub best_step:     Option<usize>,
    /// Mean train loss of the last epoch
    pub last_train_loss: f64,
}

pub struct TrainingRun<'a, B: AutodiffBackend> {
    pub cfg:          &'a TrainConfig,
    pub model_config: &'a QaModelConfig,
    pub tokenizer:    &'a Tokenizer,
    pub checkpoints:  &'a CheckpointManager,
    pub metrics:      &'a MetricsLogger,
    pub device:       B::Device,
}

impl<'a, B: AutodiffBackend> TrainingRun<'a, B> {
    pub fn run(
        &self,
        mut model:     QaModel<B>,
        train_dataset: QaDataset,
        val_dataset:   QaDataset,
    ) -> Result<(QaModel<B>, TrainSummary)> {
        let cfg      = self.cfg;
        let specials = SpecialTokens::from_tokenizer(self.tokenizer)?;

        // ── Data loaders ──────────────────────────────────────────────────────
        let train_batches_per_epoch = train_dataset.sample_count().div_ceil(cfg.batch_size);
        let train_loader = build_loader(
            train_dataset,
            Seq2SeqBatcher::<B>::new(self.device.clone(), specials.pad),
            cfg.batch_size,
            Some(cfg.seed),
        );
        let val_loader = build_loader(
            val_dataset,
            Seq2SeqBatcher::<B::InnerBackend>::new(self.device.clone(), specials.pad),
            cfg.batch_size,
            None,
        );

        // ── Optimiser + schedule ──────────────────────────────────────────────
        let mut optim = AdamWConfig::new()
            .with_weight_decay(cfg.weight_decay)
            .init();
        let total_steps  = train_batches_per_epoch * cfg.epochs;
        let mut schedule = LinearWarmupSchedule::new(cfg.lr, cfg.warmup_steps, total_steps);
        tracing::info!(
            "Training for {} epochs × {} batches = {} steps (warmup {})",
            cfg.epochs, train_batches_per_epoch, total_steps, cfg.warmup_steps
        );

        let mut summary = TrainSummary {
            steps:           0,
            validations:     0,
            best_val_loss:   f64::INFINITY,
            best_step:       None,
            last_train_loss: f64::NAN,
        };

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 1..=cfg.epochs {
            println!("Epoch {}/{}", epoch, cfg.epochs);

            let mut epoch_loss_sum = 0.0f64;
            let mut epoch_batches  = 0usize;
            // Train loss since the previous validation, for metrics.csv
            let mut window_loss_sum = 0.0f64;
            let mut window_batches  = 0usize;

            for batch in train_loader.iter() {
                let loss = model.score(batch);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
                epoch_loss_sum  += loss_val;
                epoch_batches   += 1;
                window_loss_sum += loss_val;
                window_batches  += 1;

                let lr    = schedule.step();
                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(lr, model, grads);
                summary.steps += 1;

                if summary.steps % cfg.valid_step != 0 {
                    continue;
                }

                // ── Periodic validation ───────────────────────────────────────
                let val_loss = validate(&model.valid(), &val_loader);
                summary.validations += 1;
                println!("Step {}: Validation Loss: {:.4}", summary.steps, val_loss);

                let row = StepMetrics {
                    step:       summary.steps,
                    epoch,
                    train_loss: window_loss_sum / window_batches as f64,
                    val_loss,
                    lr,
                };
                self.metrics.log(&row)?;
                window_loss_sum = 0.0;
                window_batches  = 0;

                if row.is_improvement(summary.best_val_loss) {
                    summary.best_val_loss = val_loss;
                    summary.best_step     = Some(summary.steps);
                    self.checkpoints.save_model(&model, CheckpointKind::Best)?;
                    println!("New best model saved with validation loss: {:.4}", val_loss);
                }
            }

            summary.last_train_loss = if epoch_batches > 0 {
                epoch_loss_sum / epoch_batches as f64
            } else { f64::NAN };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | steps={} | best_val_loss={:.4}",
                epoch, cfg.epochs, summary.last_train_loss, summary.steps, summary.best_val_loss,
            );
        }

        // ── Final artifacts ───────────────────────────────────────────────────
        println!("Saving the final model and tokenizer...");
        self.checkpoints.save_final(&model, self.model_config, self.tokenizer)?;
        tracing::info!("Final model saved in '{}'", self.checkpoints.dir().display());

        Ok((model, summary))
    }
}
