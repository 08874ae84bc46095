// ============================================================
// Layer 5 — Validation Loop
// ============================================================
// Mean of the per-batch losses over a whole held-out set.
//
// Callers pass a model already in inference mode (model.valid()
// for an autodiff model), so dropout is off and the result only
// depends on the parameters and the data. The loader is built
// without shuffling, which keeps batch composition fixed too.

use std::sync::Arc;

use burn::{data::dataloader::DataLoader, prelude::*};

use crate::data::batcher::Seq2SeqBatch;
use crate::ml::model::Seq2SeqModel;

/// Returns NaN when the loader yields no batches.
pub fn validate<B, M>(model: &M, loader: &Arc<dyn DataLoader<Seq2SeqBatch<B>>>) -> f64
where
    B: Backend,
    M: Seq2SeqModel<B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for batch in loader.iter() {
        let loss: f64 = model.score(batch).into_scalar().elem::<f64>();
        loss_sum += loss;
        batches  += 1;
    }

    if batches > 0 { loss_sum / batches as f64 } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        batcher::{build_loader, Seq2SeqBatcher},
        dataset::{EncodedSample, QaDataset},
    };
    use crate::ml::model::{QaModel, QaModelConfig};
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;

    type TestBackend = NdArray;

    fn samples() -> Vec<EncodedSample> {
        (0..5u32)
            .map(|i| EncodedSample {
                input_ids:      vec![4 + i, 5, 1, 0],
                attention_mask: vec![1, 1, 1, 0],
                labels:         vec![6, 3, 7 + i, 1, 0],
            })
            .collect()
    }

    fn loader(samples: Vec<EncodedSample>) -> Arc<dyn DataLoader<Seq2SeqBatch<TestBackend>>> {
        let batcher = Seq2SeqBatcher::<TestBackend>::new(Default::default(), 0);
        build_loader(QaDataset::new(samples), batcher, 2, None)
    }

    fn config() -> QaModelConfig {
        QaModelConfig::new(16, 4, 5)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_encoder_layers(1)
            .with_num_decoder_layers(1)
            .with_d_ff(32)
    }

    #[test]
    fn test_validation_is_deterministic() {
        // Dropout is configured but disabled by valid()
        let trained: QaModel<Autodiff<TestBackend>> = config().with_dropout(0.3).init(&Default::default());
        let model = trained.valid();
        let val   = loader(samples());

        let first  = validate(&model, &val);
        let second = validate(&model, &val);
        assert!(first.is_finite());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_set_is_nan() {
        let model: QaModel<TestBackend> = config().init(&Default::default());
        assert!(validate(&model, &loader(Vec::new())).is_nan());
    }
}
