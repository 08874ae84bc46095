// ============================================================
// Layer 4 — Seq2Seq Batcher
// ============================================================
// Implements Burn's Batcher trait: N encoded samples become one
// batch of [N, S] source tensors and [N, T] target tensors.
//
// The decoder is trained with teacher forcing, so its input is
// the label sequence shifted one step to the right, starting
// with the decoder start token (<pad>):
//
//   labels            = [ q1 q2 <sep> a1 </s> <pad> ]
//   decoder_input_ids = [ <pad> q1 q2 <sep> a1 </s> ]
//
// All samples are pre-padded to the same lengths, so batching
// is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use std::sync::Arc;

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::dataset::{EncodedSample, QaDataset};

#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// [batch_size, source_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// [batch_size, source_len] — 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// [batch_size, target_len] — labels shifted right
    pub decoder_input_ids: Tensor<B, 2, Int>,

    /// [batch_size, target_len]
    pub labels: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    pub device:           B::Device,
    pub decoder_start_id: u32,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device, decoder_start_id: u32) -> Self {
        Self { device, decoder_start_id }
    }

    fn int_tensor(&self, values: Vec<i64>, shape: [usize; 2]) -> Tensor<B, 2, Int> {
        let data = TensorData::new(values, shape).convert::<B::IntElem>();
        Tensor::<B, 2, Int>::from_data(data, &self.device)
    }
}

/// Prepend the start token and drop the last label.
pub fn shift_right(labels: &[u32], start_id: u32) -> Vec<u32> {
    std::iter::once(start_id)
        .chain(labels.iter().copied())
        .take(labels.len())
        .collect()
}

impl<B: Backend> Batcher<EncodedSample, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<EncodedSample>) -> Seq2SeqBatch<B> {
        let batch_size = items.len();
        let source_len = items[0].input_ids.len();
        let target_len = items[0].labels.len();

        // Flatten Vec<Vec<u32>> → Vec<i64>, row by row
        let input_ids: Vec<i64> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i64))
            .collect();

        let attention_mask: Vec<i64> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i64))
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .flat_map(|s| s.labels.iter().map(|&x| x as i64))
            .collect();

        let decoder_inputs: Vec<i64> = items
            .iter()
            .flat_map(|s| shift_right(&s.labels, self.decoder_start_id))
            .map(|x| x as i64)
            .collect();

        Seq2SeqBatch {
            input_ids:         self.int_tensor(input_ids, [batch_size, source_len]),
            attention_mask:    self.int_tensor(attention_mask, [batch_size, source_len]),
            decoder_input_ids: self.int_tensor(decoder_inputs, [batch_size, target_len]),
            labels:            self.int_tensor(labels, [batch_size, target_len]),
        }
    }
}

/// Training loaders shuffle with a seed; validation loaders keep file order.
pub fn build_loader<B: Backend>(
    dataset:      QaDataset,
    batcher:      Seq2SeqBatcher<B>,
    batch_size:   usize,
    shuffle_seed: Option<u64>,
) -> Arc<dyn DataLoader<Seq2SeqBatch<B>>> {
    let builder = DataLoaderBuilder::new(batcher).batch_size(batch_size);
    match shuffle_seed {
        Some(seed) => builder.shuffle(seed).build(dataset),
        None       => builder.build(dataset),
    }
}
