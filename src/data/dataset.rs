use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised, padded training sample.
/// `input_ids`/`attention_mask` share the source length,
/// `labels` has the target length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedSample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub labels:         Vec<u32>,
}

pub struct QaDataset {
    samples: Vec<EncodedSample>,
}

impl QaDataset {
    pub fn new(samples: Vec<EncodedSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<EncodedSample> for QaDataset {
    fn get(&self, index: usize) -> Option<EncodedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
