// ============================================================
// Layer 5 — Question/Answer Generator
// ============================================================
// Free text in, QaPair out:
//
//   "Barry lives in Tripoli."
//     → "context: Barry lives in Tripoli."     (template)
//     → [ids..., </s>, <pad>...]               (truncate + pad)
//     → decode (greedy or beam)
//     → "Where does Barry live? <sep> Tripoli" (ids → text)
//     → QaPair { question, answer }            (split)
//
// The generator is written against Seq2SeqModel, so anything
// that can score and generate plugs in; from_checkpoint wires
// up the trained QaModel.

use anyhow::Result;
use burn::prelude::*;
use std::marker::PhantomData;
use tokenizers::Tokenizer;

use crate::data::encoder::Seq2SeqEncoder;
use crate::domain::{
    error::GenerationError,
    qa_pair::{QaPair, SEPARATOR},
};
use crate::infra::{
    checkpoint::{CheckpointKind, CheckpointManager},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    decoding::DecodingSettings,
    model::{QaModel, Seq2SeqModel},
};

pub struct QaGenerator<B: Backend, M: Seq2SeqModel<B>> {
    model:          M,
    tokenizer:      Tokenizer,
    max_source_len: usize,
    max_target_len: usize,
    settings:       DecodingSettings,
    device:         B::Device,
    _backend:       PhantomData<B>,
}

impl<B: Backend> QaGenerator<B, QaModel<B>> {
    /// Load tokenizer, architecture and parameters from a checkpoint directory.
    pub fn from_checkpoint(
        checkpoints: &CheckpointManager,
        kind:        CheckpointKind,
        settings:    DecodingSettings,
        device:      B::Device,
    ) -> Result<Self> {
        let tokenizer = TokenizerStore::new(checkpoints.dir()).load()?;
        let config    = checkpoints.load_model_config()?;
        let model     = checkpoints.load_model::<B>(checkpoints.resolve(kind), &device)?;

        QaGenerator::new(model, tokenizer, config.max_source_len, config.max_target_len, settings, device)
    }
}

impl<B: Backend, M: Seq2SeqModel<B>> QaGenerator<B, M> {
    pub fn new(
        model:          M,
        tokenizer:      Tokenizer,
        max_source_len: usize,
        max_target_len: usize,
        settings:       DecodingSettings,
        device:         B::Device,
    ) -> Result<Self> {
        // Fails early if the tokenizer lacks the special tokens
        Seq2SeqEncoder::new(&tokenizer, max_source_len, max_target_len)?;
        Ok(Self {
            model,
            tokenizer,
            max_source_len,
            max_target_len,
            settings,
            device,
            _backend: PhantomData,
        })
    }

    fn encoder(&self) -> Result<Seq2SeqEncoder<'_>, GenerationError> {
        Seq2SeqEncoder::new(&self.tokenizer, self.max_source_len, self.max_target_len)
            .map_err(|e| GenerationError::Tokenizer(e.to_string()))
    }

    fn tensor(&self, values: Vec<u32>) -> Tensor<B, 2, Int> {
        let len  = values.len();
        let data = TensorData::new(values.into_iter().map(|x| x as i64).collect::<Vec<_>>(), [1, len])
            .convert::<B::IntElem>();
        Tensor::from_data(data, &self.device)
    }

    /// Decoded model output for `context`, separator included.
    pub fn generate_raw(&self, context: &str) -> Result<String, GenerationError> {
        let encoder = self.encoder()?;
        let (input_ids, attention_mask) = encoder
            .encode_context(context)
            .map_err(|e| GenerationError::Tokenizer(e.to_string()))?;

        let sequences = self
            .model
            .generate(self.tensor(input_ids), self.tensor(attention_mask), &self.settings)
            .map_err(|e| GenerationError::Decoding(e.to_string()))?;

        let ids = sequences.into_iter().next().unwrap_or_default();
        let text = encoder
            .decode(&ids)
            .map_err(|e| GenerationError::Tokenizer(e.to_string()))?;

        tracing::debug!("Generated: {:?}", text);
        Ok(text)
    }

    /// Generate and split. A malformed output is returned as an
    /// error the caller can match on (`is_malformed()`).
    pub fn generate(&self, context: &str) -> Result<QaPair, GenerationError> {
        let text = self.generate_raw(context)?;
        QaPair::from_generation(&text, SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::Seq2SeqBatch;
    use crate::infra::tokenizer_store::build_tokenizer;
    use crate::ml::model::QaModelConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    const CONTEXT: &str = "Barry lives in Tripoli, the capital of Libya.";

    fn tokenizer() -> Tokenizer {
        let corpus = vec![
            format!("context: {CONTEXT}"),
            "Where does Barry live? Tripoli".to_string(),
        ];
        build_tokenizer(&corpus, 64).unwrap()
    }

    /// Replays a fixed output, whatever the input.
    struct ScriptedModel {
        output: Vec<u32>,
    }

    impl Seq2SeqModel<TestBackend> for ScriptedModel {
        fn score(&self, _batch: Seq2SeqBatch<TestBackend>) -> Tensor<TestBackend, 1> {
            Tensor::zeros([1], &Default::default())
        }

        fn generate(
            &self,
            input_ids:       Tensor<TestBackend, 2, Int>,
            _attention_mask: Tensor<TestBackend, 2, Int>,
            _settings:       &DecodingSettings,
        ) -> Result<Vec<Vec<u32>>> {
            Ok(vec![self.output.clone(); input_ids.dims()[0]])
        }
    }

    fn scripted(tokenizer: &Tokenizer, text: &str) -> ScriptedModel {
        let ids = tokenizer.encode(text, false).unwrap().get_ids().to_vec();
        ScriptedModel { output: ids }
    }

    #[test]
    fn test_barry_scenario_yields_question_and_answer() {
        let tok   = tokenizer();
        let model = scripted(&tok, "Where does Barry live? <sep> Tripoli");
        let generator: QaGenerator<TestBackend, _> =
            QaGenerator::new(model, tok, 32, 16, DecodingSettings::default(), Default::default()).unwrap();

        let pair = generator.generate(CONTEXT).unwrap();
        assert_eq!(pair.question, "Where does Barry live?");
        assert_eq!(pair.answer, "Tripoli");
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let tok   = tokenizer();
        let model = scripted(&tok, "Where does Barry live? Tripoli");
        let generator: QaGenerator<TestBackend, _> =
            QaGenerator::new(model, tok, 32, 16, DecodingSettings::default(), Default::default()).unwrap();

        let err = generator.generate(CONTEXT).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(err.raw_output(), Some("Where does Barry live? Tripoli"));
    }

    #[test]
    fn test_empty_output_is_malformed() {
        let tok = tokenizer();
        let generator: QaGenerator<TestBackend, _> = QaGenerator::new(
            ScriptedModel { output: Vec::new() },
            tok,
            32,
            16,
            DecodingSettings::default(),
            Default::default(),
        )
        .unwrap();

        assert!(generator.generate(CONTEXT).unwrap_err().is_malformed());
    }

    #[test]
    fn test_untrained_model_never_panics() {
        let tok    = tokenizer();
        let vocab  = tok.get_vocab_size(true);
        let config = QaModelConfig::new(vocab, 16, 8)
            .with_d_model(16)
            .with_num_heads(2)
            .with_num_encoder_layers(1)
            .with_num_decoder_layers(1)
            .with_d_ff(32)
            .with_dropout(0.0);
        let model: QaModel<TestBackend> = config.init(&Default::default());
        let generator: QaGenerator<TestBackend, _> =
            QaGenerator::new(model, tok, 16, 8, DecodingSettings::greedy(8), Default::default()).unwrap();

        match generator.generate(CONTEXT) {
            Ok(pair) => assert!(!pair.question.is_empty() && !pair.answer.is_empty()),
            Err(e)   => assert!(e.is_malformed(), "unexpected failure: {e}"),
        }
    }
}
