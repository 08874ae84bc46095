use anyhow::Result;
use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, log_softmax},
};

use crate::data::batcher::Seq2SeqBatch;
use crate::ml::decoding::{beam_search, greedy_decode, DecodingSettings};

// ─── Capability interface ─────────────────────────────────────────────────────
/// What the training, validation and generation code needs from a model.
pub trait Seq2SeqModel<B: Backend> {
    /// Mean token-level loss of the batch, shape [1].
    fn score(&self, batch: Seq2SeqBatch<B>) -> Tensor<B, 1>;

    /// One generated id sequence per input row, without the decoder
    /// start token and stopping before end-of-sequence.
    fn generate(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        settings:       &DecodingSettings,
    ) -> Result<Vec<Vec<u32>>>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct QaModelConfig {
    pub vocab_size:     usize,
    pub max_source_len: usize,
    pub max_target_len: usize,
    #[config(default = 256)]
    pub d_model: usize,
    #[config(default = 8)]
    pub num_heads: usize,
    #[config(default = 3)]
    pub num_encoder_layers: usize,
    #[config(default = 3)]
    pub num_decoder_layers: usize,
    #[config(default = 1024)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 0)]
    pub pad_token_id: usize,
    #[config(default = 1)]
    pub eos_token_id: usize,
}

impl QaModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QaModel<B> {
        let encoder = (0..self.num_encoder_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder = (0..self.num_decoder_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();

        QaModel {
            token_embedding:  EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            source_positions: EmbeddingConfig::new(self.max_source_len, self.d_model).init(device),
            target_positions: EmbeddingConfig::new(self.max_target_len, self.d_model).init(device),
            encoder,
            decoder,
            encoder_norm:     LayerNormConfig::new(self.d_model).init(device),
            decoder_norm:     LayerNormConfig::new(self.d_model).init(device),
            lm_head:          LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:          DropoutConfig::new(self.dropout).init(),
            pad_token_id:     self.pad_token_id,
            eos_token_id:     self.eos_token_id,
            max_target_len:   self.max_target_len,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// pad_mask: [batch, src_len], true where the source is padding
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));
        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        x:             Tensor<B, 3>,
        memory:        Tensor<B, 3>,
        memory_mask:   Tensor<B, 2, Bool>,
        causal_mask:   Tensor<B, 3, Bool>,
    ) -> Tensor<B, 3> {
        let self_out = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(self_out));

        let cross_out = self.cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(memory_mask))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross_out));

        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm3.forward(x + self.dropout.forward(ffn_out))
    }
}

/// Encoder-decoder transformer that reads a context and writes
/// "question <sep> answer". The token embedding is shared by both sides.
#[derive(Module, Debug)]
pub struct QaModel<B: Backend> {
    pub token_embedding:  Embedding<B>,
    pub source_positions: Embedding<B>,
    pub target_positions: Embedding<B>,
    pub encoder:          Vec<EncoderBlock<B>>,
    pub decoder:          Vec<DecoderBlock<B>>,
    pub encoder_norm:     LayerNorm<B>,
    pub decoder_norm:     LayerNorm<B>,
    pub lm_head:          Linear<B>,
    pub dropout:          Dropout,
    pub pad_token_id:     usize,
    pub eos_token_id:     usize,
    pub max_target_len:   usize,
}

impl<B: Backend> QaModel<B> {
    fn embed(&self, ids: Tensor<B, 2, Int>, positions: &Embedding<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let tok_emb = self.token_embedding.forward(ids);

        let pos = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        self.dropout.forward(tok_emb + positions.forward(pos))
    }

    /// input_ids, attention_mask: [batch, src_len]
    /// → (memory [batch, src_len, d_model], padding mask [batch, src_len])
    pub fn encode(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 3>, Tensor<B, 2, Bool>) {
        let pad_mask = attention_mask.equal_elem(0);

        let mut x = self.embed(input_ids, &self.source_positions);
        for block in &self.encoder {
            x = block.forward(x, pad_mask.clone());
        }
        (self.encoder_norm.forward(x), pad_mask)
    }

    /// decoder_input_ids: [batch, tgt_len] → logits [batch, tgt_len, vocab]
    pub fn decode(
        &self,
        decoder_input_ids: Tensor<B, 2, Int>,
        memory:            Tensor<B, 3>,
        memory_mask:       Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, tgt_len] = decoder_input_ids.dims();
        let device = decoder_input_ids.device();
        let causal = generate_autoregressive_mask::<B>(batch_size, tgt_len, &device);

        let mut x = self.embed(decoder_input_ids, &self.target_positions);
        for block in &self.decoder {
            x = block.forward(x, memory.clone(), memory_mask.clone(), causal.clone());
        }
        self.lm_head.forward(self.decoder_norm.forward(x))
    }

    pub fn forward(&self, batch: &Seq2SeqBatch<B>) -> Tensor<B, 3> {
        let (memory, memory_mask) = self.encode(batch.input_ids.clone(), batch.attention_mask.clone());
        self.decode(batch.decoder_input_ids.clone(), memory, memory_mask)
    }

    /// Cross entropy averaged over label positions that are not padding.
    pub fn loss(&self, logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch_size, tgt_len, vocab] = logits.dims();
        let n = batch_size * tgt_len;

        let log_probs = log_softmax(logits.reshape([n, vocab]), 1);
        let targets   = labels.reshape([n, 1]);
        let nll = log_probs.gather(1, targets.clone()).reshape([n]).neg();

        let keep  = targets.reshape([n]).equal_elem(self.pad_token_id as i64).bool_not().float();
        let count = keep.clone().sum().clamp_min(1.0);
        (nll * keep).sum() / count
    }

    pub fn max_target_len(&self) -> usize {
        self.max_target_len
    }
}

impl<B: Backend> Seq2SeqModel<B> for QaModel<B> {
    fn score(&self, batch: Seq2SeqBatch<B>) -> Tensor<B, 1> {
        let logits = self.forward(&batch);
        self.loss(logits, batch.labels)
    }

    fn generate(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        settings:       &DecodingSettings,
    ) -> Result<Vec<Vec<u32>>> {
        if settings.num_beams > 1 {
            beam_search(self, input_ids, attention_mask, settings)
        } else {
            greedy_decode(self, input_ids, attention_mask, settings)
        }
    }
}
