// ============================================================
// Layer 4 — Seq2Seq Encoder (dataset preprocessor)
// ============================================================
// Turns a labelled triple into the fixed-length id sequences
// the model trains on:
//
//   source: "context: <context>"              → input_ids, attention_mask
//   target: "<question> <sep> <answer>"       → labels
//
// Each side is tokenised without special tokens, cut to
// max_len - 1 ids, closed with </s>, then padded with <pad>:
//
//   [ w1 w2 ... wn </s> <pad> <pad> ... ]     (exactly max_len ids)
//   [  1  1 ...  1   1    0     0  ... ]      (attention mask)
//
// The same source formatting is used at generation time, so
// the model always sees contexts the way it was trained on them.

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::data::dataset::EncodedSample;
use crate::domain::{example::QaExample, qa_pair::{QaPair, SEPARATOR}};

/// Template placed in front of every context.
pub const CONTEXT_PREFIX: &str = "context: ";

pub const PAD_TOKEN: &str = "<pad>";
pub const EOS_TOKEN: &str = "</s>";
pub const UNK_TOKEN: &str = "<unk>";
pub const SEP_TOKEN: &str = SEPARATOR;

/// Ids of the special tokens. `pad` doubles as the decoder start token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: u32,
    pub eos: u32,
    pub unk: u32,
    pub sep: u32,
}

impl SpecialTokens {
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .with_context(|| format!("Tokenizer has no '{token}' token"))
        };
        Ok(Self {
            pad: id(PAD_TOKEN)?,
            eos: id(EOS_TOKEN)?,
            unk: id(UNK_TOKEN)?,
            sep: id(SEP_TOKEN)?,
        })
    }
}

pub struct Seq2SeqEncoder<'a> {
    tokenizer:      &'a Tokenizer,
    specials:       SpecialTokens,
    max_source_len: usize,
    max_target_len: usize,
}

impl<'a> Seq2SeqEncoder<'a> {
    pub fn new(tokenizer: &'a Tokenizer, max_source_len: usize, max_target_len: usize) -> Result<Self> {
        // Room for at least one real token plus </s>
        anyhow::ensure!(
            max_source_len >= 2 && max_target_len >= 2,
            "sequence lengths must be at least 2 (got source={max_source_len}, target={max_target_len})"
        );
        Ok(Self {
            tokenizer,
            specials: SpecialTokens::from_tokenizer(tokenizer)?,
            max_source_len,
            max_target_len,
        })
    }

    pub fn specials(&self) -> SpecialTokens {
        self.specials
    }

    pub fn source_text(context: &str) -> String {
        format!("{CONTEXT_PREFIX}{context}")
    }

    pub fn target_text(example: &QaExample) -> String {
        QaPair::new(example.question.as_str(), example.answer.as_str()).to_target()
    }

    /// Tokenise `text` into exactly `max_len` ids plus its attention mask.
    pub fn encode_padded(&self, text: &str, max_len: usize) -> Result<(Vec<u32>, Vec<u32>)> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();
        ids.truncate(max_len - 1);
        ids.push(self.specials.eos);

        let mut mask = vec![1u32; ids.len()];
        ids.resize(max_len, self.specials.pad);
        mask.resize(max_len, 0);

        Ok((ids, mask))
    }

    /// Encode a free-text context the way training sources are encoded.
    pub fn encode_context(&self, context: &str) -> Result<(Vec<u32>, Vec<u32>)> {
        self.encode_padded(&Self::source_text(context), self.max_source_len)
    }

    pub fn encode(&self, example: &QaExample) -> Result<EncodedSample> {
        let (input_ids, attention_mask) = self.encode_context(&example.context)?;
        let (labels, _) = self.encode_padded(&Self::target_text(example), self.max_target_len)?;
        Ok(EncodedSample { input_ids, attention_mask, labels })
    }

    pub fn encode_all(&self, examples: &[QaExample]) -> Result<Vec<EncodedSample>> {
        examples.iter().map(|e| self.encode(e)).collect()
    }

    /// Ids back to text. Stops at the first </s>, drops <pad>,
    /// keeps <sep> so the caller can split on it.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let content: Vec<u32> = ids
            .iter()
            .copied()
            .take_while(|&id| id != self.specials.eos)
            .filter(|&id| id != self.specials.pad)
            .collect();

        self.tokenizer
            .decode(&content, false)
            .map_err(|e| anyhow::anyhow!("Decode error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::build_tokenizer;

    const CONTEXT: &str = "Barry lives in Tripoli, the capital of Libya.";

    fn tokenizer() -> Tokenizer {
        let corpus = vec![
            Seq2SeqEncoder::source_text(CONTEXT),
            "Where does Barry live?".to_string(),
            "What is the capital of Libya? Tripoli".to_string(),
        ];
        build_tokenizer(&corpus, 100).unwrap()
    }

    fn example() -> QaExample {
        QaExample::new(CONTEXT, "Where does Barry live?", "Tripoli")
    }

    #[test]
    fn test_fixed_lengths_and_mask() {
        let tok = tokenizer();
        let enc = Seq2SeqEncoder::new(&tok, 24, 12).unwrap();
        let sample = enc.encode(&example()).unwrap();

        assert_eq!(sample.input_ids.len(), 24);
        assert_eq!(sample.attention_mask.len(), 24);
        assert_eq!(sample.labels.len(), 12);

        // "context:" + 8 context words + </s>
        let real = sample.attention_mask.iter().filter(|&&m| m == 1).count();
        assert_eq!(real, 10);
        assert_eq!(sample.input_ids[real - 1], enc.specials().eos);
        assert!(sample.input_ids[real..].iter().all(|&id| id == enc.specials().pad));
    }

    #[test]
    fn test_truncation_keeps_eos() {
        let tok = tokenizer();
        let enc = Seq2SeqEncoder::new(&tok, 4, 4).unwrap();
        let (ids, mask) = enc.encode_context(CONTEXT).unwrap();

        assert_eq!(ids.len(), 4);
        assert_eq!(mask, vec![1, 1, 1, 1]);
        assert_eq!(ids[3], enc.specials().eos);
    }

    #[test]
    fn test_reencoding_decoded_context_is_idempotent() {
        let tok = tokenizer();
        let enc = Seq2SeqEncoder::new(&tok, 32, 16).unwrap();
        let text = Seq2SeqEncoder::source_text(CONTEXT);

        let (ids, mask) = enc.encode_padded(&text, 32).unwrap();
        let decoded     = enc.decode(&ids).unwrap();
        assert_eq!(decoded, text);
        assert_eq!(enc.encode_padded(&decoded, 32).unwrap(), (ids, mask));
    }

    #[test]
    fn test_target_decodes_to_original_pair() {
        let tok = tokenizer();
        let enc = Seq2SeqEncoder::new(&tok, 32, 16).unwrap();
        let sample = enc.encode(&example()).unwrap();

        assert!(sample.labels.contains(&enc.specials().sep));
        let text = enc.decode(&sample.labels).unwrap();
        let pair = QaPair::from_generation(&text, SEPARATOR).unwrap();
        assert_eq!(pair, QaPair::new("Where does Barry live?", "Tripoli"));
    }

    #[test]
    fn test_rejects_degenerate_lengths() {
        let tok = tokenizer();
        assert!(Seq2SeqEncoder::new(&tok, 1, 8).is_err());
    }
}
