// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level vocabulary.
//
// The vocabulary is built from the training corpus itself:
// every whitespace-separated word, case preserved, ranked by
// frequency (ties broken alphabetically so rebuilding from the
// same corpus gives the same ids). Punctuation stays attached
// to its word, which keeps decode(encode(text)) == text for
// in-vocabulary text.
//
// Special tokens have fixed ids:
//   <pad> = 0   padding and decoder start
//   </s>  = 1   end of sequence
//   <unk> = 2   out-of-vocabulary word
//   <sep> = 3   question/answer separator
//
// The tokenizer JSON is written directly in the HuggingFace
// `tokenizers` format and loaded back with Tokenizer::from_str,
// so no trainer is involved.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf, str::FromStr};
use tokenizers::Tokenizer;

use crate::data::encoder::{EOS_TOKEN, PAD_TOKEN, SEP_TOKEN, UNK_TOKEN};

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Special tokens in id order.
const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, EOS_TOKEN, UNK_TOKEN, SEP_TOKEN];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Reuse a tokenizer saved by an earlier run, or build one from `texts`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            let tokenizer = build_tokenizer(texts, vocab_size)?;
            self.save(&tokenizer)?;
            Ok(tokenizer)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer to '{}': {}", path.display(), e))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

/// Build an in-memory word-level tokenizer over `texts`.
/// `vocab_size` counts the special tokens.
pub fn build_tokenizer(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
    anyhow::ensure!(
        vocab_size > SPECIAL_TOKENS.len(),
        "vocab_size must exceed the {} special tokens",
        SPECIAL_TOKENS.len()
    );

    // ── Step 1: Word frequencies ──────────────────────────────────────────────
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            if !SPECIAL_TOKENS.contains(&word) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(&str, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    words.truncate(vocab_size - SPECIAL_TOKENS.len());

    // ── Step 2: Vocabulary with specials first ────────────────────────────────
    let mut vocab = serde_json::Map::new();
    for (id, token) in SPECIAL_TOKENS.iter().enumerate() {
        vocab.insert(token.to_string(), serde_json::json!(id));
    }
    for (word, _) in &words {
        let id = vocab.len();
        vocab.insert(word.to_string(), serde_json::json!(id));
    }

    let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
        .iter()
        .enumerate()
        .map(|(id, token)| {
            serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        })
        .collect();

    // ── Step 3: HuggingFace tokenizer JSON ────────────────────────────────────
    let tokenizer_json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added_tokens,
        "normalizer": null,
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": UNK_TOKEN
        }
    });

    let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
        .map_err(|e| anyhow::anyhow!("Cannot build tokenizer: {e}"))?;

    tracing::info!("Tokenizer built with {} tokens", tokenizer.get_vocab_size(true));
    Ok(tokenizer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Barry lives in Tripoli, the capital of Libya.".to_string(),
            "Where does Barry live? Tripoli".to_string(),
        ]
    }

    #[test]
    fn test_special_token_ids_are_fixed() {
        let tok = build_tokenizer(&corpus(), 50).unwrap();
        assert_eq!(tok.token_to_id(PAD_TOKEN), Some(0));
        assert_eq!(tok.token_to_id(EOS_TOKEN), Some(1));
        assert_eq!(tok.token_to_id(UNK_TOKEN), Some(2));
        assert_eq!(tok.token_to_id(SEP_TOKEN), Some(3));
    }

    #[test]
    fn test_most_frequent_words_kept_first() {
        // 4 specials + 2 words
        let tok = build_tokenizer(&corpus(), 6).unwrap();
        assert_eq!(tok.get_vocab_size(true), 6);
        assert_eq!(tok.token_to_id("Barry"), Some(4));
        assert_eq!(tok.token_to_id("Tripoli"), None);
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let tok = build_tokenizer(&corpus(), 50).unwrap();
        let enc = tok.encode("Barry visits Benghazi", false).unwrap();
        assert_eq!(enc.get_ids()[1], 2);
        assert_eq!(enc.get_ids()[2], 2);
    }

    #[test]
    fn test_separator_is_one_token() {
        let tok = build_tokenizer(&corpus(), 50).unwrap();
        let enc = tok.encode("Where does Barry live? <sep> Tripoli", false).unwrap();
        assert_eq!(enc.get_ids().iter().filter(|&&id| id == 3).count(), 1);
        assert_eq!(enc.get_ids().len(), 6);
    }

    #[test]
    fn test_load_or_build_reuses_saved_file() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());

        let first = store.load_or_build(&corpus(), 50).unwrap();
        assert!(store.path().exists());

        // A different corpus is ignored once a tokenizer exists
        let second = store.load_or_build(&["entirely new words".to_string()], 50).unwrap();
        assert_eq!(first.get_vocab(true), second.get_vocab(true));
    }
}
