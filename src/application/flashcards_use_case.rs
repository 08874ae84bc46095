// ============================================================
// Layer 2 — FlashcardsUseCase
// ============================================================
// Turns a document into a flashcard deck:
//
//   Step 1: Load the document          (Layer 4 - data)
//   Step 2: Clean + chunk into contexts (Layer 4 - data)
//   Step 3: Generate one card per chunk (Layer 5 - ml)
//   Step 4: Write the deck as JSON
//
// When the model's output for a chunk cannot be split into a
// question and an answer, the card is built from two
// consecutive sentences of that chunk instead. Chunks with a
// single sentence and a malformed generation are skipped.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{chunker::Chunker, loader::DocumentLoader, preprocessor::Preprocessor};
use crate::domain::{
    flashcard::{Flashcard, FlashcardDeck},
    traits::DocumentSource,
};
use crate::infra::checkpoint::{CheckpointKind, CheckpointManager};
use crate::ml::{
    cpu_device,
    decoding::DecodingSettings,
    generator::QaGenerator,
    model::Seq2SeqModel,
    wgpu_device, BackendChoice, CpuBackend, DeviceKind, WgpuBackend,
};

pub struct FlashcardsUseCase {
    pub document:       String,
    pub checkpoint_dir: String,
    pub kind:           CheckpointKind,
    pub settings:       DecodingSettings,
    /// Words per context chunk
    pub max_words:      usize,
    /// Deck subject; defaults to the document's file stem
    pub subject:        Option<String>,
    /// Output path; defaults to `<stem>_flashcards.json`
    pub output:         Option<String>,
    pub device:         DeviceKind,
}

impl FlashcardsUseCase {
    /// Returns the deck and the path it was written to.
    pub fn execute(&self) -> Result<(FlashcardDeck, PathBuf)> {
        anyhow::ensure!(self.max_words > 0, "max_words must be positive");
        // One deck per run; the loader would otherwise read a whole directory
        anyhow::ensure!(
            !Path::new(&self.document).is_dir(),
            "'{}' is a directory; pass a single .docx, .txt or .md file",
            self.document
        );
        match self.device.select() {
            BackendChoice::Wgpu => self.execute_on::<WgpuBackend>(wgpu_device()),
            BackendChoice::Cpu  => self.execute_on::<CpuBackend>(cpu_device()),
        }
    }

    fn execute_on<B: Backend>(&self, device: B::Device) -> Result<(FlashcardDeck, PathBuf)> {
        let checkpoints = CheckpointManager::new(&self.checkpoint_dir)?;
        let generator   = QaGenerator::<B, _>::from_checkpoint(&checkpoints, self.kind, self.settings, device)?;

        // ── Step 1: Load the document ─────────────────────────────────────────
        let documents = DocumentLoader::new(&self.document).load_all()?;
        let document  = documents
            .into_iter()
            .next()
            .with_context(|| format!("No readable document at '{}'", self.document))?;

        // ── Step 2: Clean + chunk ─────────────────────────────────────────────
        let text   = Preprocessor::new().clean(&document.text);
        let chunks = Chunker::new(self.max_words).chunk(&text);
        tracing::info!("'{}' split into {} contexts", document.source, chunks.len());

        // ── Step 3: Generate ──────────────────────────────────────────────────
        let subject = self.subject.clone().unwrap_or_else(|| document.stem().to_string());
        let deck    = build_deck(&generator, subject, &chunks)?;
        tracing::info!(
            "{} flashcards ({} generated, {} heuristic)",
            deck.flashcards.len(),
            deck.generated_count(),
            deck.flashcards.len() - deck.generated_count()
        );

        // ── Step 4: Write JSON ────────────────────────────────────────────────
        let output = self
            .output
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}_flashcards.json", document.stem())));
        fs::write(&output, serde_json::to_string_pretty(&deck)?)
            .with_context(|| format!("Cannot write deck to '{}'", output.display()))?;

        Ok((deck, output))
    }
}

fn build_deck<B, M>(generator: &QaGenerator<B, M>, subject: String, chunks: &[String]) -> Result<FlashcardDeck>
where
    B: Backend,
    M: Seq2SeqModel<B>,
{
    let mut deck = FlashcardDeck::new(subject);

    for (i, chunk) in chunks.iter().enumerate() {
        match generator.generate(chunk) {
            Ok(pair) => deck.push(Flashcard::generated(pair)),
            Err(e) if e.is_malformed() => {
                tracing::warn!("Chunk {}: {}; using sentence fallback", i, e);
                if let Some(card) = sentence_pair(chunk) {
                    deck.push(card);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(deck)
}

/// First two sentences of `chunk` as question and answer.
fn sentence_pair(chunk: &str) -> Option<Flashcard> {
    let sentences = Preprocessor::new().split_sentences(chunk);
    match sentences.as_slice() {
        [question, answer, ..] => Some(Flashcard::heuristic(question.as_str(), answer.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::Seq2SeqBatch;
    use crate::domain::flashcard::CardOrigin;
    use crate::infra::tokenizer_store::build_tokenizer;
    use burn::backend::NdArray;
    use tokenizers::Tokenizer;

    type TestBackend = NdArray;

    /// Writes a valid pair for contexts mentioning Barry, nothing useful otherwise.
    struct BarryModel {
        barry_id: u32,
        pair:     Vec<u32>,
        junk:     Vec<u32>,
    }

    impl Seq2SeqModel<TestBackend> for BarryModel {
        fn score(&self, _batch: Seq2SeqBatch<TestBackend>) -> Tensor<TestBackend, 1> {
            Tensor::zeros([1], &Default::default())
        }

        fn generate(
            &self,
            input_ids:       Tensor<TestBackend, 2, Int>,
            _attention_mask: Tensor<TestBackend, 2, Int>,
            _settings:       &DecodingSettings,
        ) -> Result<Vec<Vec<u32>>> {
            let ids: Vec<i64> = input_ids.into_data().convert::<i64>().to_vec().unwrap();
            let out = if ids.contains(&(self.barry_id as i64)) { &self.pair } else { &self.junk };
            Ok(vec![out.clone()])
        }
    }

    fn ids(tok: &Tokenizer, text: &str) -> Vec<u32> {
        tok.encode(text, false).unwrap().get_ids().to_vec()
    }

    #[test]
    fn test_generated_and_fallback_cards() {
        let corpus = vec![
            "context: Barry lives in Tripoli. Tripoli is the capital. Rain falls often. It is wet.".to_string(),
            "Where does Barry live? Tripoli".to_string(),
        ];
        let tok   = build_tokenizer(&corpus, 64).unwrap();
        let model = BarryModel {
            barry_id: tok.token_to_id("Barry").unwrap(),
            pair:     ids(&tok, "Where does Barry live? <sep> Tripoli"),
            junk:     ids(&tok, "Rain falls"),
        };
        let generator: QaGenerator<TestBackend, _> =
            QaGenerator::new(model, tok, 32, 16, DecodingSettings::default(), Default::default()).unwrap();

        let chunks = vec![
            "Barry lives in Tripoli. Tripoli is the capital.".to_string(),
            "Rain falls often. It is wet.".to_string(),
            "Rain falls often.".to_string(),
        ];
        let deck = build_deck(&generator, "Geography".to_string(), &chunks).unwrap();

        assert_eq!(deck.subject, "Geography");
        assert_eq!(deck.flashcards.len(), 2);
        assert_eq!(deck.generated_count(), 1);
        assert_eq!(deck.flashcards[0].question, "Where does Barry live?");
        assert_eq!(deck.flashcards[0].answer, "Tripoli");
        assert_eq!(deck.flashcards[1].origin, CardOrigin::Heuristic);
        assert_eq!(deck.flashcards[1].question, "Rain falls often.");
        assert_eq!(deck.flashcards[1].answer, "It is wet.");
    }

    #[test]
    fn test_directory_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "First. Second.").unwrap();
        fs::write(dir.path().join("b.txt"), "Third. Fourth.").unwrap();

        let use_case = FlashcardsUseCase {
            document:       dir.path().display().to_string(),
            checkpoint_dir: dir.path().join("missing").display().to_string(),
            kind:           CheckpointKind::Best,
            settings:       DecodingSettings::default(),
            max_words:      120,
            subject:        None,
            output:         None,
            device:         DeviceKind::Cpu,
        };
        let err = use_case.execute().unwrap_err().to_string();
        assert!(err.contains("is a directory"), "unexpected error: {err}");
    }

    #[test]
    fn test_sentence_pair_needs_two_sentences() {
        assert!(sentence_pair("Only one sentence here.").is_none());
        let card = sentence_pair("One. Two. Three.").unwrap();
        assert_eq!((card.question.as_str(), card.answer.as_str()), ("One.", "Two."));
    }
}
