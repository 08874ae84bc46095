// ============================================================
// Layer 3 — Flashcards
// ============================================================
// A flashcard is a question/answer pair attached to a subject.
// The deck layout mirrors what the study scheduler stored per
// subject: a name and a list of {question, answer} cards.

use serde::{Deserialize, Serialize};

use crate::domain::qa_pair::QaPair;

/// Where a flashcard's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardOrigin {
    /// Written by the model and split on the separator
    Generated,
    /// Built from two consecutive sentences after the model output was malformed
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer:   String,
    pub origin:   CardOrigin,
}

impl Flashcard {
    pub fn generated(pair: QaPair) -> Self {
        Self { question: pair.question, answer: pair.answer, origin: CardOrigin::Generated }
    }

    pub fn heuristic(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into(), origin: CardOrigin::Heuristic }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlashcardDeck {
    pub subject:    String,
    pub flashcards: Vec<Flashcard>,
}

impl FlashcardDeck {
    pub fn new(subject: impl Into<String>) -> Self {
        Self { subject: subject.into(), flashcards: Vec::new() }
    }

    pub fn push(&mut self, card: Flashcard) {
        self.flashcards.push(card);
    }

    /// Number of cards the model wrote itself
    pub fn generated_count(&self) -> usize {
        self.flashcards.iter().filter(|c| c.origin == CardOrigin::Generated).count()
    }
}
