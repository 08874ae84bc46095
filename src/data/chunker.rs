// ============================================================
// Layer 4 — Context Chunker
// ============================================================
// Packs sentences into contexts of at most `max_words` words.
//
// The model writes one question/answer pair per context, so a
// document becomes one flashcard per chunk. Whole sentences are
// kept together; a single sentence longer than the budget is
// cut into word windows of `max_words`.
//
// Example with max_words=6:
//   "A b c. D e. F g h i j k l m."
//   → ["A b c. D e.", "F g h i j k", "l m."]

use crate::data::preprocessor::Preprocessor;

pub struct Chunker {
    max_words:    usize,
    preprocessor: Preprocessor,
}

impl Chunker {
    /// # Panics
    /// Panics if `max_words` is zero.
    pub fn new(max_words: usize) -> Self {
        assert!(max_words > 0, "max_words must be positive");
        Self { max_words, preprocessor: Preprocessor::new() }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        let sentences = self.preprocessor.split_sentences(text);
        for sentence in &sentences {
            let words: Vec<&str> = sentence.split_whitespace().collect();

            if current.len() + words.len() > self.max_words && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }

            if words.len() > self.max_words {
                for window in words.chunks(self.max_words) {
                    chunks.push(window.join(" "));
                }
            } else {
                current.extend(words);
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}
