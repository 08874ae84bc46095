// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to loaders through these traits
// so a new dataset or document format only needs a new impl.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::{document::Document, example::QaExample};

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that yields labelled training triples.
///
/// Implementations:
///   - SquadLoader → SQuAD v1.1 JSON
///   - JsonlLoader → one {context, question, answer} object per line
pub trait ExampleSource {
    fn load_examples(&self) -> Result<Vec<QaExample>>;
}

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Anything that yields documents to write flashcards from.
///
/// Implementations:
///   - DocumentLoader → a single .docx or plain-text file
pub trait DocumentSource {
    fn load_all(&self) -> Result<Vec<Document>>;
}
