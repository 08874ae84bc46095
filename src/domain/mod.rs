// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works with:
// labelled examples, generated question/answer pairs, the
// flashcards built from them, and the documents they come from.
//
// Rules for this layer:
//   - NO Burn or tokenizer types
//   - NO file I/O
//   - Only structs, enums, traits and pure functions
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled (context, question, answer) training triple
pub mod example;

// A generated question/answer pair and the separator split
pub mod qa_pair;

// Flashcards and decks written by the `flashcards` command
pub mod flashcard;

// A loaded source document
pub mod document;

// Typed failures of the generation routine
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
