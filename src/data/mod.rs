// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between files on disk and tensor batches.
//
// Training path:
//
//   SQuAD JSON / JSONL
//       │
//       ▼
//   squad::open_examples  → Vec<QaExample>
//       │
//       ▼
//   Seq2SeqEncoder        → fixed-length EncodedSample
//       │                   ("context: ..." → "question <sep> answer")
//       ▼
//   split_train_val       → train / validation (when no valid file)
//       │
//       ▼
//   QaDataset + Seq2SeqBatcher → Burn DataLoader → training loop
//
// Flashcard path:
//
//   .docx / .txt → DocumentLoader → Preprocessor → Chunker → contexts
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads source documents (.docx via docx-rs, or plain text)
pub mod loader;

/// Loads labelled examples from SQuAD JSON or JSON Lines
pub mod squad;

/// Cleans raw text and splits it into sentences
pub mod preprocessor;

/// Packs sentences into context-sized chunks
pub mod chunker;

/// Turns examples into fixed-length token id sequences
pub mod encoder;

/// Implements Burn's Dataset trait for encoded samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
