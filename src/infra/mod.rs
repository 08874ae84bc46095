// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
//   checkpoint.rs      — the checkpoint directory: model
//                        parameters (final and best), model and
//                        training configs, the tokenizer and the
//                        {"model_type": "QAModel"} tag
//
//   tokenizer_store.rs — builds the word-level vocabulary from
//                        the training corpus, saves and reloads it
//
//   metrics.rs         — one CSV row per validation run
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Validation metrics CSV logger
pub mod metrics;
