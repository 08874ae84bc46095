// ============================================================
// Layer 3 — Generation Errors
// ============================================================
// The generation routine can fail in two very different ways:
//
//   1. The model produced text we cannot split into a
//      question and an answer. This is an expected outcome
//      of an undertrained model and the caller decides what
//      to do (retry, fall back, skip).
//
//   2. Something underneath broke (tokenizer, tensor read-back).
//      These are not recoverable and are reported as-is.
//
// `is_malformed()` lets callers branch on case 1 without
// matching every variant.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The decoded output has no separator token in it.
    #[error("generated text has no '{separator}' separator: {output:?}")]
    MissingSeparator { separator: String, output: String },

    /// The separator is present but one side of it is empty.
    #[error("generated text has an empty {field}: {output:?}")]
    EmptyField { field: &'static str, output: String },

    /// Tokenizer failure while encoding the context or decoding the output.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The model failed to produce a token sequence.
    #[error("decoding failed: {0}")]
    Decoding(String),
}

impl GenerationError {
    /// True for outcomes caused by the model's output format,
    /// as opposed to failures of the machinery around it.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingSeparator { .. } | GenerationError::EmptyField { .. }
        )
    }

    /// The raw decoded text, when the failure was a malformed generation.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            GenerationError::MissingSeparator { output, .. }
            | GenerationError::EmptyField { output, .. } => Some(output),
            _ => None,
        }
    }
}
