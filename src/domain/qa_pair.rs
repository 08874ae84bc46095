// ============================================================
// Layer 3 — QaPair Domain Type
// ============================================================
// A question/answer pair produced by the model.
//
// The model writes both halves as one string joined by a
// literal separator token:
//
//   "Where does Barry live? <sep> Tripoli"
//
// `QaPair::from_generation` is the only place that string is
// taken apart. A string without the separator, or with an
// empty side, is a GenerationError — never a panic.

use serde::{Deserialize, Serialize};

use crate::domain::error::GenerationError;

/// The separator between question and answer in model targets and outputs.
pub const SEPARATOR: &str = "<sep>";

/// A successfully split generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer:   String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
        }
    }

    /// Render the pair as a training target: "question <sep> answer".
    pub fn to_target(&self) -> String {
        format!("{} {} {}", self.question, SEPARATOR, self.answer)
    }

    /// Split decoded model output on the first separator.
    ///
    /// Both halves are trimmed. Anything after the first separator
    /// (including further separators) belongs to the answer.
    pub fn from_generation(output: &str, separator: &str) -> Result<Self, GenerationError> {
        let (question, answer) = output.split_once(separator).ok_or_else(|| {
            GenerationError::MissingSeparator {
                separator: separator.to_string(),
                output:    output.to_string(),
            }
        })?;

        let question = question.trim();
        let answer   = answer.trim();

        if question.is_empty() {
            return Err(GenerationError::EmptyField { field: "question", output: output.to_string() });
        }
        if answer.is_empty() {
            return Err(GenerationError::EmptyField { field: "answer", output: output.to_string() });
        }

        Ok(Self::new(question, answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_separator() {
        let pair = QaPair::from_generation("Where does Barry live? <sep> Tripoli", SEPARATOR).unwrap();
        assert_eq!(pair.question, "Where does Barry live?");
        assert_eq!(pair.answer, "Tripoli");
    }

    #[test]
    fn test_missing_separator_is_detectable() {
        let err = QaPair::from_generation("Where does Barry live? Tripoli", SEPARATOR).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(err.raw_output(), Some("Where does Barry live? Tripoli"));
    }

    #[test]
    fn test_empty_side_is_malformed() {
        let err = QaPair::from_generation("<sep> Tripoli", SEPARATOR).unwrap_err();
        assert_eq!(
            err,
            GenerationError::EmptyField { field: "question", output: "<sep> Tripoli".into() }
        );
        assert!(QaPair::from_generation("Where? <sep>   ", SEPARATOR).unwrap_err().is_malformed());
    }

    #[test]
    fn test_extra_separators_stay_in_answer() {
        let pair = QaPair::from_generation("q <sep> a <sep> b", SEPARATOR).unwrap();
        assert_eq!(pair.answer, "a <sep> b");
    }

    #[test]
    fn test_target_round_trip() {
        let pair = QaPair::new("What is the capital of Libya?", "Tripoli");
        assert_eq!(QaPair::from_generation(&pair.to_target(), SEPARATOR).unwrap(), pair);
    }
}
