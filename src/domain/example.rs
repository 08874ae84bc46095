// ============================================================
// Layer 3 — QaExample Domain Type
// ============================================================
// One labelled training triple. The model learns to read the
// context and write "question <sep> answer".
//
// Example:
//   context:  "Barry lives in Tripoli, the capital of Libya."
//   question: "Where does Barry live?"
//   answer:   "Tripoli"

use serde::{Deserialize, Serialize};

/// A labelled (context, question, answer) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaExample {
    /// The source passage the pair is drawn from
    pub context: String,

    /// The question a reader should be able to answer from the context
    pub question: String,

    /// The answer text
    pub answer: String,
}

impl QaExample {
    pub fn new(
        context:  impl Into<String>,
        question: impl Into<String>,
        answer:   impl Into<String>,
    ) -> Self {
        Self {
            context:  context.into(),
            question: question.into(),
            answer:   answer.into(),
        }
    }

    /// True when any of the three fields is blank after trimming.
    /// Such rows teach the model nothing and are dropped by the loaders.
    pub fn is_blank(&self) -> bool {
        self.context.trim().is_empty()
            || self.question.trim().is_empty()
            || self.answer.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(!QaExample::new("ctx", "q?", "a").is_blank());
        assert!(QaExample::new("ctx", "   ", "a").is_blank());
        assert!(QaExample::new("", "q?", "a").is_blank());
    }
}
