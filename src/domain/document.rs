// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A source document after its text has been extracted from
// whatever file format it arrived in (.docx, .txt).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// File name, used as the default deck subject
    pub source: String,

    /// Extracted text, not yet cleaned
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// The file name without its extension, e.g. "biology_notes"
    pub fn stem(&self) -> &str {
        self.source
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.source)
    }
}
