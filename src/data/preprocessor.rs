// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans text extracted from documents before it is used as
// model context, and splits it into sentences.
//
// Extracted text carries artefacts the word-level vocabulary
// would otherwise learn as separate words:
//   - non-breaking / zero-width spaces and byte order marks
//   - tabs and Windows line endings
//   - runs of spaces left by indentation
//
// Paragraph breaks are kept as single newlines; they are
// treated as hard sentence boundaries.

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise whitespace and control characters.
    /// Each non-empty line comes out trimmed with single spaces;
    /// blank lines are dropped.
    pub fn clean(&self, text: &str) -> String {
        let normalised: String = text
            .chars()
            .map(|c| match c {
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' | '\t' => ' ',
                '\r' => '\n',
                c if c.is_control() && c != '\n' => ' ',
                c => c,
            })
            .collect();

        normalised
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Split cleaned text into sentences.
    ///
    /// A sentence ends at '.', '!' or '?' followed by whitespace
    /// (or end of text), or at a newline. Terminators stay attached.
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();

        for line in self.clean(text).lines() {
            let mut current = String::new();
            let mut chars   = line.chars().peekable();

            while let Some(c) = chars.next() {
                current.push(c);
                let at_boundary = matches!(c, '.' | '!' | '?')
                    && chars.peek().map_or(true, |next| next.is_whitespace());
                if at_boundary {
                    push_sentence(&mut sentences, &current);
                    current.clear();
                }
            }
            push_sentence(&mut sentences, &current);
        }

        sentences
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sentence(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_spaces_and_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello \u{00A0}\t world\x01!  "), "hello world !");
    }

    #[test]
    fn test_drops_blank_lines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("line1\r\n\r\n\n  \nline2"), "line1\nline2");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert!(p.split_sentences("   ").is_empty());
    }

    #[test]
    fn test_split_sentences() {
        let p = Preprocessor::new();
        let s = p.split_sentences(
            "Barry lives in Tripoli. It is the capital of Libya! Is it big?\nHeading without stop",
        );
        assert_eq!(
            s,
            vec![
                "Barry lives in Tripoli.",
                "It is the capital of Libya!",
                "Is it big?",
                "Heading without stop",
            ]
        );
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let p = Preprocessor::new();
        assert_eq!(p.split_sentences("Pi is 3.14 roughly."), vec!["Pi is 3.14 roughly."]);
    }
}
