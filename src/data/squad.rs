// ============================================================
// Layer 4 — Example Loaders
// ============================================================
// Two on-disk formats are understood:
//
//   SQuAD v1.1 JSON
//     { "data": [ { "title": ..., "paragraphs": [
//         { "context": ..., "qas": [
//             { "question": ..., "answers": [ { "text": ..., "answer_start": n } ] }
//         ] } ] } ] }
//
//   JSON Lines
//     {"context": ..., "question": ..., "answer": ...}
//     {"context": ..., "question": ..., "answer": ...}
//
// For SQuAD only the first answer of each question is used.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::domain::{example::QaExample, traits::ExampleSource};

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
struct SquadArticle {
    #[serde(default)]
    title: String,
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    context: String,
    qas: Vec<SquadQuestion>,
}

#[derive(Debug, Deserialize)]
struct SquadQuestion {
    question: String,
    #[serde(default)]
    answers: Vec<SquadAnswer>,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text: String,
}

// ─── SquadLoader ──────────────────────────────────────────────────────────────
pub struct SquadLoader {
    path: PathBuf,
}

impl SquadLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for SquadLoader {
    fn load_examples(&self) -> Result<Vec<QaExample>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))?;
        let file: SquadFile = serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not SQuAD JSON", self.path.display()))?;

        let mut examples   = Vec::new();
        let mut unanswered = 0usize;

        for article in file.data {
            tracing::trace!("Reading article '{}'", article.title);
            for paragraph in article.paragraphs {
                for qa in paragraph.qas {
                    match qa.answers.into_iter().next() {
                        Some(answer) => examples.push(QaExample::new(
                            paragraph.context.clone(),
                            qa.question,
                            answer.text,
                        )),
                        None => unanswered += 1,
                    }
                }
            }
        }

        if unanswered > 0 {
            tracing::warn!("Skipped {} questions without answers", unanswered);
        }
        Ok(examples)
    }
}

// ─── JsonlLoader ──────────────────────────────────────────────────────────────
pub struct JsonlLoader {
    path: PathBuf,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for JsonlLoader {
    fn load_examples(&self) -> Result<Vec<QaExample>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))?;

        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str::<QaExample>(line).with_context(|| {
                    format!("{}:{}: invalid example", self.path.display(), i + 1)
                })
            })
            .collect()
    }
}

/// Load examples from `path`, picking the format by extension.
///
/// Blank rows are dropped and `max_examples` (if set) keeps only
/// the first N examples in file order.
pub fn open_examples(path: &str, max_examples: Option<usize>) -> Result<Vec<QaExample>> {
    let source: Box<dyn ExampleSource> = if path.ends_with(".jsonl") {
        Box::new(JsonlLoader::new(path))
    } else {
        Box::new(SquadLoader::new(path))
    };

    let mut examples: Vec<QaExample> = source
        .load_examples()?
        .into_iter()
        .filter(|e| !e.is_blank())
        .collect();

    if let Some(limit) = max_examples {
        examples.truncate(limit);
    }

    tracing::info!("Loaded {} examples from '{}'", examples.len(), path);
    Ok(examples)
}
