// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Reads the documents flashcards are written from.
//
// Supported inputs:
//   - a single .docx file   (parsed with docx-rs)
//   - a single text file    (.txt, .md, anything else UTF-8)
//   - a directory           (every .docx / .txt / .md inside it)
//
// A .docx file is a ZIP of XML parts. docx-rs exposes it as:
//   Document
//     └── children: Vec<DocumentChild>
//           └── Paragraph
//                 └── children: Vec<ParagraphChild>
//                       └── Run
//                             └── children: Vec<RunChild>
//                                   └── Text
//
// Paragraph text is the concatenation of its runs; paragraphs
// are joined with newlines so the preprocessor can treat each
// one as a sentence boundary.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use docx_rs::read_docx;

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

const TEXT_EXTENSIONS: [&str; 3] = ["docx", "txt", "md"];

pub struct DocumentLoader {
    path: PathBuf,
}

impl DocumentLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for DocumentLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if self.path.is_file() {
            return Ok(vec![load_single(&self.path)?]);
        }

        if !self.path.is_dir() {
            anyhow::bail!("Document path '{}' does not exist", self.path.display());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.path)
            .with_context(|| format!("Cannot read directory '{}'", self.path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| TEXT_EXTENSIONS.contains(&e))
                    .unwrap_or(false)
            })
            .collect();
        // read_dir order is platform dependent
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            match load_single(&path) {
                Ok(doc) => {
                    tracing::debug!("Loaded: {} ({} chars)", doc.source, doc.text.len());
                    docs.push(doc);
                }
                // One unreadable file does not stop the rest
                Err(e) => tracing::warn!("Skipping '{}': {e:#}", path.display()),
            }
        }

        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.path.display());
        Ok(docs)
    }
}

fn load_single(path: &Path) -> Result<Document> {
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let is_docx = path.extension().and_then(|e| e.to_str()) == Some("docx");
    let text = if is_docx {
        load_docx_text(path)?
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?
    };

    Ok(Document::new(source, text))
}

fn load_docx_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let docx = read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("docx-rs parse error in '{}': {:?}", path.display(), e))?;

    let mut paragraphs: Vec<String> = Vec::new();
    for child in &docx.document.children {
        use docx_rs::DocumentChild;

        // Tables, images and section properties carry no prose
        if let DocumentChild::Paragraph(para) = child {
            let text = extract_paragraph_text(para);
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(paragraphs.join("\n"))
}

fn extract_paragraph_text(para: &docx_rs::Paragraph) -> String {
    use docx_rs::{ParagraphChild, RunChild};

    let mut out = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                if let RunChild::Text(t) = rc {
                    out.push_str(&t.text);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_plain_text_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("libya.txt");
        fs::write(&path, "Barry lives in Tripoli.\nTripoli is the capital of Libya.").unwrap();

        let docs = DocumentLoader::new(&path).load_all().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "libya.txt");
        assert!(docs[0].text.contains("capital of Libya"));
    }

    #[test]
    fn test_directory_skips_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.md"), "first").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let docs = DocumentLoader::new(dir.path()).load_all().unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DocumentLoader::new(dir.path().join("nope.docx")).load_all().is_err());
    }
}
