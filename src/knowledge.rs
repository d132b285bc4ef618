//! Knowledge document loading.
//!
//! Reads the reference document's full text. PDF files go through
//! `pdf-extract`; anything else is read as UTF-8. A missing or unreadable
//! document is a hard error: the retrieval pipeline must fail fast and
//! loudly rather than index nothing.

use anyhow::{bail, Context, Result};
use std::path::Path;

pub fn load_document(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("knowledge document not found at: {}", path.display());
    }

    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read knowledge document: {}", path.display()))?;
        pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed for {}: {}", path.display(), e))?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge document: {}", path.display()))?
    };

    if text.trim().is_empty() {
        bail!("knowledge document is empty: {}", path.display());
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_plain_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.txt");
        std::fs::write(&path, "Refunds are processed within 5 business days.").unwrap();

        let text = load_document(&path).unwrap();
        assert!(text.contains("Refunds"));
    }

    #[test]
    fn test_missing_document_fails() {
        let tmp = TempDir::new().unwrap();
        let err = load_document(&tmp.path().join("absent.txt")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_empty_document_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kb.txt");
        std::fs::write(&path, "   \n").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
