//! Document loading: plain text files and PDFs with embedded text.

use std::fs;
use std::path::Path;

use anyhow::Context;
use lopdf::Document;
use tracing::{debug, warn};

/// File extensions accepted as input.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "text", "pdf"];

/// Whether `path` has a supported extension.
pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(path).as_str())
}

/// Read the text of a document.
pub fn load_text(path: &Path) -> anyhow::Result<String> {
    let extension = extension(path);

    match extension.as_str() {
        "txt" | "text" => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        "pdf" => {
            let data = fs::read(path)?;
            extract_pdf_text(&data).with_context(|| format!("Failed to read PDF {}", path.display()))
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Extract the embedded text of a PDF.
///
/// Documents encrypted with an empty user password are decrypted first.
fn extract_pdf_text(data: &[u8]) -> anyhow::Result<String> {
    let mut doc = Document::load_mem(data).context("Not a valid PDF")?;

    let raw = if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            anyhow::bail!("PDF is encrypted with a password");
        }
        debug!("Decrypted PDF with empty password");

        let mut decrypted = Vec::new();
        doc.save_to(&mut decrypted)
            .context("Failed to save decrypted PDF")?;
        decrypted
    } else {
        data.to_vec()
    };

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        anyhow::bail!("PDF has no pages");
    }
    debug!("Loaded PDF with {} pages", page_count);

    let text = pdf_extract::extract_text_from_mem(&raw)
        .map_err(|e| anyhow::anyhow!("Text extraction failed: {}", e))?;

    if text.trim().is_empty() {
        warn!("PDF has no embedded text; scanned documents need OCR first");
    }

    Ok(text)
}
