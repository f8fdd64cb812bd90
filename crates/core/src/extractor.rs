//! Best-effort text extraction for embedding. Never fails: anything that
//! cannot be read falls back to a normalised form of the filename, and a
//! file with no usable name at all yields the empty string.

use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Bytes read from plain-text files before truncation.
const MAX_TEXT_BYTES: usize = 64 * 1024;
/// Characters of extracted content kept for embedding.
const MAX_EXTRACT_CHARS: usize = 4096;

/// Returns a lower-cased, whitespace-normalised text representation of the
/// file: document content where we can get it, otherwise the normalised
/// filename stem.
pub fn extract(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let content = match ext.as_str() {
        "pdf" => pdf_text(path),
        "txt" | "md" | "log" | "csv" => text_prefix(path),
        _ => None,
    };

    if let Some(text) = content {
        let normalised = normalise_text(&text);
        if !normalised.is_empty() {
            return truncate_chars(&normalised, MAX_EXTRACT_CHARS);
        }
    }

    path.file_stem()
        .and_then(|s| s.to_str())
        .map(normalise_filename)
        .unwrap_or_default()
}

/// "Medibank_Policy_Notification-1" becomes "medibank policy notification 1":
/// separators and punctuation to spaces, collapsed, lower-cased.
pub fn normalise_filename(stem: &str) -> String {
    let spaced: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalise_text(&spaced)
}

fn normalise_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

fn text_prefix(path: &Path) -> Option<String> {
    let mut file = fs::File::open(path).ok()?;
    let mut buf = vec![0u8; MAX_TEXT_BYTES];
    let n = file.read(&mut buf).ok()?;
    let text = String::from_utf8_lossy(&buf[..n]).to_string();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> Option<String> {
    match pdf_extract::extract_text(path) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!(file = %path.display(), error = %e, "pdf extraction failed, using filename");
            None
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(path: &Path) -> Option<String> {
    debug!(file = %path.display(), "pdf feature disabled, using filename");
    None
}
