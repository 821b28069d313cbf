//! Paragraph and character-window helpers
//!
//! All lengths are in characters, never bytes, so multi-byte prose is never
//! split inside a code point.

const PARAGRAPH_BREAK: &str = "\n\n";

/// Non-empty trimmed paragraphs, in order
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_BREAK).map(str::trim).filter(|p| !p.is_empty())
}

/// The first `n` paragraphs of `text`, rejoined with blank lines
pub fn keep_paragraphs(text: &str, n: usize) -> String {
    paragraphs(text.trim())
        .take(n)
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
        .trim()
        .to_string()
}

/// The last `n` characters of `text` (the whole text when shorter)
pub fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((start, _)) => &text[start..],
        None => "",
    }
}

/// Last paragraph inside the trailing `window` characters of trimmed `text`
///
/// Falls back to the whole window when it holds no paragraph.
pub fn last_paragraph(text: &str, window: usize) -> String {
    let tail = tail_chars(text.trim(), window);
    paragraphs(tail).last().unwrap_or(tail).to_string()
}

/// Non-empty scene texts joined by blank lines, with one trailing newline
pub fn join_scenes<S: AsRef<str>>(scenes: &[S]) -> String {
    let joined = scenes
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK);
    format!("{}\n", joined.trim())
}
