//! Post-processing: deterministic cleanup of LLM translation output.
//!
//! Even with a strict prompt, chat models sometimes wrap the answer in code
//! fences or quotes, prefix it with "Translation:", or spread it over several
//! lines. Each of those ends up drawn verbatim onto the page, so these rules
//! strip them before the annotator sees the text. The Google backend returns
//! plain text and skips this step.
//!
//! Rules (applied in order):
//! 1. Strip outer code fences
//! 2. Strip a leading "Translation:" style label
//! 3. Strip matching outer quotes
//! 4. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 5. Collapse all whitespace runs (including newlines) to single spaces

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw model output.
pub fn clean_translation(input: &str) -> String {
    let s = strip_fences(input);
    let s = strip_label(&s);
    let s = strip_outer_quotes(&s);
    let s = remove_invisible_chars(&s);
    collapse_whitespace(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*?)\n?```$").unwrap());

fn strip_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

// ── Rule 2: Strip leading label ──────────────────────────────────────────────

static RE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:english\s+)?translation\s*:\s*").unwrap());

fn strip_label(input: &str) -> String {
    RE_LABEL.replace(input, "").to_string()
}

// ── Rule 3: Strip matching outer quotes ──────────────────────────────────────

fn strip_outer_quotes(input: &str) -> String {
    let t = input.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('「', '」')] {
        if t.chars().count() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            // Only strip when the quotes wrap the whole answer.
            if !inner.contains(close) {
                return inner.to_string();
            }
        }
    }
    t.to_string()
}

// ── Rule 4: Remove invisible characters ──────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule 5: Collapse whitespace ──────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").to_string()
}
