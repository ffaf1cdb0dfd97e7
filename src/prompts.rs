//! System prompt for the LLM translation backend.
//!
//! OCR output of a scanned page is noisy: stray spaces between CJK
//! characters, broken line joins, the odd misread glyph. The prompt asks the
//! model to translate through that noise and to return only the translation,
//! because anything else it says ends up burned into the page image.

/// English display name for common ISO 639-1 codes; unknown codes pass through.
pub fn language_name(code: &str) -> &str {
    match code {
        "ja" => "Japanese",
        "en" => "English",
        "zh" | "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "auto" => "the detected source language",
        other => other,
    }
}

/// Build the system prompt for a source → target language pair.
pub fn translation_system_prompt(source: &str, target: &str) -> String {
    format!(
        "You translate text recovered by OCR from a scanned document.\n\
\n\
Translate the user's message from {src} into {tgt}.\n\
\n\
RULES:\n\
1. Output ONLY the translation. No preamble, notes, quotes or markdown.\n\
2. The input may contain OCR artefacts such as spaces between characters or \
broken words; translate the intended text, not the artefacts.\n\
3. Keep numbers, names and codes as written.\n\
4. If the input is not {src} or is unreadable noise, output it unchanged.\n\
5. Produce a single paragraph.",
        src = language_name(source),
        tgt = language_name(target),
    )
}
