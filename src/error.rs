//! Error types for the ocr-translate-pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranslatePdfError`]: **Fatal**: the run cannot proceed at all
//!   (bad input file, wrong password, unreadable font, OCR engine missing).
//!   Returned as `Err(TranslatePdfError)` from the top-level `annotate*`
//!   functions.
//!
//! * [`TranslateError`]: **Per call**: one translation request failed.
//!   It is folded into
//!   [`crate::pipeline::translate::BlockTranslation::Failed`] for that block
//!   only, so every other block keeps its index and its translation.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ocr-translate-pdf library.
#[derive(Debug, Error)]
pub enum TranslatePdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The text detector could not process a page.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── Font errors ───────────────────────────────────────────────────────
    /// The overlay font could not be obtained and `require_font` is set.
    #[error("Overlay font unavailable: {detail}\nPass --font <PATH> or check your internet connection.")]
    FontUnavailable { detail: String },

    /// A font file exists but could not be read or parsed.
    #[error("Could not load the font file at '{path}': {detail}")]
    FontLoadFailed { path: PathBuf, detail: String },

    // ── Translation errors ────────────────────────────────────────────────
    /// The configured translator cannot be constructed (missing API key etc.).
    #[error("Translator '{backend}' is not configured.\n{hint}")]
    TranslatorNotConfigured { backend: String, hint: String },

    /// Blocks and translations for a page have different lengths.
    #[error("Page {page}: {blocks} text blocks but {translations} translations")]
    AlignmentMismatch {
        page: usize,
        blocks: usize,
        translations: usize,
    },

    /// Some blocks could not be translated.
    ///
    /// Returned by [`crate::output::AnnotationOutput::into_result`] when
    /// the caller wants to treat any block failure as an error.
    #[error("{failed}/{total} text blocks failed to translate (first: page {first_page}, block {first_block})")]
    PartialFailure {
        failed: usize,
        total: usize,
        first_page: usize,
        first_block: usize,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// pdfium could not build the output document.
    #[error("Failed to assemble output PDF: {detail}")]
    AssemblyFailed { detail: String },

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium from https://github.com/bblanchon/pdfium-binaries and either:\n\
  • place libpdfium next to the executable or on the system library path, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A single failed translation call.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TranslateError {
    /// The service answered with a non-success HTTP status.
    #[error("translation service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request could not be sent or the response not read.
    #[error("translation request failed: {0}")]
    Transport(String),

    /// The request exceeded `api_timeout_secs`.
    #[error("translation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response body did not have the expected shape.
    #[error("unexpected translation response: {0}")]
    Malformed(String),

    /// The LLM provider rejected the request.
    #[error("LLM translation failed: {0}")]
    Llm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = TranslatePdfError::PartialFailure {
            failed: 1,
            total: 10,
            first_page: 2,
            first_block: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
        assert!(msg.contains("page 2, block 4"), "got: {msg}");
    }

    #[test]
    fn font_load_failed_names_path() {
        let e = TranslatePdfError::FontLoadFailed {
            path: PathBuf::from("/fonts/missing.ttf"),
            detail: "No such file".into(),
        };
        assert!(e.to_string().contains("/fonts/missing.ttf"));
    }

    #[test]
    fn alignment_mismatch_display() {
        let e = TranslatePdfError::AlignmentMismatch {
            page: 3,
            blocks: 5,
            translations: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"), "got: {msg}");
        assert!(msg.contains("5 text blocks"), "got: {msg}");
    }

    #[test]
    fn translate_error_timeout_display() {
        let e = TranslateError::Timeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn translate_error_http_display() {
        let e = TranslateError::Http {
            status: 429,
            body: "Too Many Requests".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("Too Many Requests"));
    }
}
