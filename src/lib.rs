//! # ocr-translate-pdf
//!
//! Translate scanned PDFs in place: every page is rendered, foreign-language
//! text is found with OCR, each text block is translated, and the page is
//! re-emitted with a box around the block and the translation written just
//! above it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Render     rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR        tesseract TSV → words with block numbers
//!  ├─ 4. Group      contiguous words of one block → TextBlock
//!  ├─ 5. Translate  one call per block (Google or any LLM provider)
//!  ├─ 6. Annotate   rectangle + translated label per block
//!  └─ 7. Assemble   annotated images → PDF, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr_translate_pdf::{annotate_to_file, AnnotateConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Japanese → English through Google, font fetched on first use.
//!     let config = AnnotateConfig::default();
//!     let stats = annotate_to_file("scan.pdf", "scan.en.pdf", &config).await?;
//!     eprintln!("{}/{} blocks translated", stats.translated_blocks, stats.total_blocks);
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime requirements
//!
//! - a pdfium shared library (`PDFIUM_LIB_PATH`, the working directory or
//!   the system library path)
//! - the `tesseract` executable with the OCR language pack, e.g. `jpn`
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr-translate-pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnnotateConfig, AnnotateConfigBuilder, AnnotationStyle, PageSelection, TranslatorBackend};
pub use convert::{annotate, annotate_from_bytes, annotate_sync, annotate_to_file};
pub use error::{TranslateError, TranslatePdfError};
pub use font_auto::FontSource;
pub use output::{AnnotationOutput, AnnotationStats, PageResult};
pub use pipeline::annotate::{annotate_page, OverlayFont};
pub use pipeline::assemble::{PageAssembler, PdfiumAssembler};
pub use pipeline::blocks::{group_blocks, BoundingBox, TextBlock, WordDetection};
pub use pipeline::ocr::{DetectError, TesseractDetector, TextDetector};
pub use pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
pub use pipeline::translate::{BlockTranslation, GoogleTranslator, LlmTranslator, Translator};
pub use progress::{AnnotateProgressCallback, NoopProgressCallback, ProgressCallback};
