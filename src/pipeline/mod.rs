//! Pipeline stages for OCR-and-translate PDF annotation.
//!
//! Each submodule implements one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr ──▶ blocks ──▶ translate ──▶ annotate ──▶ assemble
//! (URL/path) (pdfium) (tesseract) (group) (Google/LLM)  (imageproc)  (pdfium)
//! ```
//!
//! 1. [`input`]    : canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]   : rasterise selected pages; blocking, run in `spawn_blocking`
//! 3. [`ocr`]      : word detections with block indices per page image
//! 4. [`blocks`]   : fold contiguous words of one block into a [`blocks::TextBlock`]
//! 5. [`translate`]: one translation per block, failures kept in place;
//!    the only stage with network I/O
//! 6. [`annotate`] : rectangles and translated labels on a copy of the page
//! 7. [`assemble`] : page images into one PDF, written atomically
//!
//! [`postprocess`] cleans LLM answers before they reach the annotator.

pub mod annotate;
pub mod assemble;
pub mod blocks;
pub mod input;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod translate;
