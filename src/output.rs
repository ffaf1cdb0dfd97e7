//! Result types returned by the annotation entry points.

use crate::error::TranslatePdfError;
use crate::pipeline::blocks::TextBlock;
use crate::pipeline::translate::BlockTranslation;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Everything known about one processed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Rendered (and output) page size in pixels.
    pub width: u32,
    pub height: u32,
    /// OCR blocks in detection order.
    pub blocks: Vec<TextBlock>,
    /// `translations[i]` belongs to `blocks[i]`.
    pub translations: Vec<BlockTranslation>,
}

impl PageResult {
    pub fn failed_blocks(&self) -> usize {
        self.translations.iter().filter(|t| t.is_failed()).count()
    }

    /// Blocks that were boxed and labelled on the output page.
    pub fn drawn_blocks(&self) -> usize {
        self.translations
            .iter()
            .filter(|t| t.overlay_text().is_some())
            .count()
    }
}

/// Run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages rendered, annotated and written to the output.
    pub processed_pages: usize,
    pub total_blocks: usize,
    /// Blocks with non-empty translated text.
    pub translated_blocks: usize,
    pub failed_blocks: usize,
    /// False when the overlay font could not be obtained and only
    /// rectangles were drawn.
    pub font_available: bool,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    /// OCR, translation and drawing across all pages.
    pub page_duration_ms: u64,
    pub assemble_duration_ms: u64,
}

/// Output of [`crate::annotate`].
#[derive(Debug, Clone)]
pub struct AnnotationOutput {
    /// The assembled PDF.
    pub pdf: Vec<u8>,
    /// Per-page detail, in page order.
    pub pages: Vec<PageResult>,
    /// Annotated page images, aligned with `pages`.
    pub images: Vec<DynamicImage>,
    pub stats: AnnotationStats,
}

impl AnnotationOutput {
    /// Treat any failed block as an error.
    ///
    /// Successful runs return `self` unchanged.
    pub fn into_result(self) -> Result<Self, TranslatePdfError> {
        let first = self.pages.iter().find_map(|p| {
            p.translations.iter().find_map(|t| match t {
                BlockTranslation::Failed { block, .. } => Some((p.page_num, *block)),
                _ => None,
            })
        });

        match first {
            None => Ok(self),
            Some((first_page, first_block)) => Err(TranslatePdfError::PartialFailure {
                failed: self.stats.failed_blocks,
                total: self.stats.total_blocks,
                first_page,
                first_block,
            }),
        }
    }
}
