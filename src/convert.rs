//! Top-level annotation entry points.
//!
//! [`annotate`] runs the whole pipeline and returns the assembled PDF with
//! per-page detail; [`annotate_to_file`] additionally writes it to disk.
//! Fatal conditions abort the run with a [`TranslatePdfError`]; a block whose
//! translation fails does not, it is kept as
//! [`BlockTranslation::Failed`](crate::pipeline::translate::BlockTranslation::Failed)
//! and counted in the stats.

use crate::config::{AnnotateConfig, PageSelection};
use crate::error::TranslatePdfError;
use crate::output::{AnnotationOutput, AnnotationStats, PageResult};
use crate::pipeline::annotate::{annotate_page, OverlayFont};
use crate::pipeline::assemble::{write_pdf_atomically, PageAssembler, PdfiumAssembler};
use crate::pipeline::blocks::group_blocks;
use crate::pipeline::ocr::{TesseractDetector, TextDetector};
use crate::pipeline::render::{PageImage, PdfiumRasterizer, Rasterizer};
use crate::pipeline::translate::{resolve_translator, translate_blocks, Translator};
use crate::pipeline::input;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{spawn_blocking, JoinError};
use tracing::{debug, info, warn};

/// Annotate a PDF file or URL.
///
/// # Errors
/// Returns `Err` only for fatal errors: unreadable or invalid input, OCR
/// engine failure, an unusable font, output assembly failure. Translation
/// failures are per block; use [`AnnotationOutput::into_result`] to make
/// them fatal.
pub async fn annotate(
    input_str: impl AsRef<str>,
    config: &AnnotateConfig,
) -> Result<AnnotationOutput, TranslatePdfError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting annotation: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Resolve engines and font ─────────────────────────────────
    let rasterizer = resolve_rasterizer(config);
    let detector = resolve_detector(config);
    let assembler = resolve_assembler(config);
    let translator = resolve_translator(config)?;
    let font = resolve_font(config).await?;
    info!(
        "Translator: {} ({} → {}), overlay text: {}",
        translator.name(),
        config.source_lang,
        config.target_lang,
        if font.is_some() { "on" } else { "off" }
    );

    // ── Step 3: Select pages ─────────────────────────────────────────────
    let total_pages = {
        let rasterizer = Arc::clone(&rasterizer);
        let path = pdf_path.clone();
        let password = config.password.clone();
        spawn_blocking(move || rasterizer.page_count(&path, password.as_deref()))
            .await
            .map_err(join_err)??
    };
    info!("PDF has {} pages", total_pages);

    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(TranslatePdfError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} pages for annotation", page_indices.len());

    // ── Step 4: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = {
        let rasterizer = Arc::clone(&rasterizer);
        let path = pdf_path.clone();
        let password = config.password.clone();
        let indices = page_indices.clone();
        spawn_blocking(move || rasterizer.rasterize(&path, password.as_deref(), &indices))
            .await
            .map_err(join_err)??
    };
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(rendered.len());
    }

    // ── Step 5: OCR → translate → annotate, per page ─────────────────────
    let page_start = Instant::now();
    let selected = rendered.len();
    let processed: Vec<(PageResult, DynamicImage)> = stream::iter(rendered.into_iter().map(|page| {
        process_page(
            page,
            selected,
            Arc::clone(&detector),
            Arc::clone(&translator),
            font.clone(),
            config,
        )
    }))
    .buffered(config.concurrency.max(1))
    .try_collect()
    .await?;
    let page_duration_ms = page_start.elapsed().as_millis() as u64;

    let (pages, images): (Vec<PageResult>, Vec<DynamicImage>) = processed.into_iter().unzip();

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let assemble_start = Instant::now();
    let (pdf, images) = spawn_blocking(move || {
        let pdf = assembler.assemble(&images)?;
        Ok::<_, TranslatePdfError>((pdf, images))
    })
    .await
    .map_err(join_err)??;
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    // ── Step 7: Stats ────────────────────────────────────────────────────
    let stats = AnnotationStats {
        total_pages,
        processed_pages: pages.len(),
        total_blocks: pages.iter().map(|p| p.blocks.len()).sum(),
        translated_blocks: pages.iter().map(PageResult::drawn_blocks).sum(),
        failed_blocks: pages.iter().map(PageResult::failed_blocks).sum(),
        font_available: font.is_some(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        page_duration_ms,
        assemble_duration_ms,
    };

    info!(
        "Annotation complete: {} pages, {}/{} blocks translated, {} failed, {}ms total",
        stats.processed_pages,
        stats.translated_blocks,
        stats.total_blocks,
        stats.failed_blocks,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.processed_pages, stats.failed_blocks);
    }

    Ok(AnnotationOutput {
        pdf,
        pages,
        images,
        stats,
    })
}

/// Annotate a PDF and write the result to `output_path`.
///
/// The destination only ever holds a complete document; see
/// [`write_pdf_atomically`].
pub async fn annotate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnnotateConfig,
) -> Result<AnnotationStats, TranslatePdfError> {
    let output = annotate(input_str, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let pdf = output.pdf;

    spawn_blocking(move || write_pdf_atomically(&path, &pdf))
        .await
        .map_err(join_err)??;

    Ok(output.stats)
}

/// Synchronous wrapper around [`annotate`].
///
/// Creates a temporary tokio runtime internally.
pub fn annotate_sync(
    input_str: impl AsRef<str>,
    config: &AnnotateConfig,
) -> Result<AnnotationOutput, TranslatePdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslatePdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(annotate(input_str, config))
}

/// Annotate PDF bytes held in memory.
///
/// The bytes go to a managed temp file that is removed when this returns.
///
/// # Example
/// ```rust,no_run
/// use ocr_translate_pdf::{annotate_from_bytes, AnnotateConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("scan.pdf")?;
/// let output = annotate_from_bytes(&bytes, &AnnotateConfig::default()).await?;
/// std::fs::write("scan.en.pdf", &output.pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn annotate_from_bytes(
    bytes: &[u8],
    config: &AnnotateConfig,
) -> Result<AnnotationOutput, TranslatePdfError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| TranslatePdfError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| TranslatePdfError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    annotate(&path, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// One page end to end: detect, group, translate, draw.
async fn process_page(
    page: PageImage,
    total_pages: usize,
    detector: Arc<dyn TextDetector>,
    translator: Arc<dyn Translator>,
    font: Option<OverlayFont>,
    config: &AnnotateConfig,
) -> Result<(PageResult, DynamicImage), TranslatePdfError> {
    let PageImage { page_num, image } = page;
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_start(page_num, total_pages);
    }

    let image = Arc::new(image);
    let words = {
        let image = Arc::clone(&image);
        spawn_blocking(move || detector.detect(&image))
            .await
            .map_err(join_err)?
            .map_err(|e| TranslatePdfError::OcrFailed {
                page: page_num,
                detail: e.to_string(),
            })?
    };

    let blocks = group_blocks(words);
    debug!("Page {}: {} text blocks", page_num, blocks.len());

    let translations = translate_blocks(translator.as_ref(), page_num, &blocks, config).await;

    let (annotated, blocks, translations) = {
        let image = Arc::clone(&image);
        let style = config.style.clone();
        spawn_blocking(move || {
            let annotated =
                annotate_page(page_num, &image, &blocks, &translations, &style, font.as_ref())?;
            Ok::<_, TranslatePdfError>((annotated, blocks, translations))
        })
        .await
        .map_err(join_err)??
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_page_complete(page_num, total_pages, blocks.len());
    }

    let result = PageResult {
        page_num,
        width: annotated.width(),
        height: annotated.height(),
        blocks,
        translations,
    };
    Ok((result, annotated))
}

fn resolve_rasterizer(config: &AnnotateConfig) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(config.dpi, config.max_rendered_pixels)),
    }
}

fn resolve_detector(config: &AnnotateConfig) -> Arc<dyn TextDetector> {
    match config.detector {
        Some(ref d) => Arc::clone(d),
        None => Arc::new(TesseractDetector::new(
            &config.tesseract_cmd,
            &config.ocr_language,
            config.ocr_psm,
            config.dpi,
        )),
    }
}

fn resolve_assembler(config: &AnnotateConfig) -> Arc<dyn PageAssembler> {
    match config.assembler {
        Some(ref a) => Arc::clone(a),
        None => Arc::new(PdfiumAssembler),
    }
}

/// Explicit font path, else the font cache (downloading on first use).
///
/// A file that exists but does not parse is always fatal. A font that
/// cannot be fetched is fatal only with `require_font`; otherwise the run
/// continues without overlay text.
async fn resolve_font(config: &AnnotateConfig) -> Result<Option<OverlayFont>, TranslatePdfError> {
    if let Some(ref path) = config.font_path {
        return OverlayFont::load(path).map(Some);
    }

    let source = config.font_source.clone();
    let fetched = spawn_blocking(move || font_auto::ensure_font(&source, None))
        .await
        .map_err(join_err)?;

    match fetched {
        Ok(path) => {
            debug!("Overlay font: {}", path.display());
            OverlayFont::load(&path).map(Some)
        }
        Err(e) if config.require_font => Err(TranslatePdfError::FontUnavailable {
            detail: e.to_string(),
        }),
        Err(e) => {
            warn!("Overlay font unavailable ({}); drawing boxes without translated text", e);
            Ok(None)
        }
    }
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 1,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
    }
}

fn join_err(e: JoinError) -> TranslatePdfError {
    TranslatePdfError::Internal(format!("blocking task failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_requested_page_per_selection() {
        assert_eq!(first_requested_page(&PageSelection::All), 1);
        assert_eq!(first_requested_page(&PageSelection::Single(9)), 9);
        assert_eq!(first_requested_page(&PageSelection::Range(4, 8)), 4);
        assert_eq!(first_requested_page(&PageSelection::Set(vec![7, 5])), 5);
    }

    #[tokio::test]
    async fn explicit_bad_font_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("broken.ttf");
        std::fs::write(&font, b"definitely not a font").unwrap();

        let config = AnnotateConfig::builder().font_path(&font).build().unwrap();
        let err = resolve_font(&config).await.unwrap_err();
        match err {
            TranslatePdfError::FontLoadFailed { path, .. } => assert_eq!(path, font),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_font_degrades_or_fails_per_config() {
        if std::env::var("FONT_AUTO_PATH").is_ok() {
            println!("SKIP — FONT_AUTO_PATH overrides the font source");
            return;
        }
        let source = font_auto::FontSource::new(
            "http://127.0.0.1:9/missing.ttf",
            format!("unreachable-{}.ttf", std::process::id()),
        );

        let lenient = AnnotateConfig::builder()
            .font_source(source.clone())
            .build()
            .unwrap();
        assert!(resolve_font(&lenient).await.unwrap().is_none());

        let strict = AnnotateConfig::builder()
            .font_source(source)
            .require_font(true)
            .build()
            .unwrap();
        assert!(matches!(
            resolve_font(&strict).await.unwrap_err(),
            TranslatePdfError::FontUnavailable { .. }
        ));
    }
}
