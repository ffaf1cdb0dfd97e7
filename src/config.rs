//! Configuration types for OCR-and-translate annotation runs.
//!
//! All run behaviour is controlled through [`AnnotateConfig`], built via its
//! [`AnnotateConfigBuilder`]. Every path, language code and engine choice is
//! passed in explicitly; nothing is read from the working directory.

use crate::error::TranslatePdfError;
use crate::pipeline::assemble::PageAssembler;
use crate::pipeline::ocr::TextDetector;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::translate::Translator;
use crate::progress::ProgressCallback;
use font_auto::FontSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a PDF annotation run.
///
/// Built via [`AnnotateConfig::builder()`] or using
/// [`AnnotateConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr_translate_pdf::AnnotateConfig;
///
/// let config = AnnotateConfig::builder()
///     .dpi(200)
///     .languages("ja", "en")
///     .ocr_language("jpn")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnnotateConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 150.
    ///
    /// Tesseract wants glyphs at least ~20 px tall; 150 DPI gets body text
    /// there on A4/Letter pages. The output PDF page is sized to the rendered
    /// pixels, so higher DPI also means a physically larger output page.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 3000.
    pub max_rendered_pixels: u32,

    /// Number of pages processed at once. Default: 1 (strictly sequential).
    ///
    /// Pages are independent end-to-end, so raising this only overlaps OCR
    /// of one page with translation calls of another. Output order is
    /// always page order.
    pub concurrency: usize,

    /// Source language code passed to the translator. Default: "ja".
    pub source_lang: String,

    /// Target language code passed to the translator. Default: "en".
    pub target_lang: String,

    /// Tesseract language pack(s), e.g. "jpn" or "jpn+eng". Default: "jpn".
    pub ocr_language: String,

    /// Tesseract page segmentation mode. Default: 3 (fully automatic).
    pub ocr_psm: u8,

    /// Tesseract executable. Default: "tesseract" (looked up on `PATH`).
    pub tesseract_cmd: String,

    /// Which translation service to use when `translator` is not set.
    pub backend: TranslatorBackend,

    /// Pre-constructed translator. Takes precedence over `backend`.
    pub translator: Option<Arc<dyn Translator>>,

    /// Pre-constructed text detector. Takes precedence over tesseract.
    pub detector: Option<Arc<dyn TextDetector>>,

    /// Pre-constructed page renderer. Takes precedence over pdfium.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Pre-constructed PDF writer. Takes precedence over pdfium.
    pub assembler: Option<Arc<dyn PageAssembler>>,

    /// Explicit overlay font file. When `None`, the font is taken from the
    /// font cache, downloading `font_source` on first use.
    pub font_path: Option<PathBuf>,

    /// Download location and cache name for the overlay font.
    pub font_source: FontSource,

    /// Fail the run when the font cannot be downloaded. Default: false.
    ///
    /// When false, a missing font logs a warning and pages get rectangles
    /// but no translated text. A font file that exists but cannot be parsed
    /// is always fatal.
    pub require_font: bool,

    /// Colours and sizes used when drawing annotations.
    pub style: AnnotationStyle,

    /// Per-translation-call timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 3000,
            concurrency: 1,
            source_lang: "ja".to_string(),
            target_lang: "en".to_string(),
            ocr_language: "jpn".to_string(),
            ocr_psm: 3,
            tesseract_cmd: "tesseract".to_string(),
            backend: TranslatorBackend::default(),
            translator: None,
            detector: None,
            rasterizer: None,
            assembler: None,
            font_path: None,
            font_source: FontSource::default(),
            require_font: false,
            style: AnnotationStyle::default(),
            api_timeout_secs: 30,
            download_timeout_secs: 120,
            password: None,
            pages: PageSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnnotateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotateConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_psm", &self.ocr_psm)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("backend", &self.backend)
            .field("translator", &self.translator.as_ref().map(|t| t.name().to_string()))
            .field("detector", &self.detector.as_ref().map(|_| "<dyn TextDetector>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field("assembler", &self.assembler.as_ref().map(|_| "<dyn PageAssembler>"))
            .field("font_path", &self.font_path)
            .field("font_source", &self.font_source)
            .field("require_font", &self.require_font)
            .field("style", &self.style)
            .field("pages", &self.pages)
            .finish()
    }
}

impl AnnotateConfig {
    /// Create a new builder for `AnnotateConfig`.
    pub fn builder() -> AnnotateConfigBuilder {
        AnnotateConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnnotateConfig`].
#[derive(Debug)]
pub struct AnnotateConfigBuilder {
    config: AnnotateConfig,
}

impl AnnotateConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Set the translation language pair, e.g. `("ja", "en")`.
    pub fn languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.config.source_lang = source.into();
        self.config.target_lang = target.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_psm(mut self, psm: u8) -> Self {
        self.config.ocr_psm = psm;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn backend(mut self, backend: TranslatorBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.config.detector = Some(detector);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn assembler(mut self, assembler: Arc<dyn PageAssembler>) -> Self {
        self.config.assembler = Some(assembler);
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn font_source(mut self, source: FontSource) -> Self {
        self.config.font_source = source;
        self
    }

    pub fn require_font(mut self, v: bool) -> Self {
        self.config.require_font = v;
        self
    }

    pub fn style(mut self, style: AnnotationStyle) -> Self {
        self.config.style = style;
        self
    }

    pub fn font_size(mut self, px: f32) -> Self {
        self.config.style.font_size = px.clamp(4.0, 200.0);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnnotateConfig, TranslatePdfError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(TranslatePdfError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(TranslatePdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.source_lang.trim().is_empty() || c.target_lang.trim().is_empty() {
            return Err(TranslatePdfError::InvalidConfig(
                "Source and target languages must be non-empty".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(TranslatePdfError::InvalidConfig(
                "OCR language must be non-empty".into(),
            ));
        }
        if c.ocr_psm > 13 {
            return Err(TranslatePdfError::InvalidConfig(format!(
                "Tesseract PSM must be 0–13, got {}",
                c.ocr_psm
            )));
        }
        if c.style.box_thickness == 0 {
            return Err(TranslatePdfError::InvalidConfig(
                "Box thickness must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Translation service used when no pre-built translator is configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranslatorBackend {
    /// Google's public web translation endpoint. No API key. (default)
    #[default]
    Google,
    /// Any edgequake-llm provider. `None` fields fall back to environment
    /// auto-detection.
    Llm {
        provider: Option<String>,
        model: Option<String>,
    },
}

/// Colours and geometry for drawn annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    /// Overlay text height in pixels. Default: 20.
    pub font_size: f32,
    /// Distance between the block's top edge and the text origin. Default: 20.
    pub label_offset: u32,
    /// Rectangle outline width in pixels. Default: 2.
    pub box_thickness: u32,
    /// Rectangle outline colour (RGBA). Default: green.
    pub box_color: [u8; 4],
    /// Overlay text colour (RGBA). Default: red.
    pub text_color: [u8; 4],
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            font_size: 20.0,
            label_offset: 20,
            box_thickness: 2,
            box_color: [0, 128, 0, 255],
            text_color: [255, 0, 0, 255],
        }
    }
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = AnnotateConfig::default();
        assert_eq!(c.source_lang, "ja");
        assert_eq!(c.target_lang, "en");
        assert_eq!(c.ocr_language, "jpn");
        assert_eq!(c.concurrency, 1);
        assert!(!c.require_font);
        assert_eq!(c.style.font_size, 20.0);
        assert_eq!(c.style.label_offset, 20);
        assert_eq!(c.style.box_thickness, 2);
    }

    #[test]
    fn builder_clamps_dpi_and_concurrency() {
        let c = AnnotateConfig::builder()
            .dpi(10)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_empty_language() {
        let err = AnnotateConfig::builder()
            .languages("", "en")
            .build()
            .unwrap_err();
        assert!(matches!(err, TranslatePdfError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_bad_psm() {
        let err = AnnotateConfig::builder().ocr_psm(14).build().unwrap_err();
        assert!(err.to_string().contains("PSM"), "got: {err}");
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", AnnotateConfig::default());
        assert!(s.contains("AnnotateConfig"));
        assert!(s.contains("translator: None"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }
}
