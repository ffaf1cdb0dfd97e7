//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! pdfium is synchronous and keeps thread-local state, so callers run
//! [`Rasterizer`] methods inside `tokio::task::spawn_blocking`.
//!
//! Resolution is `dpi / 72` pdfium scale, with the longest edge capped at
//! `max_rendered_pixels` so an A0 poster does not exhaust memory.

use crate::error::TranslatePdfError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// One rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    pub image: DynamicImage,
}

/// Renders PDF pages to raster images.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path, password: Option<&str>) -> Result<usize, TranslatePdfError>;

    /// Render the given 0-indexed pages, returning one image per index in the
    /// order given. An index past the last page is `PageOutOfRange`.
    fn rasterize(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        page_indices: &[usize],
    ) -> Result<Vec<PageImage>, TranslatePdfError>;
}

/// Bind to a pdfium library.
///
/// `PDFIUM_LIB_PATH` wins when set; otherwise a library next to the working
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, TranslatePdfError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| TranslatePdfError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// [`Rasterizer`] backed by pdfium-render.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    pub fn new(dpi: u32, max_pixels: u32) -> Self {
        Self { dpi, max_pixels }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf_path: &Path, password: Option<&str>) -> Result<usize, TranslatePdfError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, pdf_path, password)?;
        Ok(document.pages().len() as usize)
    }

    fn rasterize(
        &self,
        pdf_path: &Path,
        password: Option<&str>,
        page_indices: &[usize],
    ) -> Result<Vec<PageImage>, TranslatePdfError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, pdf_path, password)?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(page_indices.len());

        for &idx in page_indices {
            if idx >= total_pages {
                return Err(TranslatePdfError::PageOutOfRange {
                    page: idx + 1,
                    total: total_pages,
                });
            }

            let page = pages
                .get(idx as u16)
                .map_err(|e| TranslatePdfError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                TranslatePdfError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            // OCR and the output PDF have no use for an alpha channel.
            let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push(PageImage {
                page_num: idx + 1,
                image,
            });
        }

        Ok(results)
    }
}

/// Open a document, mapping pdfium's load errors onto typed errors.
fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, TranslatePdfError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                TranslatePdfError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                TranslatePdfError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            TranslatePdfError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}
