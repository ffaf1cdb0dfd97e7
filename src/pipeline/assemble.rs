//! Output assembly: annotated page images → one PDF, written atomically.
//!
//! Each image becomes a page whose size in points equals the image size in
//! pixels, with the image filling the page. The file on disk is only ever
//! the complete document: bytes go to a temp file in the destination
//! directory which is renamed over the target on success and deleted on
//! failure.

use crate::error::TranslatePdfError;
use crate::pipeline::render::bind_pdfium;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Builds a PDF document from page images, first image first.
pub trait PageAssembler: Send + Sync {
    fn assemble(&self, pages: &[DynamicImage]) -> Result<Vec<u8>, TranslatePdfError>;
}

/// [`PageAssembler`] backed by pdfium-render.
#[derive(Debug, Clone, Default)]
pub struct PdfiumAssembler;

impl PageAssembler for PdfiumAssembler {
    fn assemble(&self, pages: &[DynamicImage]) -> Result<Vec<u8>, TranslatePdfError> {
        if pages.is_empty() {
            return Err(TranslatePdfError::AssemblyFailed {
                detail: "no pages to assemble".into(),
            });
        }

        let pdfium = bind_pdfium()?;
        let mut document = pdfium.create_new_pdf().map_err(assembly_err)?;

        for (idx, image) in pages.iter().enumerate() {
            let width = PdfPoints::new(image.width() as f32);
            let height = PdfPoints::new(image.height() as f32);

            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(assembly_err)?;

            page.objects_mut()
                .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, image, Some(width), Some(height))
                .map_err(assembly_err)?;

            debug!("Assembled page {} ({}x{})", idx + 1, image.width(), image.height());
        }

        let bytes = document.save_to_bytes().map_err(assembly_err)?;
        info!("Assembled {} pages, {} bytes", pages.len(), bytes.len());
        Ok(bytes)
    }
}

fn assembly_err(e: PdfiumError) -> TranslatePdfError {
    TranslatePdfError::AssemblyFailed {
        detail: format!("{:?}", e),
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
///
/// Missing parent directories are created. On any failure the destination
/// is left as it was.
pub fn write_pdf_atomically(path: &Path, bytes: &[u8]) -> Result<(), TranslatePdfError> {
    let write_err = |source: std::io::Error| TranslatePdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.pdf");

        write_pdf_atomically(&out, b"%PDF-first").unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-first");

        write_pdf_atomically(&out, b"%PDF-second").unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-second");

        // Only the final file remains; no temp leftovers.
        let entries: Vec<_> = std::fs::read_dir(out.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unwritable_destination_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let out = blocker.join("out.pdf");

        let err = write_pdf_atomically(&out, b"%PDF").unwrap_err();
        match err {
            TranslatePdfError::OutputWriteFailed { path, .. } => assert_eq!(path, out),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.exists());
    }

    #[test]
    fn empty_page_list_is_rejected() {
        let err = PdfiumAssembler.assemble(&[]).unwrap_err();
        assert!(matches!(err, TranslatePdfError::AssemblyFailed { .. }));
    }
}
