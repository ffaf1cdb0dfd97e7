//! Annotation: draw block rectangles and translated labels onto a page.
//!
//! The input image is never touched; drawing happens on a copy whose colour
//! type matches the input. Only blocks with non-empty translated text are
//! drawn, so a page whose translations are all empty or failed comes back
//! pixel-identical.

use crate::config::AnnotationStyle;
use crate::error::TranslatePdfError;
use crate::pipeline::blocks::{BoundingBox, TextBlock};
use crate::pipeline::translate::BlockTranslation;
use ab_glyph::{FontArc, PxScale};
use image::{ColorType, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed TrueType/OpenType font used for overlay text.
#[derive(Clone)]
pub struct OverlayFont {
    font: FontArc,
    path: PathBuf,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayFont").field("path", &self.path).finish()
    }
}

impl OverlayFont {
    /// Read and parse a font file. Failure names the offending path.
    pub fn load(path: &Path) -> Result<Self, TranslatePdfError> {
        let bytes = std::fs::read(path).map_err(|e| TranslatePdfError::FontLoadFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_bytes(bytes, path)
    }

    /// Parse font bytes; `origin` is only used in error messages.
    pub fn from_bytes(bytes: Vec<u8>, origin: impl Into<PathBuf>) -> Result<Self, TranslatePdfError> {
        let path = origin.into();
        let font = FontArc::try_from_vec(bytes).map_err(|e| TranslatePdfError::FontLoadFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        Ok(Self { font, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Draw annotations for one page.
///
/// `translations[i]` belongs to `blocks[i]`; differing lengths are an error.
/// With `font = None` rectangles are still drawn but labels are skipped.
pub fn annotate_page(
    page_num: usize,
    image: &DynamicImage,
    blocks: &[TextBlock],
    translations: &[BlockTranslation],
    style: &AnnotationStyle,
    font: Option<&OverlayFont>,
) -> Result<DynamicImage, TranslatePdfError> {
    if blocks.len() != translations.len() {
        return Err(TranslatePdfError::AlignmentMismatch {
            page: page_num,
            blocks: blocks.len(),
            translations: translations.len(),
        });
    }

    if translations.iter().all(|t| t.overlay_text().is_none()) {
        debug!("Page {}: nothing to annotate", page_num);
        return Ok(image.clone());
    }

    let mut canvas: RgbaImage = image.to_rgba8();
    let box_color = Rgba(style.box_color);
    let text_color = Rgba(style.text_color);
    let scale = PxScale::from(style.font_size);
    let mut drawn = 0usize;

    for (block, translation) in blocks.iter().zip(translations) {
        let Some(text) = translation.overlay_text() else {
            continue;
        };

        draw_box(&mut canvas, &block.bbox, style.box_thickness, box_color);
        if let Some(font) = font {
            let (x, y) = label_origin(&block.bbox, style.label_offset);
            draw_text_mut(&mut canvas, text_color, x, y, scale, &font.font, text);
        }
        drawn += 1;
    }

    debug!("Page {}: annotated {}/{} blocks", page_num, drawn, blocks.len());

    Ok(into_color(canvas, image.color()))
}

/// Convert the RGBA drawing canvas back to the page's original colour type.
fn into_color(canvas: RgbaImage, color: ColorType) -> DynamicImage {
    let canvas = DynamicImage::ImageRgba8(canvas);
    match color {
        ColorType::L8 => DynamicImage::ImageLuma8(canvas.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(canvas.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(canvas.to_rgb8()),
        ColorType::L16 => DynamicImage::ImageLuma16(canvas.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(canvas.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(canvas.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(canvas.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(canvas.to_rgb32f()),
        ColorType::Rgba32F => DynamicImage::ImageRgba32F(canvas.to_rgba32f()),
        _ => canvas,
    }
}

/// Text origin: `label_offset` pixels above the box's top-left corner,
/// clamped to the top edge of the page.
pub fn label_origin(bbox: &BoundingBox, label_offset: u32) -> (i32, i32) {
    let y = bbox.top as i64 - label_offset as i64;
    (bbox.left as i32, y.max(0) as i32)
}

/// Outline `bbox` with a `thickness`-pixel border drawn inwards.
fn draw_box(canvas: &mut RgbaImage, bbox: &BoundingBox, thickness: u32, color: Rgba<u8>) {
    for i in 0..thickness {
        let (Some(w), Some(h)) = (
            bbox.width.checked_sub(2 * i).filter(|w| *w > 0),
            bbox.height.checked_sub(2 * i).filter(|h| *h > 0),
        ) else {
            break;
        };
        let rect = Rect::at((bbox.left + i) as i32, (bbox.top + i) as i32).of_size(w, h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::blocks::WordDetection;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 120, WHITE))
    }

    fn block_at(left: u32, top: u32, width: u32, height: u32) -> TextBlock {
        let bbox = BoundingBox::new(left, top, width, height);
        TextBlock {
            block_index: 1,
            bbox,
            text: "こんにちは".into(),
            words: vec![WordDetection::new("こんにちは", 1, bbox, 90.0)],
        }
    }

    /// A CJK- or Latin-capable system font, if the machine has one.
    fn system_font() -> Option<OverlayFont> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .and_then(|p| OverlayFont::load(p).ok())
    }

    #[test]
    fn empty_translations_leave_image_identical() {
        let page = blank_page();
        let blocks = vec![block_at(20, 40, 60, 30), block_at(100, 60, 50, 20)];
        let translations = vec![
            BlockTranslation::Translated(String::new()),
            BlockTranslation::Translated("   ".into()),
        ];
        let out = annotate_page(1, &page, &blocks, &translations, &AnnotationStyle::default(), None).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn grayscale_page_keeps_its_colour_type() {
        let page = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 40, Luma([255])));
        let style = AnnotationStyle::default();

        let out = annotate_page(1, &page, &[], &[], &style, None).unwrap();
        assert_eq!(out, page);

        let blocks = vec![block_at(5, 5, 30, 20)];
        let out = annotate_page(1, &page, &blocks, &[BlockTranslation::Translated(String::new())], &style, None)
            .unwrap();
        assert_eq!(out, page);

        let out = annotate_page(1, &page, &blocks, &[BlockTranslation::Translated("Hi".into())], &style, None)
            .unwrap();
        assert_eq!(out.color(), ColorType::L8);
        let gray = out.to_luma8();
        assert_ne!(*gray.get_pixel(5, 5), Luma([255]));
        assert_eq!(*gray.get_pixel(20, 15), Luma([255]));
    }

    #[test]
    fn rgb16_page_keeps_its_colour_type() {
        let page = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(40, 30, Rgb([65535u16; 3])));
        let out = annotate_page(
            1,
            &page,
            &[block_at(2, 2, 20, 10)],
            &[BlockTranslation::Translated("x".into())],
            &AnnotationStyle::default(),
            None,
        )
        .unwrap();
        assert_eq!(out.color(), ColorType::Rgb16);
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn failed_translations_are_not_drawn() {
        let page = blank_page();
        let blocks = vec![block_at(20, 40, 60, 30)];
        let translations = vec![BlockTranslation::Failed {
            block: 0,
            detail: "HTTP 500".into(),
        }];
        let out = annotate_page(1, &page, &blocks, &translations, &AnnotationStyle::default(), None).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn translated_block_gets_a_box() {
        let page = blank_page();
        let blocks = vec![block_at(20, 40, 60, 30)];
        let translations = vec![BlockTranslation::Translated("Hello".into())];
        let style = AnnotationStyle::default();
        let out = annotate_page(1, &page, &blocks, &translations, &style, None)
            .unwrap()
            .to_rgb8();

        let green = Rgb([style.box_color[0], style.box_color[1], style.box_color[2]]);
        // Outer and inner ring of the 2-px border.
        assert_eq!(*out.get_pixel(20, 40), green);
        assert_eq!(*out.get_pixel(21, 41), green);
        assert_eq!(*out.get_pixel(79, 69), green);
        // Interior and outside untouched.
        assert_eq!(*out.get_pixel(50, 55), WHITE);
        assert_eq!(*out.get_pixel(10, 10), WHITE);
    }

    #[test]
    fn source_image_is_not_mutated() {
        let page = blank_page();
        let before = page.clone();
        let _ = annotate_page(
            1,
            &page,
            &[block_at(1, 1, 10, 10)],
            &[BlockTranslation::Translated("x".into())],
            &AnnotationStyle::default(),
            None,
        )
        .unwrap();
        assert_eq!(page, before);
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        let err = annotate_page(
            7,
            &blank_page(),
            &[block_at(1, 1, 10, 10), block_at(30, 30, 10, 10)],
            &[BlockTranslation::Translated("x".into())],
            &AnnotationStyle::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TranslatePdfError::AlignmentMismatch { page: 7, blocks: 2, translations: 1 }
        ));
    }

    #[test]
    fn label_sits_above_box_and_clamps_at_top() {
        assert_eq!(label_origin(&BoundingBox::new(30, 50, 10, 10), 20), (30, 30));
        assert_eq!(label_origin(&BoundingBox::new(30, 5, 10, 10), 20), (30, 0));
    }

    #[test]
    fn degenerate_boxes_do_not_panic() {
        let out = annotate_page(
            1,
            &blank_page(),
            &[block_at(5, 5, 0, 0), block_at(10, 10, 1, 3)],
            &[
                BlockTranslation::Translated("a".into()),
                BlockTranslation::Translated("b".into()),
            ],
            &AnnotationStyle::default(),
            None,
        );
        assert!(out.is_ok());
    }

    #[test]
    fn label_text_is_drawn_above_the_box() {
        let Some(font) = system_font() else {
            println!("SKIP — no system font available");
            return;
        };
        let page = blank_page();
        let style = AnnotationStyle::default();
        let blocks = vec![block_at(20, 60, 100, 30)];
        let translations = vec![BlockTranslation::Translated("Hello".into())];
        let out = annotate_page(1, &page, &blocks, &translations, &style, Some(&font))
            .unwrap()
            .to_rgb8();

        // Some non-white pixel in the label band between y=40 and the box top.
        let band_has_ink = (40..60).any(|y| (20..120).any(|x| *out.get_pixel(x, y) != WHITE));
        assert!(band_has_ink, "expected label pixels above the box");
    }

    #[test]
    fn unreadable_font_names_the_path() {
        let err = OverlayFont::load(Path::new("/no/such/font.ttf")).unwrap_err();
        assert!(err.to_string().contains("/no/such/font.ttf"));

        let err = OverlayFont::from_bytes(b"not a font".to_vec(), "bogus.ttf").unwrap_err();
        assert!(matches!(err, TranslatePdfError::FontLoadFailed { .. }));
    }
}
