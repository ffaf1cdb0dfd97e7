//! Text detection: page image → word detections with block indices.
//!
//! The default [`TesseractDetector`] shells out to the `tesseract` CLI in TSV
//! mode. TSV carries exactly what block grouping needs (block number, word
//! box and text per row) and keeps the crate free of a native libtesseract
//! link. The page image is written to a scoped temp PNG that is deleted when
//! detection returns, on success or failure.

use crate::pipeline::blocks::{BoundingBox, WordDetection};
use image::DynamicImage;
use std::io::Write;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Tesseract's TSV level for word rows.
const WORD_LEVEL: u32 = 5;

/// Errors from a single detection call.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The page image could not be written for the OCR engine.
    #[error("could not write page image: {0}")]
    Image(#[from] image::ImageError),

    /// Temp file handling failed.
    #[error("temp file error: {0}")]
    Io(#[from] std::io::Error),

    /// The OCR executable could not be started.
    #[error("failed to run '{cmd}' (is tesseract installed and on PATH?): {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    /// The OCR executable exited with an error.
    #[error("tesseract exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Produces word-level detections for one page image.
///
/// Implementations must return words in reading order with all words of a
/// block contiguous; [`crate::pipeline::blocks::group_blocks`] relies on it.
/// Called from a blocking thread, never from an async task directly.
pub trait TextDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<WordDetection>, DetectError>;
}

/// [`TextDetector`] backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    cmd: String,
    language: String,
    psm: u8,
    dpi: u32,
}

impl TesseractDetector {
    pub fn new(cmd: impl Into<String>, language: impl Into<String>, psm: u8, dpi: u32) -> Self {
        Self {
            cmd: cmd.into(),
            language: language.into(),
            psm,
            dpi,
        }
    }

    fn run_tsv(&self, image_path: &std::path::Path) -> Result<String, DetectError> {
        let output = Command::new(&self.cmd)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .arg("tsv")
            .output()
            .map_err(|source| DetectError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DetectError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<WordDetection>, DetectError> {
        let mut tmp = tempfile::Builder::new()
            .prefix("ocr-page-")
            .suffix(".png")
            .tempfile()?;
        image.write_to(&mut tmp, image::ImageFormat::Png)?;
        tmp.flush()?;

        let tsv = self.run_tsv(tmp.path())?;
        let words = parse_tsv(&tsv);
        debug!(
            "tesseract ({}): {} words from {}x{} image",
            self.language,
            words.len(),
            image.width(),
            image.height()
        );
        Ok(words)
    }
}

/// Parse tesseract TSV output into word detections, preserving row order.
///
/// Non-word rows (page, block, paragraph, line levels), the header and
/// malformed rows are ignored. Rows whose text column is missing become
/// empty words; grouping drops them.
pub fn parse_tsv(tsv: &str) -> Vec<WordDetection> {
    tsv.lines()
        .filter_map(|row| {
            let cols: Vec<&str> = row.split('\t').collect();
            if cols.len() < 11 {
                return None;
            }
            let level: u32 = cols[0].trim().parse().ok()?;
            if level != WORD_LEVEL {
                return None;
            }
            let block_index: u32 = cols[2].trim().parse().ok()?;
            let left: u32 = cols[6].trim().parse().ok()?;
            let top: u32 = cols[7].trim().parse().ok()?;
            let width: u32 = cols[8].trim().parse().ok()?;
            let height: u32 = cols[9].trim().parse().ok()?;
            let confidence: f32 = cols[10].trim().parse().unwrap_or(-1.0);
            let text = cols.get(11).copied().unwrap_or("");

            Some(WordDetection::new(
                text,
                block_index,
                BoundingBox::new(left, top, width, height),
                confidence,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1240\t1754\t-1\t
2\t1\t1\t0\t0\t0\t100\t80\t300\t40\t-1\t
5\t1\t1\t1\t1\t1\t100\t80\t120\t40\t95.5\tこんにちは
5\t1\t1\t1\t1\t2\t230\t82\t170\t38\t91.0\t世界
5\t1\t1\t1\t1\t3\t410\t82\t10\t38\t12.0\t
2\t1\t2\t0\t0\t0\t100\t400\t200\t30\t-1\t
5\t1\t2\t1\t1\t1\t100\t400\t200\t30\t88.25\tさようなら
";

    #[test]
    fn parses_word_rows_only() {
        let words = parse_tsv(SAMPLE_TSV);
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].text, "こんにちは");
        assert_eq!(words[0].block_index, 1);
        assert_eq!(words[0].bbox, BoundingBox::new(100, 80, 120, 40));
        assert!((words[0].confidence - 95.5).abs() < f32::EPSILON);
        assert_eq!(words[3].block_index, 2);
        assert_eq!(words[3].text, "さようなら");
    }

    #[test]
    fn parsed_rows_group_into_blocks() {
        let blocks = crate::pipeline::blocks::group_blocks(parse_tsv(SAMPLE_TSV));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "こんにちは 世界");
        assert_eq!(blocks[0].bbox, BoundingBox::new(100, 80, 300, 40));
    }

    #[test]
    fn missing_text_column_becomes_empty_word() {
        let words = parse_tsv("5\t1\t3\t1\t1\t1\t1\t2\t3\t4\t-1");
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "");
    }

    #[test]
    fn malformed_rows_are_ignored() {
        assert!(parse_tsv("garbage\nlevel\tpage_num\n5\tx\t1").is_empty());
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn missing_binary_reports_spawn_error() {
        let detector = TesseractDetector::new("definitely-not-tesseract-binary", "jpn", 3, 150);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));
        let err = detector.detect(&img).unwrap_err();
        assert!(matches!(err, DetectError::Spawn { .. }), "got: {err}");
    }
}
