//! Word detections, bounding boxes and block grouping.
//!
//! Tesseract numbers every word with the block it belongs to. Words of one
//! block arrive contiguously, so grouping is a single left fold: extend the
//! open block while the index repeats, close it when the index changes.
//! Non-contiguous indices are not re-sorted; they simply produce more blocks.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(left, top, right - left, bottom - top)
    }
}

/// One word reported by the text detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDetection {
    pub text: String,
    /// Detector-assigned block number; equal numbers belong together.
    pub block_index: u32,
    pub bbox: BoundingBox,
    /// Recognition confidence (0–100). Not used for grouping.
    pub confidence: f32,
}

impl WordDetection {
    pub fn new(text: impl Into<String>, block_index: u32, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            text: text.into(),
            block_index,
            bbox,
            confidence,
        }
    }
}

/// A contiguous run of words sharing one block index; the unit of translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub block_index: u32,
    /// Union of every member word's box.
    pub bbox: BoundingBox,
    /// Member words joined with single spaces, in encounter order.
    pub text: String,
    pub words: Vec<WordDetection>,
}

impl TextBlock {
    fn open(word: WordDetection) -> Self {
        Self {
            block_index: word.block_index,
            bbox: word.bbox,
            text: word.text.clone(),
            words: vec![word],
        }
    }

    fn extend(&mut self, word: WordDetection) {
        self.bbox = self.bbox.union(&word.bbox);
        self.text.push(' ');
        self.text.push_str(&word.text);
        self.words.push(word);
    }
}

/// Group word detections into text blocks.
///
/// Whitespace-only words are dropped before grouping, so they neither open a
/// block nor split one.
pub fn group_blocks<I>(words: I) -> Vec<TextBlock>
where
    I: IntoIterator<Item = WordDetection>,
{
    words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty())
        .map(|mut w| {
            w.text = w.text.trim().to_string();
            w
        })
        .fold(Vec::new(), |mut blocks: Vec<TextBlock>, word| {
            match blocks.last_mut() {
                Some(open) if open.block_index == word.block_index => open.extend(word),
                _ => blocks.push(TextBlock::open(word)),
            }
            blocks
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, block: u32, l: u32, t: u32, w: u32, h: u32) -> WordDetection {
        WordDetection::new(text, block, BoundingBox::new(l, t, w, h), 90.0)
    }

    #[test]
    fn union_takes_min_corner_and_max_extent() {
        let a = BoundingBox::new(10, 20, 30, 10);
        let b = BoundingBox::new(5, 25, 10, 40);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(5, 20, 35, 45));
        assert_eq!(u.right(), 40);
        assert_eq!(u.bottom(), 65);
    }

    #[test]
    fn groups_contiguous_indices_into_three_blocks() {
        let words = vec![
            word("a", 0, 10, 10, 20, 10),
            word("b", 0, 35, 12, 15, 10),
            word("c", 0, 10, 25, 50, 12),
            word("d", 1, 100, 100, 10, 10),
            word("e", 1, 115, 100, 10, 10),
            word("f", 2, 200, 300, 40, 20),
        ];

        let blocks = group_blocks(words);
        assert_eq!(blocks.len(), 3);

        assert_eq!(blocks[0].block_index, 0);
        assert_eq!(blocks[0].text, "a b c");
        assert_eq!(blocks[0].bbox, BoundingBox::new(10, 10, 50, 27));
        assert_eq!(blocks[0].words.len(), 3);

        assert_eq!(blocks[1].text, "d e");
        assert_eq!(blocks[1].bbox, BoundingBox::new(100, 100, 25, 10));

        assert_eq!(blocks[2].text, "f");
        assert_eq!(blocks[2].bbox, BoundingBox::new(200, 300, 40, 20));
    }

    #[test]
    fn whitespace_words_are_skipped() {
        let words = vec![
            word("  ", 0, 0, 0, 500, 500),
            word("x", 0, 10, 10, 5, 5),
            word("", 1, 0, 0, 1, 1),
            word(" y ", 0, 20, 10, 5, 5),
        ];
        let blocks = group_blocks(words);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "x y");
        // The skipped whitespace word's huge box must not leak into the union.
        assert_eq!(blocks[0].bbox, BoundingBox::new(10, 10, 15, 5));
    }

    #[test]
    fn non_contiguous_indices_split_blocks() {
        let words = vec![
            word("a", 1, 0, 0, 1, 1),
            word("b", 2, 0, 0, 1, 1),
            word("c", 1, 0, 0, 1, 1),
        ];
        let blocks = group_blocks(words);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].block_index, 1);
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(group_blocks(Vec::new()).is_empty());
    }
}
