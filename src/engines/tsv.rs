//! Parser for Tesseract's TSV output
//!
//! Columns: level, page_num, block_num, par_num, line_num, word_num, left,
//! top, width, height, conf, text. Only word rows (level 5) become regions.

use crate::engine::{BoundingBox, TextRegion, INVALID_CONFIDENCE};

const WORD_LEVEL: u32 = 5;
const COLUMNS: usize = 12;

/// Turn TSV rows into word regions, in the order Tesseract reported them.
/// Malformed rows are skipped; unparsable or negative confidences become the
/// invalid sentinel.
pub fn parse_words(tsv: &str) -> Vec<TextRegion> {
    tsv.lines().filter_map(parse_row).collect()
}

fn parse_row(row: &str) -> Option<TextRegion> {
    let fields: Vec<&str> = row.splitn(COLUMNS, '\t').collect();
    if fields.len() < COLUMNS {
        return None;
    }

    // Header row fails here as well
    let level: u32 = fields[0].trim().parse().ok()?;
    if level != WORD_LEVEL {
        return None;
    }

    let text = fields[11].trim();
    if text.is_empty() {
        return None;
    }

    let number = |i: usize| fields[i].trim().parse::<i64>().ok().map(|v| v.max(0) as u32);
    let bounding_box = BoundingBox {
        left: number(6)?,
        top: number(7)?,
        width: number(8)?,
        height: number(9)?,
    };

    let confidence = fields[10]
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|c| c.is_finite() && *c >= 0.0)
        .map(|c| c.min(100.0))
        .unwrap_or(INVALID_CONFIDENCE);

    Some(TextRegion {
        text: text.to_string(),
        bounding_box,
        confidence,
    })
}
