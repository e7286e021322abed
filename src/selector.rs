//! Target line selection
//!
//! Picks the single OCR line most likely to carry the waybill's `_1_`
//! identifier. Two heuristics exist side by side; the evaluation harness can
//! score both against the same OCR output.

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Marker every waybill ID line carries
pub const TARGET_PATTERN: &str = "_1_";

/// Lines containing a `1` must be longer than this to qualify on their own
const MIN_DIGIT_LINE_LEN: usize = 6;

/// Characters that end a line in OCR output
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

fn re_one_then_underscore() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"1.*_").expect("invalid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// `_1_`, then `_1`, then a long line with a `1`, then the last line
    #[default]
    Tiered,
    /// `_1_`, then a `1` followed somewhere by `_`, otherwise nothing
    Pattern,
}

impl SelectionStrategy {
    pub const ALL: [SelectionStrategy; 2] = [SelectionStrategy::Tiered, SelectionStrategy::Pattern];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiered => "tiered",
            Self::Pattern => "pattern",
        }
    }

    /// Select from a raw OCR text blob
    pub fn select_from_text(&self, raw_text: &str) -> Option<String> {
        let lines: Vec<&str> = split_lines(raw_text).collect();
        self.select(&lines).map(str::to_string)
    }

    /// Select from pre-split lines; lines are trimmed and blank ones ignored
    pub fn select<'a, S: AsRef<str>>(&self, lines: &'a [S]) -> Option<&'a str> {
        let lines: Vec<&'a str> = lines
            .iter()
            .map(|line| line.as_ref().trim())
            .filter(|line| !line.is_empty())
            .collect();

        match self {
            Self::Tiered => select_tiered(&lines),
            Self::Pattern => select_pattern(&lines),
        }
    }
}

fn select_tiered<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines
        .iter()
        .find(|line| line.contains(TARGET_PATTERN))
        .or_else(|| lines.iter().find(|line| line.contains("_1")))
        .or_else(|| {
            lines
                .iter()
                .find(|line| line.contains('1') && line.chars().count() > MIN_DIGIT_LINE_LEN)
        })
        .or_else(|| lines.last())
        .copied()
}

fn select_pattern<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines
        .iter()
        .find(|line| line.contains(TARGET_PATTERN))
        .or_else(|| lines.iter().find(|line| re_one_then_underscore().is_match(line)))
        .copied()
}

/// Split on every line break, not only `\n` and `\r\n`; a `\r\n` pair
/// leaves a blank line behind, which selection skips anyway
pub fn split_lines(raw_text: &str) -> impl Iterator<Item = &str> {
    raw_text.split(LINE_BREAKS)
}

/// Tiered selection over a raw OCR text blob
pub fn find_target_line(raw_text: &str) -> Option<String> {
    SelectionStrategy::Tiered.select_from_text(raw_text)
}
