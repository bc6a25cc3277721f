//! Competitor cell parser
//!
//! The `competitors` column holds free text of the form
//!
//! ```text
//! Name: Bob's Shop
//! Link: https://maps.example/bob
//! Reviews: 1,204 ratings
//!
//! Name: Second Place
//! ```
//!
//! Entries are separated by blank lines. Unrecognized lines are ignored.

use crate::row::truncate_chars;
use regex_lite::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Longest competitor name kept
pub const COMPETITOR_NAME_MAX_CHARS: usize = 500;

/// One competitor entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorEntry {
    pub name: String,
    pub link: Option<String>,
    pub reviews: Option<i32>,
}

/// Parse a competitors cell; never fails, worst case returns nothing
pub fn parse_competitors(text: &str) -> Vec<CompetitorEntry> {
    let mut entries = Vec::new();
    let mut current = PartialEntry::default();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            entries.extend(current.finish());
            current = PartialEntry::default();
            continue;
        }

        if let Some(value) = strip_label(line, "Name:") {
            current.name = Some(value.to_string()).filter(|v| !v.is_empty());
        } else if let Some(value) = strip_label(line, "Link:") {
            current.link = Some(value.to_string()).filter(|v| !v.is_empty());
        } else if let Some(value) = strip_label(line, "Reviews:") {
            current.reviews = parse_review_count(value);
        }
    }
    entries.extend(current.finish());

    entries
}

/// First digit run in `value`, commas between digits treated as thousands separators
pub fn parse_review_count(value: &str) -> Option<i32> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();

    let digits = DIGITS
        .get_or_init(|| Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").ok())
        .as_ref()?;

    digits
        .find(value)?
        .as_str()
        .replace(',', "")
        .parse()
        .ok()
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

#[derive(Default)]
struct PartialEntry {
    name: Option<String>,
    link: Option<String>,
    reviews: Option<i32>,
}

impl PartialEntry {
    fn finish(self) -> Option<CompetitorEntry> {
        let name = self.name?;
        Some(CompetitorEntry {
            name: truncate_chars(&name, COMPETITOR_NAME_MAX_CHARS),
            link: self.link,
            reviews: self.reviews,
        })
    }
}
