//! CSV decoding and row normalization

use crate::competitors::{parse_competitors, CompetitorEntry};
use crate::errors::ImportError;
use crate::options::{CategorySource, ImportOptions, OptionalField};
use leadbook_common::db::models::NewLead;
use std::collections::HashMap;
use tracing::debug;

/// Column-width limits of the lead table, in characters
pub const NAME_MAX_CHARS: usize = 255;
pub const WEBSITE_MAX_CHARS: usize = 255;
pub const PHONE_MAX_CHARS: usize = 50;
pub const OWNER_NAME_MAX_CHARS: usize = 255;
pub const QUERY_MAX_CHARS: usize = 500;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One decoded data record, keyed by header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// Line the record starts on (header is line 1)
    pub line: u64,
    values: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            line: 0,
            values: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// A row that passed validation, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct LeadRow {
    pub line: u64,
    /// Category key, only set when grouping by column
    pub category: Option<String>,
    pub lead: NewLead,
    pub competitors: Vec<CompetitorEntry>,
}

/// Decode a whole file. Any structural problem fails the lot.
pub fn decode(content: &[u8], delimiter: u8) -> Result<Vec<RawRow>, ImportError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    check_quoting(content, delimiter)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let values = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(RawRow { line, values });
    }

    debug!(columns = headers.len(), rows = rows.len(), "CSV decoded");
    Ok(rows)
}

/// Validate and normalize one row; `None` drops it silently
pub fn normalize(row: &RawRow, options: &ImportOptions) -> Option<LeadRow> {
    let name = clean_text(row.get("name"), NAME_MAX_CHARS)?;

    let category = match options.category_source() {
        CategorySource::Column(column) => Some(
            row.get(column)
                .map(str::trim)
                .filter(|v| !v.is_empty())?
                .to_string(),
        ),
        CategorySource::Explicit(_) => None,
    };

    let text = |field: OptionalField, max_chars: usize| {
        options
            .includes(field)
            .then(|| clean_text(row.get(field.column()), max_chars))
            .flatten()
    };

    let reviews = options
        .includes(OptionalField::Reviews)
        .then(|| row.get("reviews").and_then(parse_int))
        .flatten();

    let rating = options
        .includes(OptionalField::Rating)
        .then(|| row.get("rating").and_then(parse_float))
        .flatten();

    let competitors = if options.includes(OptionalField::Competitors) {
        row.get("competitors").map(parse_competitors).unwrap_or_default()
    } else {
        Vec::new()
    };

    Some(LeadRow {
        line: row.line,
        category,
        lead: NewLead {
            name,
            reviews,
            rating,
            website: text(OptionalField::Website, WEBSITE_MAX_CHARS),
            phone: text(OptionalField::Phone, PHONE_MAX_CHARS),
            owner_name: text(OptionalField::OwnerName, OWNER_NAME_MAX_CHARS),
            query: text(OptionalField::Query, QUERY_MAX_CHARS),
            status: options.default_status(),
        },
        competitors,
    })
}

/// Trim, map blank to `None`, cut to `max_chars`
pub fn clean_text(value: Option<&str>, max_chars: usize) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    Some(truncate_chars(value, max_chars))
}

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

/// Whole numbers only; `"12.0"` is accepted, `"12.5"` is not
pub fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i32>() {
        return Some(n);
    }

    let n = parse_float(value)?;
    (n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64).then_some(n as i32)
}

pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Reject quoted fields that never close or carry text after the closing quote.
///
/// The csv reader is lenient about both and would silently fold the rest of
/// the file into one field.
fn check_quoting(content: &[u8], delimiter: u8) -> Result<(), ImportError> {
    let mut line = 1u64;
    let mut opened_on = 1u64;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0;

    while i < content.len() {
        let byte = content[i];

        if byte == b'\n' {
            line += 1;
        }

        if in_quotes {
            if byte == b'"' {
                if content.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                in_quotes = false;

                let mut next = i + 1;
                while let Some(&b) = content.get(next) {
                    if b == delimiter || !matches!(b, b' ' | b'\t') {
                        break;
                    }
                    next += 1;
                }
                match content.get(next) {
                    None | Some(b'\n' | b'\r') => {}
                    Some(&b) if b == delimiter => {}
                    Some(_) => {
                        return Err(ImportError::MalformedCsv {
                            line: Some(line),
                            message: "unexpected text after a closing quote".into(),
                        });
                    }
                }
            }
        } else if byte == b'"' && field_start {
            in_quotes = true;
            opened_on = line;
        }

        field_start = !in_quotes && (byte == delimiter || byte == b'\n' || byte == b'\r');
        i += 1;
    }

    if in_quotes {
        return Err(ImportError::MalformedCsv {
            line: Some(opened_on),
            message: "quoted field is never closed".into(),
        });
    }

    Ok(())
}
