//! Importer error types

use leadbook_common::errors::AppError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that abort a whole import run before anything is written
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unable to parse CSV file{}: {message}", line.map(|l| format!(" (line {l})")).unwrap_or_default())]
    MalformedCsv { line: Option<u64>, message: String },

    #[error("No valid rows found: {0}")]
    NoValidRows(String),

    #[error("Please provide a category name")]
    BlankCategory,

    #[error("Invalid import options: {0}")]
    InvalidOptions(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map(|p| p.line());
        let message = match e.kind() {
            csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {}", err),
            _ => e.to_string(),
        };
        ImportError::MalformedCsv { line, message }
    }
}

impl From<ImportError> for AppError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::MalformedCsv { line, message } => AppError::MalformedCsv {
                message: match line {
                    Some(line) => format!("line {line}: {message}"),
                    None => message,
                },
            },
            ImportError::NoValidRows(message) => AppError::NoValidRows { message },
            ImportError::BlankCategory => AppError::MissingField { field: "category".into() },
            ImportError::InvalidOptions(message) => AppError::Validation { message, field: None },
            ImportError::IoError(e) => AppError::from(e),
        }
    }
}

/// Pipeline step a category group failed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    LookupCategory,
    CreateCategory,
    InsertLeads,
    LinkLeads,
    InsertCompetitors,
}

impl ImportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStage::LookupCategory => "lookup_category",
            ImportStage::CreateCategory => "create_category",
            ImportStage::InsertLeads => "insert_leads",
            ImportStage::LinkLeads => "link_leads",
            ImportStage::InsertCompetitors => "insert_competitors",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure scoped to one category group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupError {
    pub category: String,
    pub stage: ImportStage,
    pub message: String,
}

impl GroupError {
    pub fn new(category: &str, stage: ImportStage, cause: impl fmt::Display) -> Self {
        Self {
            category: category.to_string(),
            stage,
            message: cause.to_string(),
        }
    }
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.category, self.stage, self.message)
    }
}
