//! Import configuration
//!
//! One set of options covers every import flavour: grouping by a per-row
//! column, or putting the whole file under a category named by the caller.

use crate::errors::ImportError;
use leadbook_common::config::ImportConfig;
use leadbook_common::db::models::LeadStatus;
use std::collections::BTreeSet;

/// Where a row's category name comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySource {
    /// Read the category from this column of every row
    Column(String),
    /// Every row goes into this category
    Explicit(String),
}

impl Default for CategorySource {
    fn default() -> Self {
        CategorySource::Column("query".to_string())
    }
}

/// Lead columns an import may leave out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionalField {
    Reviews,
    Rating,
    Website,
    Phone,
    OwnerName,
    Query,
    Competitors,
}

impl OptionalField {
    pub const ALL: [OptionalField; 7] = [
        OptionalField::Reviews,
        OptionalField::Rating,
        OptionalField::Website,
        OptionalField::Phone,
        OptionalField::OwnerName,
        OptionalField::Query,
        OptionalField::Competitors,
    ];

    /// Column header the field is read from
    pub fn column(&self) -> &'static str {
        match self {
            OptionalField::Reviews => "reviews",
            OptionalField::Rating => "rating",
            OptionalField::Website => "website",
            OptionalField::Phone => "phone",
            OptionalField::OwnerName => "owner_name",
            OptionalField::Query => "query",
            OptionalField::Competitors => "competitors",
        }
    }
}

/// Validated options for one import run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    category_source: CategorySource,
    default_status: LeadStatus,
    fields: BTreeSet<OptionalField>,
    delimiter: u8,
}

impl ImportOptions {
    pub fn builder() -> ImportOptionsBuilder {
        ImportOptionsBuilder::default()
    }

    pub fn category_source(&self) -> &CategorySource {
        &self.category_source
    }

    pub fn default_status(&self) -> LeadStatus {
        self.default_status
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Whether `field` is read from the file
    pub fn includes(&self, field: OptionalField) -> bool {
        self.fields.contains(&field)
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            category_source: CategorySource::default(),
            default_status: LeadStatus::default(),
            fields: OptionalField::ALL.into_iter().collect(),
            delimiter: b',',
        }
    }
}

/// Builder for [`ImportOptions`]
#[derive(Debug, Clone, Default)]
pub struct ImportOptionsBuilder {
    options: ImportOptions,
}

impl ImportOptionsBuilder {
    /// Seed a builder from the service configuration
    pub fn from_config(config: &ImportConfig) -> Result<Self, ImportError> {
        let status = config
            .default_status
            .parse::<LeadStatus>()
            .map_err(|e| ImportError::InvalidOptions(e.to_string()))?;

        if !config.delimiter.is_ascii() {
            return Err(ImportError::InvalidOptions(format!(
                "delimiter '{}' is not a single ASCII character",
                config.delimiter
            )));
        }

        Ok(Self::default()
            .group_by_column(&config.category_column)
            .default_status(status)
            .delimiter(config.delimiter as u8))
    }

    /// Group rows by the value of `column`
    pub fn group_by_column(mut self, column: &str) -> Self {
        self.options.category_source = CategorySource::Column(column.trim().to_string());
        self
    }

    /// Put every row into the category called `name`
    pub fn category(mut self, name: &str) -> Self {
        self.options.category_source = CategorySource::Explicit(name.trim().to_string());
        self
    }

    pub fn default_status(mut self, status: LeadStatus) -> Self {
        self.options.default_status = status;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.options.delimiter = delimiter;
        self
    }

    /// Read only the given optional fields; the rest are left null
    pub fn fields(mut self, fields: impl IntoIterator<Item = OptionalField>) -> Self {
        self.options.fields = fields.into_iter().collect();
        self
    }

    pub fn without_field(mut self, field: OptionalField) -> Self {
        self.options.fields.remove(&field);
        self
    }

    pub fn build(self) -> Result<ImportOptions, ImportError> {
        match &self.options.category_source {
            CategorySource::Explicit(name) if name.is_empty() => {
                return Err(ImportError::BlankCategory);
            }
            CategorySource::Column(column) if column.is_empty() => {
                return Err(ImportError::InvalidOptions("category column name is empty".into()));
            }
            _ => {}
        }

        if matches!(self.options.delimiter, b'"' | b'\n' | b'\r') {
            return Err(ImportError::InvalidOptions(format!(
                "{:?} cannot be used as a delimiter",
                self.options.delimiter as char
            )));
        }

        Ok(self.options)
    }
}
