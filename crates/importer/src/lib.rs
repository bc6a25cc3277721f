//! Leadbook Importer
//!
//! CSV bulk import of leads:
//! - Decoding and per-row normalization
//! - Competitor cell parsing
//! - Category resolve-or-create and bulk lead insertion behind [`LeadStore`]
//! - An in-memory store for dry runs and tests

pub mod competitors;
pub mod errors;
pub mod memory;
pub mod options;
pub mod pipeline;
pub mod row;
pub mod store;

pub use errors::{GroupError, ImportError, ImportStage};
pub use memory::MemoryStore;
pub use options::{CategorySource, ImportOptions, ImportOptionsBuilder, OptionalField};
pub use pipeline::{ImportReport, Importer};
pub use store::LeadStore;
