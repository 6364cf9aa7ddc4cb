//! Movies Warehouse Transformer
//!
//! Turns a raw movie snapshot into a star schema (silver) and two summary
//! tables (gold):
//! - Parse and standardize the raw rows
//! - Split genre and crew strings into lists
//! - Build dimensions, bridges and the performance fact table
//! - Aggregate revenue by genre and average score by year
//!
//! Runs are deterministic: the same snapshot yields the same silver tables.
//! Only the gold `updated_at` stamp changes between runs.

pub mod bridges;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod gold;
pub mod keys;
pub mod parse;
pub mod pipeline;
pub mod search;
pub mod source;
pub mod split;
pub mod table;
pub mod writer;

pub use config::{ReferencePolicy, TransformConfig, ValuePolicy};
pub use error::{SourceError, TransformError, WriteError};
pub use pipeline::{transform, transform_at, SilverTables, Warehouse};
pub use search::{build_documents, MovieDocument, MovieFilter};
pub use source::{read_snapshot, Snapshot};
pub use table::RawTable;
pub use writer::{write_warehouse, RunManifest};
