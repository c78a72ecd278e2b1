//! Retrieval from the public patent warehouse (BigQuery) and CSV export.

mod error;
pub use error::StoreError;

pub mod bigquery;
pub mod credentials;
pub mod export;
pub mod query;

pub use bigquery::BigQueryClient;
pub use credentials::{ServiceAccountKey, expand_path};
pub use export::{write_classified, write_raw};
pub use query::PatentQuery;
