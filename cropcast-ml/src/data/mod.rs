//! Data engineering: feature schema and tabular loading.

pub mod schema;
pub mod source;

pub use schema::{ColumnRole, FeatureSchema, SchemaKind};
pub use source::{CsvSource, DataBatch, DataSource, DataSourceInfo, cell_as_f64, number_cell};
