use thiserror::Error;

use crate::store::StoreError;

/// Convenience result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Error type returned by the import pipeline.
///
/// Every variant is terminal for the invocation that produced it. Nothing is retried and
/// nothing already written to the store is rolled back.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source identifier is not exactly two dot-separated tokens (`family.dataset`).
    #[error("could not parse the source string '{source_id}': expected 'family.dataset'")]
    InvalidSourceFormat { source_id: String },

    /// The source identifier is well formed but nothing is registered under it.
    #[error("no importer registered for '{family}.{dataset}'")]
    UnknownDataset { family: String, dataset: String },

    /// An importer saw a sample that does not have the shape its family expects.
    #[error("unsupported format for '{dataset}': {message}")]
    UnsupportedFormat { dataset: String, message: String },

    /// The materialized dataset files could not be found under the download directory.
    #[error("dataset '{dataset}' is not available under {path}: {message}")]
    DatasetUnavailable {
        dataset: String,
        path: String,
        message: String,
    },

    /// Two importer families were registered under the same name.
    #[error("an importer is already registered for '{family}.{dataset}'")]
    DuplicateImporter { family: String, dataset: String },

    /// The store refused a column creation request.
    #[error("failed to create column '{name}': {source}")]
    ColumnCreationFailed {
        name: String,
        #[source]
        source: StoreError,
    },

    /// The store refused a record write.
    #[error("failed to write column '{column}' at index {index}: {source}")]
    WriteFailed {
        column: String,
        index: usize,
        #[source]
        source: StoreError,
    },

    /// The store refused the final commit. Written records stay in the uncommitted state.
    #[error("commit failed: {0}")]
    CommitFailed(#[source] StoreError),

    /// The store's write session could not be acquired.
    #[error("could not open a write session: {0}")]
    SessionUnavailable(#[source] StoreError),

    /// A record or a pre-existing column disagrees with the importer's declared schema.
    #[error("schema conflict on column '{column}': {message}")]
    SchemaConflict { column: String, message: String },

    /// The invocation was cancelled between two records.
    #[error("import cancelled after {records_written} records")]
    Cancelled { records_written: u64 },

    /// Underlying I/O error while reading a materialized dataset.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to render the import report.
    #[error("report error: {0}")]
    Report(#[from] polars::prelude::PolarsError),

    /// Import settings could not be parsed.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),
}
