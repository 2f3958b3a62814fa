//! Importers: adapters that expose one dataset split as a schema-described record stream.
//!
//! An [`Importer`] declares its columns up front (names, element types, shapes, variability;
//! all aligned index-for-index) and is then consumed exactly once through
//! [`Importer::into_records`]. An [`ImporterFamily`] is the per-dataset factory that builds one
//! importer per canonical split from a download/cache directory.
//!
//! Built-in families live in [`vision`].

pub mod vision;

use std::fmt;
use std::path::Path;

use crate::error::ImportResult;
use crate::types::{ColumnSpec, ElementType, Record, Shape};

pub use vision::{Cifar10, IdxFamily, LabeledImageImporter};

/// Lazy, finite, single-pass record stream. Decoding failures surface per record.
pub type RecordIter = Box<dyn Iterator<Item = ImportResult<Record>> + Send>;

/// One dataset split, described by a static schema and consumed once.
pub trait Importer: Send {
    /// Dataset family identifier, e.g. `mnist`.
    fn name(&self) -> &str;

    /// Split name, e.g. `train` or `test`.
    fn split(&self) -> &str;

    fn column_names(&self) -> Vec<String>;

    fn dtypes(&self) -> Vec<ElementType>;

    fn shapes(&self) -> Vec<Shape>;

    fn variability_status(&self) -> Vec<bool>;

    /// Exact record count, known without consuming the stream.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The declared columns as creation specs, in column order.
    fn schema(&self) -> Vec<ColumnSpec> {
        self.column_names()
            .into_iter()
            .zip(self.dtypes())
            .zip(self.shapes())
            .zip(self.variability_status())
            .map(|(((name, dtype), shape), variable)| ColumnSpec::new(name, dtype, shape, variable))
            .collect()
    }

    /// Consume the importer and stream its records.
    fn into_records(self: Box<Self>) -> RecordIter;
}

impl fmt::Debug for dyn Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("name", &self.name())
            .field("split", &self.split())
            .field("len", &self.len())
            .finish()
    }
}

/// A dataset family: builds one [`Importer`] per canonical split.
pub trait ImporterFamily: Send + Sync {
    /// Name the family is registered under, e.g. `cifar10`.
    fn name(&self) -> &str;

    /// Materialize every split found under `root` (reading or decoding the cached files as
    /// needed) and return one importer per split.
    fn splits(&self, root: &Path) -> ImportResult<Vec<Box<dyn Importer>>>;
}
