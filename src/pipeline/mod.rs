//! The ingestion engine.
//!
//! Most callers should use [`import_dataset`] (built-in registry, default options) or build an
//! [`ImportPipeline`] when they need a custom [`crate::registry::Registry`], options, or access
//! to [`crate::observe::ImportMetrics`].
//!
//! One invocation moves through these states, failing out of any of them:
//!
//! 1. resolve the source into importers and total up their lengths
//! 2. per importer: create missing columns, then stream every record into its columns
//! 3. commit once, then release the write session

mod engine;
mod ledger;
mod options;

pub use engine::{import_dataset, ImportPipeline};
pub use ledger::{SplitEntry, SplitLedger};
pub use options::{CancellationToken, ImportOptions, ImportSettings};
