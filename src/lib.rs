//! `stock-import` brings external datasets (image/label corpora and the like) into a
//! column-oriented, versioned data store.
//!
//! Each dataset split is adapted by an [`importer::Importer`] into a fixed column schema. The
//! pipeline creates whatever columns the store is missing, streams records into them one by
//! one, and captures the result in a single commit.
//!
//! ## Components
//!
//! - [`importer`]: the importer capability trait, split factories and built-in image families
//! - [`registry`]: `family.dataset` identifiers to importer families
//! - [`reconcile`]: which columns to create
//! - [`pipeline`]: the ingestion engine, options and the per-split ledger
//! - [`store`]: the store boundary and an in-memory store
//! - [`source`]: decoders for materialized datasets (MNIST IDX, CIFAR-10 binary)
//! - [`observe`]: progress events and metrics
//! - [`types`]: element types, shapes, tensors
//! - [`error`]: error types
//!
//! ## Example
//!
//! ```no_run
//! use stock_import::pipeline::import_dataset;
//! use stock_import::store::MemoryStore;
//!
//! # fn main() -> Result<(), stock_import::ImportError> {
//! let store = MemoryStore::new();
//! // Expects `/home/me/data/MNIST/raw/*-ubyte` to be present.
//! let ledger = import_dataset(&store, "torchvision.mnist", "/home/me/data")?;
//! println!("{ledger}");
//! # Ok(())
//! # }
//! ```
//!
//! Custom datasets are added by implementing [`importer::ImporterFamily`] and registering it:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stock_import::importer::Cifar10;
//! use stock_import::pipeline::{ImportOptions, ImportPipeline};
//! use stock_import::registry::Registry;
//! use stock_import::store::MemoryStore;
//!
//! # fn main() -> Result<(), stock_import::ImportError> {
//! let registry = Registry::new().with("vision", Arc::new(Cifar10))?;
//! let store = MemoryStore::new();
//! let pipeline = ImportPipeline::new(&registry, &store).with_options(ImportOptions {
//!     commit_message: Some("add cifar10".to_string()),
//!     ..Default::default()
//! });
//! let ledger = pipeline.import_dataset("vision.cifar10", "/data")?;
//! assert_eq!(ledger.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod importer;
pub mod observe;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod source;
pub mod store;
pub mod types;

pub use error::{ImportError, ImportResult};
