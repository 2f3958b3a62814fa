use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ImportError, ImportResult};
use crate::importer::Importer;
use crate::observe::{ImportEvent, ImportMetrics};
use crate::reconcile;
use crate::registry::Registry;
use crate::store::{ColumnRef, ColumnStore, SessionGuard, WriteSession};
use crate::types::ColumnSpec;

use super::ledger::SplitLedger;
use super::options::ImportOptions;

/// Drives one or more imports against a store.
///
/// Each call to [`ImportPipeline::import_dataset`] runs
/// `resolve -> (schema sync -> streaming) per split -> commit` on the calling thread, holding
/// the store's write session from the first column check until the commit, and releasing it on
/// every exit path.
pub struct ImportPipeline<'a, S: ColumnStore> {
    registry: &'a Registry,
    store: &'a S,
    options: ImportOptions,
    metrics: Arc<ImportMetrics>,
}

impl<'a, S: ColumnStore> ImportPipeline<'a, S> {
    pub fn new(registry: &'a Registry, store: &'a S) -> Self {
        Self {
            registry,
            store,
            options: ImportOptions::default(),
            metrics: Arc::new(ImportMetrics::new()),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Handle to the counters of the current (or last) run.
    pub fn metrics(&self) -> Arc<ImportMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Import every split of `source` (`family.dataset`) found under `download_dir` and commit.
    ///
    /// On failure nothing is rolled back: columns created and records written before the error
    /// stay in the store's uncommitted state.
    pub fn import_dataset(
        &self,
        source: &str,
        download_dir: impl AsRef<Path>,
    ) -> ImportResult<SplitLedger> {
        self.metrics.begin_run();
        let result = self.run(source, download_dir.as_ref());
        self.metrics.end_run();

        if let Err(e) = &result {
            warn!(source, error = %e, "import failed");
            self.emit(ImportEvent::Failed { error: e.to_string() });
        }
        result
    }

    fn run(&self, source: &str, download_dir: &Path) -> ImportResult<SplitLedger> {
        let importers = self.registry.resolve(source, download_dir)?;
        let total: u64 = importers.iter().map(|i| i.len() as u64).sum();
        self.metrics.set_total(total);
        info!(source, splits = importers.len(), total_records = total, "resolved dataset");
        self.emit(ImportEvent::Resolved {
            source: source.to_string(),
            splits: importers.len(),
            total_records: total,
        });

        let session = self
            .store
            .begin_write()
            .map_err(ImportError::SessionUnavailable)?;
        let mut guard = SessionGuard::new(session);
        let session = guard.session_mut();

        let mut ledger = SplitLedger::new(source);
        let mut completed = 0u64;
        for importer in importers {
            let schema = declared_schema(importer.as_ref())?;
            self.sync_schema(session, &schema)?;
            completed = self.stream(session, importer, &schema, &mut ledger, completed, total)?;
        }

        let message = self.options.commit_message_for(source);
        let digest = session.commit(&message).map_err(ImportError::CommitFailed)?;
        info!(source, digest = %digest, records = completed, "committed import");
        self.emit(ImportEvent::Committed {
            digest: digest.clone(),
            message,
        });
        ledger.set_digest(digest);
        Ok(ledger)
    }

    /// Create the importer's missing columns, in declaration order.
    fn sync_schema(&self, session: &mut S::Session, schema: &[ColumnSpec]) -> ImportResult<()> {
        let existing = session.keys().map_err(ImportError::SessionUnavailable)?;

        if self.options.strict_schema {
            for spec in schema.iter().filter(|s| existing.contains(&s.name)) {
                let current = session
                    .column_spec(&spec.name)
                    .map_err(ImportError::SessionUnavailable)?;
                reconcile::check_compatible(&current, spec)?;
            }
        }

        for request in reconcile::plan(&existing, schema) {
            session
                .create_column(&request)
                .map_err(|source| ImportError::ColumnCreationFailed {
                    name: request.name.clone(),
                    source,
                })?;
            debug!(
                column = %request.name,
                dtype = %request.dtype,
                shape = %request.shape,
                "created column"
            );
            self.metrics.on_column_created();
            self.emit(ImportEvent::ColumnCreated { name: request.name });
        }
        Ok(())
    }

    /// Write every record of one split at indices `0..len`. Returns the updated running count.
    fn stream(
        &self,
        session: &mut S::Session,
        importer: Box<dyn Importer>,
        schema: &[ColumnSpec],
        ledger: &mut SplitLedger,
        mut completed: u64,
        total: u64,
    ) -> ImportResult<u64> {
        let columns = schema
            .iter()
            .map(|spec| session.column(&spec.name))
            .collect::<Result<Vec<ColumnRef>, _>>()
            .map_err(ImportError::SessionUnavailable)?;

        let split = importer.split().to_string();
        let names: Vec<String> = schema.iter().map(|s| s.name.clone()).collect();
        let records = importer.len() as u64;
        ledger.record(&split, names.clone(), records);
        self.metrics.on_split_started();
        debug!(split = %split, records, "streaming split");
        self.emit(ImportEvent::SplitStarted {
            split,
            columns: names,
            records,
        });

        for (index, record) in importer.into_records().enumerate() {
            if self.options.cancellation.as_ref().is_some_and(|c| c.is_cancelled()) {
                return Err(ImportError::Cancelled {
                    records_written: completed,
                });
            }

            let record = record?;
            if record.len() != columns.len() {
                return Err(ImportError::SchemaConflict {
                    column: schema.first().map(|s| s.name.clone()).unwrap_or_default(),
                    message: format!(
                        "record {index} has {} fields, importer declares {}",
                        record.len(),
                        columns.len()
                    ),
                });
            }
            if self.options.validate_records {
                for (spec, value) in schema.iter().zip(&record) {
                    if let Some(message) = spec.mismatch(value) {
                        return Err(ImportError::SchemaConflict {
                            column: spec.name.clone(),
                            message: format!("record {index}: {message}"),
                        });
                    }
                }
            }

            for (column, value) in columns.iter().zip(record) {
                session
                    .write(column, index, value)
                    .map_err(|source| ImportError::WriteFailed {
                        column: column.name().to_string(),
                        index,
                        source,
                    })?;
            }

            completed += 1;
            self.metrics.advance();
            self.emit(ImportEvent::Advanced { completed, total });
        }
        Ok(completed)
    }

    fn emit(&self, event: ImportEvent) {
        if let Some(obs) = &self.options.observer {
            obs.on_event(&event);
        }
    }
}

/// The importer's columns, after checking that its four schema sequences line up.
fn declared_schema(importer: &dyn Importer) -> ImportResult<Vec<ColumnSpec>> {
    let names = importer.column_names();
    let lens = [
        importer.dtypes().len(),
        importer.shapes().len(),
        importer.variability_status().len(),
    ];
    if lens.iter().any(|&n| n != names.len()) {
        return Err(ImportError::UnsupportedFormat {
            dataset: importer.name().to_string(),
            message: format!(
                "schema sequences are misaligned: {} names, {} dtypes, {} shapes, \
                 {} variability flags",
                names.len(),
                lens[0],
                lens[1],
                lens[2]
            ),
        });
    }
    Ok(importer.schema())
}

/// Import `source` into `store` with the built-in registry and default options.
pub fn import_dataset<S: ColumnStore>(
    store: &S,
    source: &str,
    download_dir: impl AsRef<Path>,
) -> ImportResult<SplitLedger> {
    let registry = Registry::builtin();
    ImportPipeline::new(&registry, store).import_dataset(source, download_dir)
}
