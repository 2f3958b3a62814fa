use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ImportResult;
use crate::observe::ImportObserver;

/// Shared flag checked by the pipeline between records.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options controlling one import invocation.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ImportOptions {
    /// Commit message. If `None`, a message naming the source is used.
    pub commit_message: Option<String>,
    /// Check every pre-existing column against the importer's declared spec and fail with
    /// `SchemaConflict` on mismatch. Off by default: same-named columns are trusted.
    pub strict_schema: bool,
    /// Check every record against the schema inferred at importer construction.
    pub validate_records: bool,
    /// Optional observer for progress events.
    pub observer: Option<Arc<dyn ImportObserver>>,
    /// Optional token that stops the run between records, before any commit.
    pub cancellation: Option<CancellationToken>,
}

impl ImportOptions {
    pub(crate) fn commit_message_for(&self, source: &str) -> String {
        self.commit_message
            .clone()
            .unwrap_or_else(|| format!("Data from {source} added through stock import"))
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("commit_message", &self.commit_message)
            .field("strict_schema", &self.strict_schema)
            .field("validate_records", &self.validate_records)
            .field("observer_set", &self.observer.is_some())
            .field("cancellation_set", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            commit_message: None,
            strict_schema: false,
            validate_records: true,
            observer: None,
            cancellation: None,
        }
    }
}

/// Serializable subset of [`ImportOptions`], e.g. loaded from a project settings file.
///
/// ```
/// use stock_import::pipeline::ImportSettings;
///
/// let s = ImportSettings::from_json_str(r#"{ "strict_schema": true }"#).unwrap();
/// assert!(s.strict_schema);
/// assert!(s.validate_records);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportSettings {
    pub commit_message: Option<String>,
    pub strict_schema: bool,
    pub validate_records: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        let o = ImportOptions::default();
        Self {
            commit_message: o.commit_message,
            strict_schema: o.strict_schema,
            validate_records: o.validate_records,
        }
    }
}

impl ImportSettings {
    pub fn from_json_str(s: &str) -> ImportResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ImportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Overlay these settings on `options`, keeping its observer and cancellation token.
    pub fn apply(&self, options: ImportOptions) -> ImportOptions {
        ImportOptions {
            commit_message: self.commit_message.clone(),
            strict_schema: self.strict_schema,
            validate_records: self.validate_records,
            ..options
        }
    }
}

impl From<ImportSettings> for ImportOptions {
    fn from(s: ImportSettings) -> Self {
        s.apply(ImportOptions::default())
    }
}
