use std::fmt;

use polars::prelude::*;
use serde::Serialize;

use crate::error::ImportResult;

/// Columns and record count added for one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitEntry {
    pub split: String,
    pub columns: Vec<String>,
    pub records: u64,
}

/// What one import invocation added, per split, in the order splits were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitLedger {
    source: String,
    entries: Vec<SplitEntry>,
    digest: Option<String>,
}

impl SplitLedger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Record a split. A split recorded twice keeps its first position and the latest values.
    pub fn record(&mut self, split: &str, columns: Vec<String>, records: u64) {
        let entry = SplitEntry {
            split: split.to_string(),
            columns,
            records,
        };
        match self.entries.iter_mut().find(|e| e.split == split) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub(crate) fn set_digest(&mut self, digest: String) {
        self.digest = Some(digest);
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn get(&self, split: &str) -> Option<&SplitEntry> {
        self.entries.iter().find(|e| e.split == split)
    }

    pub fn entries(&self) -> &[SplitEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_records(&self) -> u64 {
        self.entries.iter().map(|e| e.records).sum()
    }

    /// Digest of the commit that captured this import, once committed.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Summary table with one row per split: `split`, `columns`, `records`.
    pub fn to_dataframe(&self) -> ImportResult<DataFrame> {
        let splits: Vec<String> = self.entries.iter().map(|e| e.split.clone()).collect();
        let columns: Vec<String> = self.entries.iter().map(|e| e.columns.join(", ")).collect();
        let records: Vec<u64> = self.entries.iter().map(|e| e.records).collect();
        Ok(df!(
            "split" => splits,
            "columns" => columns,
            "records" => records
        )?)
    }

    pub fn to_json(&self) -> ImportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for SplitLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "The {} dataset has been added.", self.source)?;
        let table = self.to_dataframe().map_err(|_| fmt::Error)?;
        write!(f, "{table}")
    }
}
