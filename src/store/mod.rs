//! Boundary to the versioned, column-oriented data store.
//!
//! The import pipeline only needs a narrow slice of a store: an exclusive write session that
//! can list and create columns, write indexed entries, and commit. [`MemoryStore`] is an
//! in-memory implementation of that slice.

mod memory;

use std::collections::BTreeSet;

use thiserror::Error;

use crate::types::{ColumnSpec, Tensor};

pub use memory::{CommitInfo, MemoryStore, MemoryWriteSession};

/// Errors defined by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another write session holds the writer lock.
    #[error("the writer lock is held by another session")]
    WriterLocked,
    /// The session was closed (or its lock was force-released).
    #[error("the write session is no longer valid")]
    SessionClosed,
    #[error("column '{0}' already exists")]
    ColumnExists(String),
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    /// A creation request carried invalid parameters.
    #[error("invalid column '{name}': {message}")]
    InvalidColumn { name: String, message: String },
    /// A written value does not fit its column.
    #[error("invalid value for column '{name}': {message}")]
    InvalidValue { name: String, message: String },
    #[error("nothing staged to commit")]
    NothingToCommit,
    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// Opaque handle to one column of an open write session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A store that hands out exclusive write sessions.
pub trait ColumnStore {
    type Session: WriteSession;

    /// Acquire the writer lock. Fails with [`StoreError::WriterLocked`] if a session is open.
    fn begin_write(&self) -> Result<Self::Session, StoreError>;
}

/// An exclusive write-mode session against a [`ColumnStore`].
pub trait WriteSession {
    /// Names of every column currently present (committed or staged).
    fn keys(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Declared spec of an existing column.
    fn column_spec(&self, name: &str) -> Result<ColumnSpec, StoreError>;

    /// Create a column. Fails if the name already exists or the parameters are invalid.
    fn create_column(&mut self, spec: &ColumnSpec) -> Result<(), StoreError>;

    /// Look up a handle for an existing column.
    fn column(&self, name: &str) -> Result<ColumnRef, StoreError>;

    /// Assign `value` to `column[index]` in the uncommitted state.
    fn write(&mut self, column: &ColumnRef, index: usize, value: Tensor) -> Result<(), StoreError>;

    /// Commit the staged state and return its content digest.
    fn commit(&mut self, message: &str) -> Result<String, StoreError>;

    /// Release the writer lock. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Owns a [`WriteSession`] and closes it when dropped, on every exit path.
pub struct SessionGuard<S: WriteSession> {
    session: S,
}

impl<S: WriteSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: WriteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
