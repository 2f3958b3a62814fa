use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::types::{ColumnSpec, Tensor};

use super::{ColumnRef, ColumnStore, StoreError, WriteSession};

/// A committed snapshot in a [`MemoryStore`]'s history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Hex-encoded SHA-256 content digest.
    pub digest: String,
    pub message: String,
    /// Digest of the previous commit, if any.
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
struct ColumnState {
    spec: ColumnSpec,
    entries: BTreeMap<usize, Tensor>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Working state: what a write session sees and mutates.
    staged: BTreeMap<String, ColumnState>,
    /// State as of the last commit.
    committed: BTreeMap<String, ColumnState>,
    dirty: bool,
    writer: Option<u64>,
    next_session_id: u64,
    commits: Vec<CommitInfo>,
}

/// In-memory versioned column store.
///
/// Writes land in a staged working state which [`WriteSession::commit`] snapshots into
/// history. Only one write session may be open at a time. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access for inspection; a poisoned state is still readable.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Column names in the working state.
    pub fn keys(&self) -> BTreeSet<String> {
        self.lock().staged.keys().cloned().collect()
    }

    pub fn column_spec(&self, name: &str) -> Option<ColumnSpec> {
        self.lock().staged.get(name).map(|c| c.spec.clone())
    }

    /// Read an entry from the uncommitted working state.
    pub fn staged(&self, name: &str, index: usize) -> Option<Tensor> {
        self.lock().staged.get(name)?.entries.get(&index).cloned()
    }

    /// Number of entries a column holds in the working state.
    pub fn staged_len(&self, name: &str) -> usize {
        self.lock().staged.get(name).map_or(0, |c| c.entries.len())
    }

    /// Read an entry as of the last commit.
    pub fn committed(&self, name: &str, index: usize) -> Option<Tensor> {
        self.lock().committed.get(name)?.entries.get(&index).cloned()
    }

    pub fn committed_len(&self, name: &str) -> usize {
        self.lock().committed.get(name).map_or(0, |c| c.entries.len())
    }

    /// Commit history, oldest first.
    pub fn commits(&self) -> Vec<CommitInfo> {
        self.lock().commits.clone()
    }

    /// Digest of the latest commit.
    pub fn head(&self) -> Option<String> {
        self.lock().commits.last().map(|c| c.digest.clone())
    }

    /// Whether there are staged changes not yet committed.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.lock().dirty
    }

    pub fn is_write_locked(&self) -> bool {
        self.lock().writer.is_some()
    }

    /// Release the writer lock regardless of who holds it.
    ///
    /// The session that held it becomes invalid and fails every further call with
    /// [`StoreError::SessionClosed`]. Returns whether a lock was held.
    pub fn force_release_writer_lock(&self) -> bool {
        self.lock().writer.take().is_some()
    }
}

impl ColumnStore for MemoryStore {
    type Session = MemoryWriteSession;

    fn begin_write(&self) -> Result<MemoryWriteSession, StoreError> {
        let mut state = lock_for_write(&self.state)?;
        if state.writer.is_some() {
            return Err(StoreError::WriterLocked);
        }
        state.next_session_id += 1;
        let id = state.next_session_id;
        state.writer = Some(id);
        Ok(MemoryWriteSession {
            state: Arc::clone(&self.state),
            id,
            open: true,
        })
    }
}

/// Write session over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryWriteSession {
    state: Arc<Mutex<StoreState>>,
    id: u64,
    open: bool,
}

impl MemoryWriteSession {
    fn lock_valid(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        let state = lock_for_write(&self.state)?;
        if !self.open || state.writer != Some(self.id) {
            return Err(StoreError::SessionClosed);
        }
        Ok(state)
    }
}

impl WriteSession for MemoryWriteSession {
    fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.lock_valid()?.staged.keys().cloned().collect())
    }

    fn column_spec(&self, name: &str) -> Result<ColumnSpec, StoreError> {
        self.lock_valid()?
            .staged
            .get(name)
            .map(|c| c.spec.clone())
            .ok_or_else(|| StoreError::UnknownColumn(name.to_string()))
    }

    fn create_column(&mut self, spec: &ColumnSpec) -> Result<(), StoreError> {
        let mut state = self.lock_valid()?;
        if spec.name.trim().is_empty() {
            return Err(StoreError::InvalidColumn {
                name: spec.name.clone(),
                message: "column name must not be empty".to_string(),
            });
        }
        if !spec.variable_shape && spec.shape.dims().contains(&0) {
            return Err(StoreError::InvalidColumn {
                name: spec.name.clone(),
                message: format!("fixed shape {} has a zero-sized dimension", spec.shape),
            });
        }
        if state.staged.contains_key(&spec.name) {
            return Err(StoreError::ColumnExists(spec.name.clone()));
        }
        state.staged.insert(
            spec.name.clone(),
            ColumnState {
                spec: spec.clone(),
                entries: BTreeMap::new(),
            },
        );
        state.dirty = true;
        Ok(())
    }

    fn column(&self, name: &str) -> Result<ColumnRef, StoreError> {
        if self.lock_valid()?.staged.contains_key(name) {
            Ok(ColumnRef::new(name))
        } else {
            Err(StoreError::UnknownColumn(name.to_string()))
        }
    }

    fn write(&mut self, column: &ColumnRef, index: usize, value: Tensor) -> Result<(), StoreError> {
        let mut state = self.lock_valid()?;
        let col = state
            .staged
            .get_mut(column.name())
            .ok_or_else(|| StoreError::UnknownColumn(column.name().to_string()))?;
        if let Some(message) = col.spec.mismatch(&value) {
            return Err(StoreError::InvalidValue {
                name: column.name().to_string(),
                message,
            });
        }
        col.entries.insert(index, value);
        state.dirty = true;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<String, StoreError> {
        let mut state = self.lock_valid()?;
        if !state.dirty {
            return Err(StoreError::NothingToCommit);
        }
        let parent = state.commits.last().map(|c| c.digest.clone());
        let digest = content_digest(parent.as_deref(), &state.staged);
        state.committed = state.staged.clone();
        state.dirty = false;
        state.commits.push(CommitInfo {
            digest: digest.clone(),
            message: message.to_string(),
            parent,
        });
        Ok(digest)
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.writer == Some(self.id) {
            state.writer = None;
        }
    }
}

impl Drop for MemoryWriteSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// A writer panicked mid-mutation: refuse further writes rather than build on that state.
fn lock_for_write(state: &Mutex<StoreState>) -> Result<MutexGuard<'_, StoreState>, StoreError> {
    state
        .lock()
        .map_err(|_| StoreError::Backend("store state poisoned by a panicked writer".to_string()))
}

fn content_digest(parent: Option<&str>, columns: &BTreeMap<String, ColumnState>) -> String {
    let mut hasher = Sha256::new();
    if let Some(p) = parent {
        hasher.update(p.as_bytes());
    }
    for (name, col) in columns {
        hasher.update(name.as_bytes());
        hasher.update(col.spec.dtype.to_string().as_bytes());
        hasher.update(col.spec.shape.to_string().as_bytes());
        hasher.update([u8::from(col.spec.variable_shape)]);
        for (idx, value) in &col.entries {
            hasher.update((*idx as u64).to_le_bytes());
            hasher.update(value.shape().to_string().as_bytes());
            hasher.update(value.data().to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}
