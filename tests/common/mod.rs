#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use stock_import::importer::{Importer, ImporterFamily, RecordIter};
use stock_import::observe::{ImportEvent, ImportObserver};
use stock_import::pipeline::CancellationToken;
use stock_import::store::{
    ColumnRef, ColumnStore, MemoryStore, MemoryWriteSession, StoreError, WriteSession,
};
use stock_import::types::{ColumnSpec, ElementType, Record, Shape, Tensor, TensorData};
use stock_import::{ImportError, ImportResult};

pub const FAKE_COLUMNS: [&str; 3] = ["fake-id", "fake-pair", "fake-bytes"];

/// Three-field importer: an int64 scalar, a fixed float32 pair and a variable-length byte run.
pub struct FakeImporter {
    split: String,
    len: usize,
    bad_record_at: Option<usize>,
    misaligned: bool,
}

impl FakeImporter {
    pub fn new(split: &str, len: usize) -> Self {
        Self {
            split: split.to_string(),
            len,
            bad_record_at: None,
            misaligned: false,
        }
    }

    /// Yield a `fake-pair` of shape `[3]` at `index`.
    pub fn with_bad_record_at(mut self, index: usize) -> Self {
        self.bad_record_at = Some(index);
        self
    }

    /// Declare one dtype fewer than there are columns.
    pub fn misaligned(mut self) -> Self {
        self.misaligned = true;
        self
    }
}

pub fn fake_record(i: usize) -> Record {
    let bytes = (i % 4) + 1;
    vec![
        Tensor::scalar_i64(i as i64),
        Tensor::new(Shape::new([2]), TensorData::Float32(vec![i as f32, -(i as f32)])).unwrap(),
        Tensor::new(Shape::new([bytes]), TensorData::UInt8(vec![i as u8; bytes])).unwrap(),
    ]
}

impl Importer for FakeImporter {
    fn name(&self) -> &str {
        "fake"
    }

    fn split(&self) -> &str {
        &self.split
    }

    fn column_names(&self) -> Vec<String> {
        FAKE_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    fn dtypes(&self) -> Vec<ElementType> {
        let mut dtypes = vec![ElementType::Int64, ElementType::Float32, ElementType::UInt8];
        if self.misaligned {
            dtypes.pop();
        }
        dtypes
    }

    fn shapes(&self) -> Vec<Shape> {
        vec![Shape::scalar(), Shape::new([2]), Shape::new([4])]
    }

    fn variability_status(&self) -> Vec<bool> {
        vec![false, false, true]
    }

    fn len(&self) -> usize {
        self.len
    }

    fn into_records(self: Box<Self>) -> RecordIter {
        let bad = self.bad_record_at;
        Box::new((0..self.len).map(move |i| {
            let mut record = fake_record(i);
            if bad == Some(i) {
                let pair = TensorData::Float32(vec![0.0; 3]);
                record[1] = Tensor::new(Shape::new([3]), pair).unwrap();
            }
            Ok::<_, ImportError>(record)
        }))
    }
}

/// Family producing `train` and `test` [`FakeImporter`]s of the given lengths.
pub struct FakeFamily {
    pub name: &'static str,
    pub train: usize,
    pub test: usize,
}

impl ImporterFamily for FakeFamily {
    fn name(&self) -> &str {
        self.name
    }

    fn splits(&self, _root: &Path) -> ImportResult<Vec<Box<dyn Importer>>> {
        Ok(vec![
            Box::new(FakeImporter::new("train", self.train)),
            Box::new(FakeImporter::new("test", self.test)),
        ])
    }
}

/// Family whose splits are built by an arbitrary function.
pub struct BuiltFamily {
    pub name: &'static str,
    pub build: fn() -> Vec<FakeImporter>,
}

impl ImporterFamily for BuiltFamily {
    fn name(&self) -> &str {
        self.name
    }

    fn splits(&self, _root: &Path) -> ImportResult<Vec<Box<dyn Importer>>> {
        Ok((self.build)()
            .into_iter()
            .map(|i| Box::new(i) as Box<dyn Importer>)
            .collect())
    }
}

/// What a [`FaultyStore`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(String),
    Write { column: String, index: usize },
    Commit(String),
}

#[derive(Debug, Default)]
pub struct Faults {
    /// Fail the n-th (1-based) `create_column` call.
    pub fail_create_call: Option<usize>,
    pub fail_commit: bool,
    /// Fail the write of `(column, index)`.
    pub fail_write: Option<(&'static str, usize)>,
    pub fail_lookup: bool,
}

/// A [`MemoryStore`] that records every call and injects failures on demand.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    faults: Arc<Faults>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore, faults: Faults) -> Self {
        Self {
            inner,
            faults: Arc::new(faults),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// `(column, index)` of every write, in order.
    pub fn writes(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Write { column, index } => Some((column, index)),
                _ => None,
            })
            .collect()
    }
}

pub struct FaultySession {
    inner: MemoryWriteSession,
    faults: Arc<Faults>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    create_calls: usize,
}

impl ColumnStore for FaultyStore {
    type Session = FaultySession;

    fn begin_write(&self) -> Result<FaultySession, StoreError> {
        Ok(FaultySession {
            inner: self.inner.begin_write()?,
            faults: Arc::clone(&self.faults),
            calls: Arc::clone(&self.calls),
            create_calls: 0,
        })
    }
}

impl WriteSession for FaultySession {
    fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        self.inner.keys()
    }

    fn column_spec(&self, name: &str) -> Result<ColumnSpec, StoreError> {
        self.inner.column_spec(name)
    }

    fn create_column(&mut self, spec: &ColumnSpec) -> Result<(), StoreError> {
        self.create_calls += 1;
        self.calls.lock().unwrap().push(StoreCall::Create(spec.name.clone()));
        if self.faults.fail_create_call == Some(self.create_calls) {
            return Err(StoreError::Backend("injected create failure".to_string()));
        }
        self.inner.create_column(spec)
    }

    fn column(&self, name: &str) -> Result<ColumnRef, StoreError> {
        if self.faults.fail_lookup {
            return Err(StoreError::Backend("injected lookup failure".to_string()));
        }
        self.inner.column(name)
    }

    fn write(&mut self, column: &ColumnRef, index: usize, value: Tensor) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Write {
            column: column.name().to_string(),
            index,
        });
        if self.faults.fail_write == Some((column.name(), index)) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        self.inner.write(column, index, value)
    }

    fn commit(&mut self, message: &str) -> Result<String, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Commit(message.to_string()));
        if self.faults.fail_commit {
            return Err(StoreError::Backend("injected commit failure".to_string()));
        }
        self.inner.commit(message)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Observer that keeps every event.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<ImportEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn advances(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ImportEvent::Advanced { completed, .. } => Some(completed),
                _ => None,
            })
            .collect()
    }
}

impl ImportObserver for RecordingObserver {
    fn on_event(&self, event: &ImportEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Cancels `token` once `after` records have been written.
pub struct CancelAfter {
    pub token: CancellationToken,
    pub after: u64,
}

impl ImportObserver for CancelAfter {
    fn on_event(&self, event: &ImportEvent) {
        if matches!(event, ImportEvent::Advanced { completed, .. } if *completed == self.after) {
            self.token.cancel();
        }
    }
}
