//! Dataset sources: materialized `(image, label)` corpora read from a local cache directory.
//!
//! A [`SampleSource`] is what an importer wraps. It knows how many samples a split has and can
//! produce any of them by index, in the raw layout the dataset ships with (row-major,
//! channel-last `u8` pixels). Normalization into store columns is the importer's job.
//!
//! Decoders for two on-disk formats are provided:
//! - [`idx`]: the IDX format used by MNIST and Fashion-MNIST
//! - [`cifar`]: the CIFAR-10 binary batch format

pub mod cifar;
pub mod idx;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ImportError, ImportResult};

pub use cifar::CifarSource;
pub use idx::IdxSource;

/// A decoded image in channel-last (`H x W x C`) layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    /// `height * width * channels` pixel intensities, row-major, channel-last.
    pub pixels: Vec<u8>,
}

/// One raw sample as yielded by a dataset. Either part may be missing for malformed datasets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSample {
    pub image: Option<RawImage>,
    pub label: Option<i64>,
}

impl RawSample {
    pub fn new(image: RawImage, label: i64) -> Self {
        Self {
            image: Some(image),
            label: Some(label),
        }
    }
}

/// Random-access view of one materialized dataset split.
pub trait SampleSource: Send {
    /// Number of samples in the split.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode sample `index` (`0..len()`).
    fn sample(&self, index: usize) -> ImportResult<RawSample>;
}

/// A source backed by samples already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    samples: Vec<RawSample>,
}

impl InMemorySource {
    pub fn new(samples: Vec<RawSample>) -> Self {
        Self { samples }
    }
}

impl SampleSource for InMemorySource {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample(&self, index: usize) -> ImportResult<RawSample> {
        self.samples.get(index).cloned().ok_or_else(|| {
            ImportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("sample {index} out of range (len={})", self.samples.len()),
            ))
        })
    }
}

/// Find `file_name` anywhere below `root/subdir`.
///
/// Dataset libraries differ in how deep they nest their extracted files (`MNIST/raw/...` vs
/// `cifar-10-batches-bin/...`), so the search is a bounded walk rather than a fixed path.
pub(crate) fn locate(
    root: &Path,
    subdir: &str,
    file_name: &str,
    dataset: &str,
) -> ImportResult<PathBuf> {
    let base = root.join(subdir);
    if !base.is_dir() {
        return Err(ImportError::DatasetUnavailable {
            dataset: dataset.to_string(),
            path: base.display().to_string(),
            message: "directory not found; materialize the dataset there first".to_string(),
        });
    }

    WalkDir::new(&base)
        .max_depth(3)
        .into_iter()
        .filter_map(Result::ok)
        .find(|e| e.file_type().is_file() && e.file_name() == file_name)
        .map(|e| e.into_path())
        .ok_or_else(|| ImportError::DatasetUnavailable {
            dataset: dataset.to_string(),
            path: base.display().to_string(),
            message: format!("missing file '{file_name}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("MNIST").join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::write(raw.join("t10k-labels-idx1-ubyte"), b"").unwrap();

        let found = locate(dir.path(), "MNIST", "t10k-labels-idx1-ubyte", "mnist").unwrap();
        assert_eq!(found, raw.join("t10k-labels-idx1-ubyte"));
    }

    #[test]
    fn locate_reports_missing_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate(dir.path(), "MNIST", "x", "mnist").unwrap_err();
        assert!(matches!(err, ImportError::DatasetUnavailable { .. }));

        std::fs::create_dir_all(dir.path().join("MNIST")).unwrap();
        let err = locate(dir.path(), "MNIST", "x", "mnist").unwrap_err();
        assert!(err.to_string().contains("missing file 'x'"));
    }

    #[test]
    fn in_memory_source_out_of_range_is_an_error() {
        let src = InMemorySource::new(vec![RawSample::default()]);
        assert_eq!(src.len(), 1);
        assert!(src.sample(0).is_ok());
        assert!(src.sample(1).is_err());
    }
}
