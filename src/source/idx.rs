//! IDX decoder (MNIST / Fashion-MNIST).
//!
//! Layout: two zero bytes, a type code (`0x08` = unsigned byte), the number of dimensions, then
//! one big-endian `u32` per dimension followed by the row-major payload.

use std::path::Path;

use crate::error::{ImportError, ImportResult};

use super::{RawImage, RawSample, SampleSource};

const UBYTE: u8 = 0x08;

/// A parsed IDX file of unsigned bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxArray {
    pub dims: Vec<usize>,
    pub data: Vec<u8>,
}

/// Parse an in-memory IDX payload.
pub fn parse_idx(bytes: &[u8]) -> Result<IdxArray, String> {
    if bytes.len() < 4 {
        return Err(format!("file too short for an IDX header ({} bytes)", bytes.len()));
    }
    if bytes[0] != 0 || bytes[1] != 0 {
        return Err("bad IDX magic".to_string());
    }
    if bytes[2] != UBYTE {
        return Err(format!("unsupported IDX element type 0x{:02x}", bytes[2]));
    }
    let ndims = bytes[3] as usize;
    let header_len = 4 + 4 * ndims;
    if bytes.len() < header_len {
        return Err("truncated IDX dimension header".to_string());
    }

    let dims: Vec<usize> = bytes[4..header_len]
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("IDX dimensions {dims:?} overflow"))?;
    let data = &bytes[header_len..];
    if data.len() != expected {
        return Err(format!(
            "IDX payload has {} bytes, dimensions {:?} require {}",
            data.len(),
            dims,
            expected
        ));
    }

    Ok(IdxArray {
        dims,
        data: data.to_vec(),
    })
}

/// Grayscale images paired with labels, read from an IDX image file and an IDX label file.
#[derive(Debug, Clone)]
pub struct IdxSource {
    count: usize,
    rows: usize,
    cols: usize,
    pixels: Vec<u8>,
    labels: Vec<u8>,
}

impl IdxSource {
    /// Read and validate both files.
    pub fn open(
        images: impl AsRef<Path>,
        labels: impl AsRef<Path>,
        dataset: &str,
    ) -> ImportResult<Self> {
        let bad = |message: String| ImportError::UnsupportedFormat {
            dataset: dataset.to_string(),
            message,
        };

        let images = parse_idx(&std::fs::read(images)?).map_err(&bad)?;
        let labels = parse_idx(&std::fs::read(labels)?).map_err(&bad)?;
        Self::from_arrays(images, labels).map_err(bad)
    }

    /// Pair already-parsed arrays: images must be `[n, rows, cols]`, labels `[n]`.
    pub fn from_arrays(images: IdxArray, labels: IdxArray) -> Result<Self, String> {
        let &[count, rows, cols] = images.dims.as_slice() else {
            return Err(format!("expected 3-d image array, got dimensions {:?}", images.dims));
        };
        let &[n_labels] = labels.dims.as_slice() else {
            return Err(format!("expected 1-d label array, got dimensions {:?}", labels.dims));
        };
        if n_labels != count {
            return Err(format!("{count} images but {n_labels} labels"));
        }
        let pixel_count = rows
            .checked_mul(cols)
            .and_then(|size| size.checked_mul(count))
            .ok_or_else(|| format!("image dimensions {:?} overflow", images.dims))?;
        if images.data.len() != pixel_count || labels.data.len() != count {
            return Err("IDX payload does not match its dimensions".to_string());
        }

        Ok(Self {
            count,
            rows,
            cols,
            pixels: images.data,
            labels: labels.data,
        })
    }
}

impl SampleSource for IdxSource {
    fn len(&self) -> usize {
        self.count
    }

    fn sample(&self, index: usize) -> ImportResult<RawSample> {
        if index >= self.count {
            return Err(ImportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("sample {index} out of range (len={})", self.count),
            )));
        }
        let size = self.rows * self.cols;
        let start = index * size;
        let image = RawImage {
            height: self.rows,
            width: self.cols,
            channels: 1,
            pixels: self.pixels[start..start + size].to_vec(),
        };
        Ok(RawSample::new(image, i64::from(self.labels[index])))
    }
}

/// Encode a `u8` array as IDX. Used to build fixtures.
pub fn encode_idx(dims: &[usize], data: &[u8]) -> Vec<u8> {
    let mut out = vec![0, 0, UBYTE, dims.len() as u8];
    for d in dims {
        out.extend_from_slice(&(*d as u32).to_be_bytes());
    }
    out.extend_from_slice(data);
    out
}
