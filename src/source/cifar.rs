//! CIFAR-10 binary batch decoder.
//!
//! Each record is one label byte followed by a 32x32 image stored plane by plane
//! (1024 red, 1024 green, 1024 blue bytes).

use std::path::Path;

use crate::error::{ImportError, ImportResult};

use super::{RawImage, RawSample, SampleSource};

pub const SIDE: usize = 32;
pub const CHANNELS: usize = 3;
const IMAGE_BYTES: usize = SIDE * SIDE * CHANNELS;
pub const RECORD_BYTES: usize = 1 + IMAGE_BYTES;

/// Concatenation of one or more CIFAR-10 batch files.
#[derive(Debug, Clone, Default)]
pub struct CifarSource {
    records: Vec<u8>,
}

impl CifarSource {
    /// Read batch files in order.
    pub fn open<P: AsRef<Path>>(batches: &[P], dataset: &str) -> ImportResult<Self> {
        let mut records = Vec::new();
        for path in batches {
            let bytes = std::fs::read(path.as_ref())?;
            if bytes.len() % RECORD_BYTES != 0 {
                return Err(ImportError::UnsupportedFormat {
                    dataset: dataset.to_string(),
                    message: format!(
                        "{} is {} bytes, not a multiple of the {RECORD_BYTES}-byte record size",
                        path.as_ref().display(),
                        bytes.len()
                    ),
                });
            }
            records.extend_from_slice(&bytes);
        }
        Ok(Self { records })
    }

    pub fn from_bytes(records: Vec<u8>) -> Result<Self, String> {
        if records.len() % RECORD_BYTES != 0 {
            return Err(format!("{} bytes is not a whole number of records", records.len()));
        }
        Ok(Self { records })
    }
}

impl SampleSource for CifarSource {
    fn len(&self) -> usize {
        self.records.len() / RECORD_BYTES
    }

    fn sample(&self, index: usize) -> ImportResult<RawSample> {
        let start = index * RECORD_BYTES;
        let Some(record) = self.records.get(start..start + RECORD_BYTES) else {
            return Err(ImportError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("sample {index} out of range (len={})", self.len()),
            )));
        };

        let planes = &record[1..];
        let plane = SIDE * SIDE;
        let mut pixels = Vec::with_capacity(IMAGE_BYTES);
        for p in 0..plane {
            for c in 0..CHANNELS {
                pixels.push(planes[c * plane + p]);
            }
        }

        let image = RawImage {
            height: SIDE,
            width: SIDE,
            channels: CHANNELS,
            pixels,
        };
        Ok(RawSample::new(image, i64::from(record[0])))
    }
}
