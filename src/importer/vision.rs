//! Labeled image classification datasets.
//!
//! Every record is `(image, label)`. Images are normalized to channel-first `float32` arrays
//! with intensities in `[0, 1]` (grayscale images get a single channel), labels become `int64`
//! scalars. Columns are named `{name}-{split}-image` and `{name}-{split}-label`.

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::source::{self, CifarSource, IdxSource, RawSample, SampleSource};
use crate::types::{ElementType, Record, Shape, Tensor, TensorData};

use super::{Importer, ImporterFamily, RecordIter};

/// Importer over any [`SampleSource`] of labeled images.
///
/// The declared schema is inferred from the first sample at construction time.
pub struct LabeledImageImporter {
    name: String,
    split: String,
    source: Box<dyn SampleSource>,
    image_shape: Shape,
}

impl LabeledImageImporter {
    /// Build an importer for one split.
    ///
    /// Fails with [`ImportError::UnsupportedFormat`] if the source is empty or its first sample
    /// is not an `(image, label)` pair.
    pub fn new(
        name: impl Into<String>,
        split: impl Into<String>,
        source: Box<dyn SampleSource>,
    ) -> ImportResult<Self> {
        let name = name.into();
        if source.is_empty() {
            return Err(ImportError::UnsupportedFormat {
                dataset: name,
                message: "dataset has no samples to infer a schema from".to_string(),
            });
        }
        let sample = normalize(&name, source.sample(0)?)?;
        let image_shape = sample[0].shape().clone();

        Ok(Self {
            name,
            split: split.into(),
            source,
            image_shape,
        })
    }
}

impl Importer for LabeledImageImporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn split(&self) -> &str {
        &self.split
    }

    fn column_names(&self) -> Vec<String> {
        vec![
            format!("{}-{}-image", self.name, self.split),
            format!("{}-{}-label", self.name, self.split),
        ]
    }

    fn dtypes(&self) -> Vec<ElementType> {
        vec![ElementType::Float32, ElementType::Int64]
    }

    fn shapes(&self) -> Vec<Shape> {
        vec![self.image_shape.clone(), Shape::scalar()]
    }

    fn variability_status(&self) -> Vec<bool> {
        vec![false, false]
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    fn into_records(self: Box<Self>) -> RecordIter {
        let Self { name, source, .. } = *self;
        let len = source.len();
        Box::new((0..len).map(move |i| source.sample(i).and_then(|s| normalize(&name, s))))
    }
}

/// Channel-last `u8` image plus label into `[C, H, W]` float32 in `[0, 1]` plus int64 scalar.
fn normalize(dataset: &str, sample: RawSample) -> ImportResult<Record> {
    let unsupported = |message: String| ImportError::UnsupportedFormat {
        dataset: dataset.to_string(),
        message,
    };

    let image = sample
        .image
        .ok_or_else(|| unsupported("sample has no image".to_string()))?;
    let label = sample
        .label
        .ok_or_else(|| unsupported("sample has no label".to_string()))?;

    let (h, w, c) = (image.height, image.width, image.channels);
    if h == 0 || w == 0 || c == 0 {
        return Err(unsupported(format!("degenerate image shape {h}x{w}x{c}")));
    }
    if image.pixels.len() != h * w * c {
        return Err(unsupported(format!(
            "image has {} pixels, {h}x{w}x{c} requires {}",
            image.pixels.len(),
            h * w * c
        )));
    }

    let mut chw = vec![0f32; h * w * c];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let v = image.pixels[(y * w + x) * c + ch];
                chw[(ch * h + y) * w + x] = f32::from(v) / 255.0;
            }
        }
    }

    let image = Tensor::new(Shape::new([c, h, w]), TensorData::Float32(chw))
        .ok_or_else(|| unsupported("image element count mismatch".to_string()))?;
    Ok(vec![image, Tensor::scalar_i64(label)])
}

/// A family stored as IDX image/label file pairs (MNIST layout).
#[derive(Debug, Clone)]
pub struct IdxFamily {
    name: &'static str,
    subdir: &'static str,
}

impl IdxFamily {
    pub fn mnist() -> Self {
        Self {
            name: "mnist",
            subdir: "MNIST",
        }
    }

    pub fn fashion_mnist() -> Self {
        Self {
            name: "fashion_mnist",
            subdir: "FashionMNIST",
        }
    }
}

impl ImporterFamily for IdxFamily {
    fn name(&self) -> &str {
        self.name
    }

    fn splits(&self, root: &Path) -> ImportResult<Vec<Box<dyn Importer>>> {
        let mut out: Vec<Box<dyn Importer>> = Vec::with_capacity(2);
        for (split, prefix) in [("train", "train"), ("test", "t10k")] {
            let images_file = format!("{prefix}-images-idx3-ubyte");
            let labels_file = format!("{prefix}-labels-idx1-ubyte");
            let images = source::locate(root, self.subdir, &images_file, self.name)?;
            let labels = source::locate(root, self.subdir, &labels_file, self.name)?;
            let src = IdxSource::open(images, labels, self.name)?;
            out.push(Box::new(LabeledImageImporter::new(self.name, split, Box::new(src))?));
        }
        Ok(out)
    }
}

/// CIFAR-10, binary version (`cifar-10-batches-bin`).
#[derive(Debug, Clone, Default)]
pub struct Cifar10;

const CIFAR10_DIR: &str = "cifar-10-batches-bin";

impl ImporterFamily for Cifar10 {
    fn name(&self) -> &str {
        "cifar10"
    }

    fn splits(&self, root: &Path) -> ImportResult<Vec<Box<dyn Importer>>> {
        let train_files = (1..=5)
            .map(|i| source::locate(root, CIFAR10_DIR, &format!("data_batch_{i}.bin"), "cifar10"))
            .collect::<ImportResult<Vec<_>>>()?;
        let test_files = [source::locate(root, CIFAR10_DIR, "test_batch.bin", "cifar10")?];

        let train = CifarSource::open(&train_files, "cifar10")?;
        let test = CifarSource::open(&test_files, "cifar10")?;
        Ok(vec![
            Box::new(LabeledImageImporter::new("cifar10", "train", Box::new(train))?),
            Box::new(LabeledImageImporter::new("cifar10", "test", Box::new(test))?),
        ])
    }
}
