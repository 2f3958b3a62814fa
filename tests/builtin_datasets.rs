use std::fs;
use std::path::Path;

use stock_import::pipeline::import_dataset;
use stock_import::registry::Registry;
use stock_import::source::cifar::{RECORD_BYTES, SIDE};
use stock_import::source::idx::encode_idx;
use stock_import::store::MemoryStore;
use stock_import::types::{Shape, Tensor, TensorData};
use stock_import::ImportError;

/// Write an MNIST-layout cache with 2x2 images: `train` images are filled with `i * 50`,
/// labels `i`; `test` images with 255, labels 9.
fn write_mnist(root: &Path, subdir: &str, train: usize, test: usize) {
    let raw = root.join(subdir).join("raw");
    fs::create_dir_all(&raw).unwrap();

    let train_pixels: Vec<u8> = (0..train).flat_map(|i| [(i * 50) as u8; 4]).collect();
    let train_labels: Vec<u8> = (0..train).map(|i| i as u8).collect();
    let test_pixels = vec![255; test * 4];
    let files = [
        ("train-images-idx3-ubyte", encode_idx(&[train, 2, 2], &train_pixels)),
        ("train-labels-idx1-ubyte", encode_idx(&[train], &train_labels)),
        ("t10k-images-idx3-ubyte", encode_idx(&[test, 2, 2], &test_pixels)),
        ("t10k-labels-idx1-ubyte", encode_idx(&[test], &vec![9; test])),
    ];
    for (name, bytes) in files {
        fs::write(raw.join(name), bytes).unwrap();
    }
}

fn cifar_records(n: usize, label: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(n * RECORD_BYTES);
    for _ in 0..n {
        out.push(label);
        out.extend(std::iter::repeat_n(0u8, SIDE * SIDE));
        out.extend(std::iter::repeat_n(255u8, SIDE * SIDE));
        out.extend(std::iter::repeat_n(0u8, SIDE * SIDE));
    }
    out
}

fn write_cifar(root: &Path) {
    let dir = root.join("cifar-10-batches-bin");
    fs::create_dir_all(&dir).unwrap();
    for i in 1..=5 {
        fs::write(dir.join(format!("data_batch_{i}.bin")), cifar_records(2, i as u8)).unwrap();
    }
    fs::write(dir.join("test_batch.bin"), cifar_records(3, 0)).unwrap();
}

#[test]
fn resolve_returns_one_importer_per_split_with_known_sizes() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path(), "MNIST", 4, 2);
    write_cifar(dir.path());

    let registry = Registry::builtin();
    let mnist = registry.resolve("torchvision.mnist", dir.path()).unwrap();
    let sizes: Vec<(&str, usize)> = mnist.iter().map(|i| (i.split(), i.len())).collect();
    assert_eq!(sizes, vec![("train", 4), ("test", 2)]);

    let cifar = registry.resolve("torchvision.cifar10", dir.path()).unwrap();
    let sizes: Vec<(&str, usize)> = cifar.iter().map(|i| (i.split(), i.len())).collect();
    assert_eq!(sizes, vec![("train", 10), ("test", 3)]);

    for importer in mnist.iter().chain(cifar.iter()) {
        let n = importer.column_names().len();
        assert_eq!(importer.dtypes().len(), n);
        assert_eq!(importer.shapes().len(), n);
        assert_eq!(importer.variability_status().len(), n);
    }
}

#[test]
fn mnist_import_writes_normalized_images_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path(), "MNIST", 3, 2);
    let store = MemoryStore::new();

    let ledger = import_dataset(&store, "torchvision.mnist", dir.path()).unwrap();

    assert_eq!(ledger.total_records(), 5);
    assert_eq!(
        ledger.get("train").unwrap().columns,
        vec!["mnist-train-image".to_string(), "mnist-train-label".to_string()]
    );
    assert_eq!(store.column_spec("mnist-test-image").unwrap().shape, Shape::new([1, 2, 2]));

    let img = store.committed("mnist-train-image", 2).unwrap();
    assert_eq!(img.shape(), &Shape::new([1, 2, 2]));
    assert_eq!(img.data(), &TensorData::Float32(vec![100.0 / 255.0; 4]));
    assert_eq!(store.committed("mnist-train-label", 2), Some(Tensor::scalar_i64(2)));
    assert_eq!(store.committed("mnist-test-label", 1), Some(Tensor::scalar_i64(9)));
    assert_eq!(store.committed_len("mnist-train-image"), 3);
    assert_eq!(store.committed_len("mnist-test-image"), 2);
}

#[test]
fn cifar_import_is_channel_first() {
    let dir = tempfile::tempdir().unwrap();
    write_cifar(dir.path());
    let store = MemoryStore::new();

    import_dataset(&store, "torchvision.cifar10", dir.path()).unwrap();

    let img = store.committed("cifar10-train-image", 9).unwrap();
    assert_eq!(img.shape(), &Shape::new([3, 32, 32]));
    let TensorData::Float32(values) = img.data() else {
        panic!("expected float32 image");
    };
    let plane = SIDE * SIDE;
    assert!(values[..plane].iter().all(|v| *v == 0.0));
    assert!(values[plane..2 * plane].iter().all(|v| *v == 1.0));
    assert_eq!(store.committed("cifar10-train-label", 9), Some(Tensor::scalar_i64(5)));
}

#[test]
fn uncached_dataset_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path(), "MNIST", 1, 1);
    let store = MemoryStore::new();

    let err = import_dataset(&store, "torchvision.fashion_mnist", dir.path()).unwrap_err();
    assert!(matches!(err, ImportError::DatasetUnavailable { .. }));
    assert!(store.keys().is_empty());
}

#[test]
fn corrupt_cache_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path(), "FashionMNIST", 2, 1);
    // Label file claims three labels for two images.
    fs::write(
        dir.path().join("FashionMNIST/raw/train-labels-idx1-ubyte"),
        encode_idx(&[3], &[0, 1, 2]),
    )
    .unwrap();

    let err = Registry::builtin()
        .resolve("torchvision.fashion_mnist", dir.path())
        .unwrap_err();
    match err {
        ImportError::UnsupportedFormat { dataset, message } => {
            assert_eq!(dataset, "fashion_mnist");
            assert!(message.contains("2 images but 3 labels"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn overflowing_idx_header_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    write_mnist(dir.path(), "MNIST", 2, 1);
    let mut header = vec![0, 0, 0x08, 3];
    header.extend([0xFF; 12]);
    fs::write(dir.path().join("MNIST/raw/train-images-idx3-ubyte"), header).unwrap();

    let err = Registry::builtin()
        .resolve("torchvision.mnist", dir.path())
        .unwrap_err();
    match err {
        ImportError::UnsupportedFormat { dataset, message } => {
            assert_eq!(dataset, "mnist");
            assert!(message.contains("overflow"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
