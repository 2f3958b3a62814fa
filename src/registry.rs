//! Importer registry: maps `family.dataset` source identifiers to importer families.
//!
//! A registry is built explicitly, either empty via [`Registry::new`] (tests register fake
//! families) or pre-populated via [`Registry::builtin`]. It holds no family-specific logic:
//! adding a dataset means registering one more [`ImporterFamily`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::importer::{Cifar10, IdxFamily, Importer, ImporterFamily};

/// Family key the built-in image datasets are registered under. Their cache layout follows
/// that library's on-disk layout.
pub const TORCHVISION: &str = "torchvision";

#[derive(Default, Clone)]
pub struct Registry {
    families: BTreeMap<String, BTreeMap<String, Arc<dyn ImporterFamily>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.sources())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in family: `torchvision.{mnist, fashion_mnist, cifar10}`.
    pub fn builtin() -> Self {
        let mut r = Self::new();
        let families: [Arc<dyn ImporterFamily>; 3] = [
            Arc::new(IdxFamily::mnist()),
            Arc::new(IdxFamily::fashion_mnist()),
            Arc::new(Cifar10),
        ];
        for family in families {
            r.families
                .entry(TORCHVISION.to_string())
                .or_default()
                .insert(family.name().to_string(), family);
        }
        r
    }

    /// Register `family` under `family_key.<family.name()>`.
    pub fn register(
        &mut self,
        family_key: &str,
        family: Arc<dyn ImporterFamily>,
    ) -> ImportResult<()> {
        let datasets = self.families.entry(family_key.to_string()).or_default();
        let dataset = family.name().to_string();
        if datasets.contains_key(&dataset) {
            return Err(ImportError::DuplicateImporter {
                family: family_key.to_string(),
                dataset,
            });
        }
        datasets.insert(dataset, family);
        Ok(())
    }

    /// Builder-style [`Self::register`].
    pub fn with(mut self, family_key: &str, family: Arc<dyn ImporterFamily>) -> ImportResult<Self> {
        self.register(family_key, family)?;
        Ok(self)
    }

    /// Every registered identifier, sorted.
    pub fn sources(&self) -> Vec<String> {
        self.families
            .iter()
            .flat_map(|(family, datasets)| datasets.keys().map(move |d| format!("{family}.{d}")))
            .collect()
    }

    /// Look up the family registered for `source` without materializing anything.
    pub fn lookup(&self, source: &str) -> ImportResult<Arc<dyn ImporterFamily>> {
        let (family, dataset) = parse_source(source)?;
        self.families
            .get(family)
            .and_then(|datasets| datasets.get(dataset))
            .cloned()
            .ok_or_else(|| ImportError::UnknownDataset {
                family: family.to_string(),
                dataset: dataset.to_string(),
            })
    }

    /// Resolve `source` and build one importer per split from `download_dir`.
    pub fn resolve(
        &self,
        source: &str,
        download_dir: impl AsRef<Path>,
    ) -> ImportResult<Vec<Box<dyn Importer>>> {
        let family = self.lookup(source)?;
        let download_dir = download_dir.as_ref();
        debug!(source, dir = %download_dir.display(), "materializing dataset splits");
        family.splits(download_dir)
    }
}

/// Split `family.dataset` into its two tokens.
pub fn parse_source(source: &str) -> ImportResult<(&str, &str)> {
    let mut parts = source.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(family), Some(dataset), None) if !family.is_empty() && !dataset.is_empty() => {
            Ok((family, dataset))
        }
        _ => Err(ImportError::InvalidSourceFormat {
            source_id: source.to_string(),
        }),
    }
}
