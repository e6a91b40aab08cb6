use std::collections::HashMap;

use crate::value::{ArrayValue, DataType};

/// A named, typed, shaped array resolved by name at parse time.
///
/// An empty shape means a scalar dataset (one element). The flat value
/// buffer holds `shape.iter().product()` elements in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub shape: Vec<usize>,
    pub values: ArrayValue,
}

impl Dataset {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, values: ArrayValue) -> Self {
        Dataset {
            name: name.into(),
            shape,
            values,
        }
    }

    pub fn dtype(&self) -> DataType {
        self.values.dtype()
    }
}

/// Where named datasets come from. Resolution happens while the tree is
/// being built, not when it is evaluated; a store backed by slow media
/// may block in `resolve`.
pub trait DatasetStore {
    /// Look up a dataset by name. None if no dataset of that name exists.
    fn resolve(&self, name: &str) -> Option<&Dataset>;
}

/// An in-memory store keyed by dataset name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    datasets: HashMap<String, Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Add a dataset, replacing any existing one with the same name.
    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.name.clone(), dataset);
    }
}

impl DatasetStore for MemoryStore {
    fn resolve(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }
}
