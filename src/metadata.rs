use indexmap::IndexMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Ordered string properties attached to a single grid cell.
///
/// Insertion order is kept, including through save/load. A pair whose value
/// is empty does not count as "set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileMetadata {
    values: IndexMap<String, String>,
}

impl TileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Sets `key`, keeping its original position if it already existed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `false` means this bag is equivalent to "no metadata" and must not be
    /// stored in a grid or written to disk.
    pub fn has_values_set(&self) -> bool {
        self.values.values().any(|v| !v.is_empty())
    }

    /// Hash of the set pairs, independent of key order.
    pub fn content_hash(&self) -> u64 {
        let mut pairs: Vec<(&str, &str)> = self.iter().filter(|(_, v)| !v.is_empty()).collect();
        pairs.sort_unstable();
        let mut h = FxHasher::default();
        pairs.hash(&mut h);
        h.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TileMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = TileMetadata::new();
        for (k, v) in iter {
            m.set(k, v);
        }
        m
    }
}
