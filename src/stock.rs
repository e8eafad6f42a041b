//! Per-step payload storage keyed by iteration

use crate::error::{NataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// How to treat an iteration that is present on both sides of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Fail with [`NataError::DuplicateIteration`]
    #[default]
    Reject,
    /// Keep the incoming value
    Override,
}

/// Ordered mapping from iteration to a per-step value
///
/// Entries are always iterated in ascending iteration order, so the order
/// does not depend on the order in which steps were merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStock<V> {
    mapping: BTreeMap<u64, V>,
}

impl<V> Default for DataStock<V> {
    fn default() -> Self {
        Self {
            mapping: BTreeMap::new(),
        }
    }
}

impl<V> DataStock<V> {
    /// Create an empty stock
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stock holding a single step
    pub fn single(iteration: u64, value: V) -> Self {
        let mut stock = Self::new();
        stock.mapping.insert(iteration, value);
        stock
    }

    /// Build a stock from `(iteration, value)` pairs, rejecting duplicates
    pub fn from_entries(entries: impl IntoIterator<Item = (u64, V)>) -> Result<Self> {
        let mut stock = Self::new();
        for (iteration, value) in entries {
            stock.insert(iteration, value)?;
        }
        Ok(stock)
    }

    /// Number of steps held
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn contains_key(&self, iteration: u64) -> bool {
        self.mapping.contains_key(&iteration)
    }

    /// Insert a new step; fails if the iteration is already present
    pub fn insert(&mut self, iteration: u64, value: V) -> Result<()> {
        match self.mapping.entry(iteration) {
            btree_map::Entry::Occupied(_) => Err(NataError::DuplicateIteration(iteration)),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Replace the value of an existing step, returning the previous one
    pub fn replace(&mut self, iteration: u64, value: V) -> Result<V> {
        let slot = self.get_mut(iteration)?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn get(&self, iteration: u64) -> Result<&V> {
        self.mapping
            .get(&iteration)
            .ok_or(NataError::KeyNotFound(iteration))
    }

    pub fn get_mut(&mut self, iteration: u64) -> Result<&mut V> {
        self.mapping
            .get_mut(&iteration)
            .ok_or(NataError::KeyNotFound(iteration))
    }

    pub fn remove(&mut self, iteration: u64) -> Result<V> {
        self.mapping
            .remove(&iteration)
            .ok_or(NataError::KeyNotFound(iteration))
    }

    /// Iterations in ascending order
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.mapping.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.mapping.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.mapping.iter().map(|(k, v)| (*k, v))
    }

    /// Validate a merge of `other` into `self` without modifying anything
    pub fn check_merge<W>(&self, other: &DataStock<W>, policy: OverlapPolicy) -> Result<()> {
        if policy == OverlapPolicy::Reject {
            if let Some(iteration) = other.keys().find(|k| self.contains_key(*k)) {
                return Err(NataError::DuplicateIteration(iteration));
            }
        }
        Ok(())
    }

    /// Move every step of `other` into `self`
    ///
    /// Nothing is inserted when the merge fails.
    pub fn merge(&mut self, other: DataStock<V>, policy: OverlapPolicy) -> Result<()> {
        self.check_merge(&other, policy)?;
        for (iteration, value) in other.mapping {
            if self.mapping.insert(iteration, value).is_some() {
                tracing::warn!(iteration, "overriding existing step during merge");
            }
        }
        Ok(())
    }
}

impl<V> IntoIterator for DataStock<V> {
    type Item = (u64, V);
    type IntoIter = btree_map::IntoIter<u64, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.mapping.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut stock = DataStock::new();
        stock.insert(10, "b").unwrap();
        stock.insert(0, "a").unwrap();
        assert_eq!(stock.len(), 2);
        assert_eq!(*stock.get(0).unwrap(), "a");
        assert!(matches!(stock.get(5), Err(NataError::KeyNotFound(5))));
        assert!(matches!(
            stock.insert(10, "c"),
            Err(NataError::DuplicateIteration(10))
        ));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let stock = DataStock::from_entries([(20, 'c'), (0, 'a'), (10, 'b')]).unwrap();
        assert_eq!(stock.keys().collect::<Vec<_>>(), vec![0, 10, 20]);
        assert_eq!(stock.values().copied().collect::<String>(), "abc");
    }

    #[test]
    fn test_merge_rejects_overlap() {
        let mut left = DataStock::from_entries([(0, 1), (1, 2)]).unwrap();
        let right = DataStock::from_entries([(1, 20), (2, 30)]).unwrap();

        let err = left.merge(right, OverlapPolicy::Reject).unwrap_err();
        assert!(matches!(err, NataError::DuplicateIteration(1)));
        assert_eq!(left.len(), 2);
        assert_eq!(*left.get(1).unwrap(), 2);
    }

    #[test]
    fn test_merge_override() {
        let mut left = DataStock::from_entries([(0, 1), (1, 2)]).unwrap();
        let right = DataStock::from_entries([(1, 20), (2, 30)]).unwrap();

        left.merge(right, OverlapPolicy::Override).unwrap();
        assert_eq!(left.len(), 3);
        assert_eq!(left.iter().collect::<Vec<_>>(), vec![(0, &1), (1, &20), (2, &30)]);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut stock = DataStock::single(4, 1.0);
        assert_eq!(stock.replace(4, 2.0).unwrap(), 1.0);
        assert!(matches!(stock.replace(5, 0.0), Err(NataError::KeyNotFound(5))));
        assert_eq!(stock.remove(4).unwrap(), 2.0);
        assert!(stock.is_empty());
    }

    #[test]
    fn test_policy_serde() {
        let policy: OverlapPolicy = serde_json::from_str("\"override\"").unwrap();
        assert_eq!(policy, OverlapPolicy::Override);
        assert_eq!(OverlapPolicy::default(), OverlapPolicy::Reject);
    }
}
