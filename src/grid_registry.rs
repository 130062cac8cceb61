// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rustc_hash::FxHashMap;

use crate::characteristic_vector::CharacteristicVector;
use crate::coordinate::GridKey;

/// Mapping from grid key to characteristic vector (§3); the primary
/// mutable state of the engine.
///
/// Also keeps a tombstone map from a grid's key to the tick at which it
/// was last removed as sporadic, so that a later reinsertion at the same
/// coordinate can correctly evaluate S2 against the true prior `tm`
/// (spec.md §9, "tm recorded at deletion").
#[derive(Debug, Default)]
pub struct GridRegistry {
    grids: FxHashMap<GridKey, CharacteristicVector>,
    tombstones: FxHashMap<GridKey, u64>,
}

impl GridRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &GridKey) -> bool {
        self.grids.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &GridKey) -> Option<&CharacteristicVector> {
        self.grids.get(key)
    }

    pub fn get_mut(&mut self, key: &GridKey) -> Option<&mut CharacteristicVector> {
        self.grids.get_mut(key)
    }

    /// Inserts a brand-new grid at tick `tc`, inheriting `tm` from any
    /// tombstone left by a previous eviction of this same coordinate.
    ///
    /// Returns a mutable reference to the new characteristic vector.
    pub fn insert_new(&mut self, key: GridKey, tc: u64) -> &mut CharacteristicVector {
        let inherited_tm = self.tombstones.get(&key).copied();
        self.grids
            .entry(key)
            .or_insert_with(|| CharacteristicVector::new(tc, inherited_tm))
    }

    /// Removes a grid, recording `tc` as its tombstone `tm` for future
    /// reinsertions at the same coordinate.
    pub fn remove(&mut self, key: &GridKey, tc: u64) -> Option<CharacteristicVector> {
        self.tombstones.insert(key.clone(), tc);
        self.grids.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GridKey, &CharacteristicVector)> {
        self.grids.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&GridKey, &mut CharacteristicVector)> {
        self.grids.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &GridKey> {
        self.grids.keys()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut CharacteristicVector> {
        self.grids.values_mut()
    }
}
