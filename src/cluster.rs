// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use rustc_hash::FxHashMap;

use crate::coordinate::GridKey;

/// A labelled collection of grid keys, each tagged with an `inside` flag
/// (§3, Definition 3.6).
///
/// A grid is inside the cluster iff every one of its `2d` neighbours is
/// also a member; otherwise it is outside.
#[derive(Debug, Default, Clone)]
pub struct GridCluster {
    members: FxHashMap<GridKey, bool>,
}

impl GridCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster weight: number of member grids.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &GridKey) -> bool {
        self.members.contains_key(key)
    }

    #[must_use]
    pub fn is_inside(&self, key: &GridKey) -> Option<bool> {
        self.members.get(key).copied()
    }

    /// Adds a member, initially marked outside (recomputed separately).
    pub fn add(&mut self, key: GridKey) {
        self.members.entry(key).or_insert(false);
    }

    pub fn remove(&mut self, key: &GridKey) -> bool {
        self.members.remove(key).is_some()
    }

    pub fn set_inside(&mut self, key: &GridKey, inside: bool) {
        if let Some(flag) = self.members.get_mut(key) {
            *flag = inside;
        }
    }

    /// Absorbs another cluster's members, marking every newly admitted
    /// grid `inside = false` (recomputed afterwards by the caller).
    pub fn absorb(&mut self, other: Self) {
        for (key, _) in other.members {
            self.members.insert(key, false);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &GridKey> {
        self.members.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GridKey, bool)> {
        self.members.iter().map(|(k, v)| (k, *v))
    }

    pub fn outside_members(&self) -> impl Iterator<Item = GridKey> + '_ {
        self.members
            .iter()
            .filter(|(_, inside)| !**inside)
            .map(|(k, _)| k.clone())
    }

    /// Recomputes the `inside` flag for every member: a member is inside
    /// iff all `2d` neighbours are themselves members of this cluster.
    pub fn recompute_inside(&mut self) {
        let keys: Vec<GridKey> = self.members.keys().cloned().collect();
        for key in keys {
            let inside = key.neighbours().all(|n| self.members.contains_key(&n));
            self.members.insert(key, inside);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_member_cluster_has_no_inside_grid() {
        let mut cluster = GridCluster::new();
        cluster.add(GridKey::new(vec![0]));
        cluster.recompute_inside();
        assert_eq!(cluster.is_inside(&GridKey::new(vec![0])), Some(false));
    }

    #[test]
    fn fully_surrounded_1d_member_becomes_inside() {
        let mut cluster = GridCluster::new();
        cluster.add(GridKey::new(vec![-1]));
        cluster.add(GridKey::new(vec![0]));
        cluster.add(GridKey::new(vec![1]));
        cluster.recompute_inside();
        assert_eq!(cluster.is_inside(&GridKey::new(vec![0])), Some(true));
        assert_eq!(cluster.is_inside(&GridKey::new(vec![-1])), Some(false));
        assert_eq!(cluster.is_inside(&GridKey::new(vec![1])), Some(false));
    }

    #[test]
    fn absorb_merges_members_and_resets_inside_flag() {
        let mut a = GridCluster::new();
        a.add(GridKey::new(vec![0]));
        a.set_inside(&GridKey::new(vec![0]), true);

        let mut b = GridCluster::new();
        b.add(GridKey::new(vec![1]));

        a.absorb(b);
        assert_eq!(a.weight(), 2);
        // newly admitted member starts outside
        assert_eq!(a.is_inside(&GridKey::new(vec![1])), Some(false));
    }
}
