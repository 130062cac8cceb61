// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::characteristic_vector::NO_CLASS;
use crate::cluster::GridCluster;
use crate::coordinate::GridKey;
use crate::error::Error;
use crate::grid_registry::GridRegistry;

/// An ordered list of grid clusters, indexed by cluster label (§3).
///
/// The list is always dense: removing cluster `i` shifts every cluster
/// after it down by one index, which *is* the label decrement the spec
/// requires — as long as every affected characteristic vector is resynced
/// in lockstep, which is exactly what [`ClusterRegistry::merge`] and
/// [`ClusterRegistry::remove_member`] do.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    clusters: Vec<GridCluster>,
}

impl ClusterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    #[must_use]
    pub fn get(&self, label: usize) -> Option<&GridCluster> {
        self.clusters.get(label)
    }

    pub fn get_mut(&mut self, label: usize) -> Option<&mut GridCluster> {
        self.clusters.get_mut(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridCluster> {
        self.clusters.iter()
    }

    /// Allocates a fresh, empty cluster and returns its label.
    pub fn push_new(&mut self) -> usize {
        self.clusters.push(GridCluster::new());
        self.clusters.len() - 1
    }

    /// Assigns `key` to cluster `label`, updating both sides of the
    /// membership and recomputing that cluster's inside/outside flags.
    pub fn assign(&mut self, registry: &mut GridRegistry, key: GridKey, label: usize) {
        if let Some(cv) = registry.get_mut(&key) {
            cv.label = label as i64;
        }
        if let Some(cluster) = self.clusters.get_mut(label) {
            cluster.add(key);
            cluster.recompute_inside();
        }
    }

    /// Removes `key` from cluster `label` (if it is a member), clears its
    /// characteristic-vector label back to [`NO_CLASS`], recomputes the
    /// cluster's inside/outside flags, and compacts the cluster away if it
    /// became empty (§3 Lifecycle).
    ///
    /// Returns `true` if cluster `label` was removed as a result (i.e.
    /// every cluster at or after `label` shifted down by one index).
    pub fn remove_member(
        &mut self,
        registry: &mut GridRegistry,
        label: usize,
        key: &GridKey,
    ) -> bool {
        if let Some(cluster) = self.clusters.get_mut(label) {
            cluster.remove(key);
            cluster.recompute_inside();
        }
        if let Some(cv) = registry.get_mut(key) {
            cv.label = NO_CLASS;
        }
        self.compact_if_empty(label, registry)
    }

    /// If cluster `label` is now empty, removes it and resyncs every
    /// subsequent cluster's label (§4.2 Merge step 3-4). Returns `true` if
    /// a removal happened.
    fn compact_if_empty(&mut self, label: usize, registry: &mut GridRegistry) -> bool {
        let Some(cluster) = self.clusters.get(label) else {
            return false;
        };
        if !cluster.is_empty() {
            return false;
        }
        self.clusters.remove(label);
        self.resync_labels_from(label, registry);
        true
    }

    /// Merges the smaller-weighted cluster into the larger (§4.2):
    ///
    /// 1. Relabels every grid currently labelled `small` to `big`.
    /// 2. Absorbs `small`'s members into `big`, recomputing inside flags.
    /// 3. Removes `small` from the registry.
    /// 4. Decrements the label of every cluster after the removed index
    ///    and updates every affected characteristic vector.
    pub fn merge(&mut self, registry: &mut GridRegistry, small: usize, big: usize) {
        assert_ne!(small, big, "merge requires two distinct clusters");

        for cv in registry.values_mut() {
            if cv.label == small as i64 {
                cv.label = big as i64;
            }
        }

        let absorbed = self.clusters.remove(small);
        let new_big_index = if big > small { big - 1 } else { big };

        if let Some(target) = self.clusters.get_mut(new_big_index) {
            target.absorb(absorbed);
            target.recompute_inside();
        }

        self.resync_labels_from(small, registry);
    }

    /// Rewrites every characteristic vector's `label` to match the
    /// current index of its cluster, for every cluster at or after
    /// `from_index`. Needed after any [`Vec::remove`] on `self.clusters`,
    /// since cluster labels are cluster indices.
    fn resync_labels_from(&mut self, from_index: usize, registry: &mut GridRegistry) {
        for (index, cluster) in self.clusters.iter().enumerate().skip(from_index) {
            for key in cluster.keys() {
                if let Some(cv) = registry.get_mut(key) {
                    cv.label = index as i64;
                }
            }
        }
    }

    /// Checks §8 property 2: every grid with `label != NO_CLASS` must
    /// reference a cluster that exists and that actually contains it.
    ///
    /// A violation means a label-bookkeeping bug let a characteristic
    /// vector and the Cluster Registry drift out of sync — a programmer
    /// error per spec.md §7, not a condition any caller can recover from,
    /// so this is wired into [`crate::Driver::ingest`] rather than left
    /// as a `debug_assert!` that compiles away in release builds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invariant`] describing the first inconsistency
    /// found.
    pub fn check_consistency(&self, registry: &GridRegistry) -> Result<(), Error> {
        for (key, cv) in registry.iter() {
            if cv.label == NO_CLASS {
                continue;
            }
            let label = cv.label as usize;
            match self.clusters.get(label) {
                Some(cluster) if cluster.contains(key) => {}
                Some(_) => {
                    return Err(Error::Invariant(
                        "characteristic vector label references a cluster that does not contain it",
                    ))
                }
                None => {
                    return Err(Error::Invariant(
                        "characteristic vector label references a non-existent cluster",
                    ))
                }
            }
        }
        Ok(())
    }
}
