// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Initial clustering, incremental adjustment, and label propagation
//! (§4.2).

use crate::characteristic_vector::{Attribute, NO_CLASS};
use crate::cluster_registry::ClusterRegistry;
use crate::coordinate::GridKey;
use crate::density::DensityEngine;
use crate::grid_registry::GridRegistry;

/// Bulk-refreshes every grid's density, skipping grids already flagged
/// sporadic.
///
/// A sporadic-flagged grid is already below `dl` (S1 implies `D < pi <=
/// dl`) and so holds no cluster membership; refreshing it here would only
/// reset `tg` to the current tick every cycle, which keeps `tc - tg`
/// pinned at exactly `gap` forever and makes the sporadic detector's
/// `tc - tg > gap` eviction condition (§4.3) unreachable. Leaving a
/// sporadic grid's `tg` untouched lets that staleness accumulate across
/// cycles until the detector actually evicts it.
fn bulk_refresh(tc: u64, density: &DensityEngine, registry: &mut GridRegistry) {
    for cv in registry.values_mut() {
        if !cv.sporadic {
            density.refresh(cv, tc);
        }
    }
}

/// Runs initial clustering (§4.2), executed exactly once at `tc == gap`:
/// bulk-refreshes every grid, seeds one cluster per dense grid, then runs
/// the label-propagation fixpoint to absorb transitional bridges and merge
/// adjacent clusters.
pub fn initial_clustering(
    tc: u64,
    density: &DensityEngine,
    registry: &mut GridRegistry,
    clusters: &mut ClusterRegistry,
) {
    bulk_refresh(tc, density, registry);

    let dense_grids: Vec<GridKey> = registry
        .iter()
        .filter(|(_, cv)| cv.attribute == Attribute::Dense)
        .map(|(key, _)| key.clone())
        .collect();

    for key in dense_grids {
        let label = clusters.push_new();
        clusters.assign(registry, key, label);
    }

    run_label_propagation(registry, clusters);
    log::debug!(
        "initial clustering at tc={tc}: {} grids, {} clusters",
        registry.len(),
        clusters.len()
    );
}

/// Runs the label-propagation fixpoint: repeatedly applies
/// [`propagate_once`] until a full pass makes no change (§4.2, §8
/// property 8).
fn run_label_propagation(registry: &mut GridRegistry, clusters: &mut ClusterRegistry) {
    while propagate_once(registry, clusters) {}
}

/// A single label-propagation step. Scans outside members of every
/// cluster for a neighbour that either belongs to a different cluster
/// (triggering a merge) or is an unlabelled transitional grid (triggering
/// an absorption), applies the *first* such change found, and returns
/// `true` immediately — the registries mutate during propagation, so
/// continuing over a stale snapshot would be undefined (§4.2).
fn propagate_once(registry: &mut GridRegistry, clusters: &mut ClusterRegistry) -> bool {
    for c_idx in 0..clusters.len() {
        let Some(cluster) = clusters.get(c_idx) else {
            continue;
        };
        let outside: Vec<GridKey> = cluster.outside_members().collect();

        for g in outside {
            for h in g.neighbours() {
                let Some(h_cv) = registry.get(&h) else {
                    continue;
                };
                let h_label = h_cv.label;

                if h_label != NO_CLASS && h_label as usize != c_idx {
                    let other = h_label as usize;
                    let (small, big) = order_by_weight(clusters, c_idx, other);
                    clusters.merge(registry, small, big);
                    return true;
                }

                if h_label == NO_CLASS && h_cv.attribute == Attribute::Transitional {
                    clusters.assign(registry, h.clone(), c_idx);
                    return true;
                }
            }
        }
    }
    false
}

/// Orders two cluster labels so the first has the smaller weight (ties
/// broken by merging the lower index into the higher one).
fn order_by_weight(clusters: &ClusterRegistry, a: usize, b: usize) -> (usize, usize) {
    let wa = clusters.get(a).map_or(0, |c| c.weight());
    let wb = clusters.get(b).map_or(0, |c| c.weight());
    if wa < wb {
        (a, b)
    } else if wb < wa {
        (b, a)
    } else if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Runs incremental adjustment (§4.2), executed every `gap` ticks after
/// the first clustering cycle, immediately after sporadic removal:
/// bulk-refreshes every grid, then reacts to every attribute transition.
pub fn incremental_adjust(
    tc: u64,
    density: &DensityEngine,
    registry: &mut GridRegistry,
    clusters: &mut ClusterRegistry,
) {
    bulk_refresh(tc, density, registry);

    let changed: Vec<GridKey> = registry
        .iter()
        .filter(|(_, cv)| cv.attribute_changed)
        .map(|(key, _)| key.clone())
        .collect();

    for g in changed {
        let Some(cv) = registry.get(&g) else { continue };
        match cv.attribute {
            Attribute::Sparse => handle_sparse(registry, clusters, &g),
            Attribute::Dense => handle_dense(registry, clusters, &g),
            Attribute::Transitional => handle_transitional(registry, clusters, &g),
        }
    }

    log::debug!(
        "incremental adjustment at tc={tc}: {} grids, {} clusters",
        registry.len(),
        clusters.len()
    );
}

fn handle_sparse(registry: &mut GridRegistry, clusters: &mut ClusterRegistry, g: &GridKey) {
    let label = registry.get(g).map(|cv| cv.label).unwrap_or(NO_CLASS);
    if label != NO_CLASS {
        clusters.remove_member(registry, label as usize, g);
    }
}

/// Finds, among `g`'s registry-present neighbours, the one whose cluster
/// has maximum weight, excluding unlabelled neighbours and neighbours that
/// already share `g`'s own label. Ties keep the first-seen neighbour.
fn best_neighbour_cluster(
    registry: &GridRegistry,
    clusters: &ClusterRegistry,
    g: &GridKey,
    own_label: i64,
) -> Option<(GridKey, usize)> {
    let mut best: Option<(GridKey, usize, usize)> = None;

    for h in g.neighbours() {
        let Some(h_cv) = registry.get(&h) else {
            continue;
        };
        if h_cv.label == NO_CLASS || h_cv.label == own_label {
            continue;
        }
        let ch = h_cv.label as usize;
        let weight = clusters.get(ch).map_or(0, |c| c.weight());

        let is_better = match &best {
            None => true,
            Some((_, _, best_weight)) => weight > *best_weight,
        };
        if is_better {
            best = Some((h, ch, weight));
        }
    }

    best.map(|(h, ch, _)| (h, ch))
}

fn handle_dense(registry: &mut GridRegistry, clusters: &mut ClusterRegistry, g: &GridKey) {
    let own_label = registry.get(g).map(|cv| cv.label).unwrap_or(NO_CLASS);

    let Some((h, ch)) = best_neighbour_cluster(registry, clusters, g, own_label) else {
        // No eligible neighbour: the dense grid spawns its own cluster
        // (§3 Lifecycle).
        let label = clusters.push_new();
        clusters.assign(registry, g.clone(), label);
        return;
    };

    let h_attribute = registry.get(&h).map(|cv| cv.attribute);

    match h_attribute {
        Some(Attribute::Dense) => {
            if own_label == NO_CLASS {
                clusters.assign(registry, g.clone(), ch);
            } else {
                let (small, big) = order_by_weight(clusters, own_label as usize, ch);
                clusters.merge(registry, small, big);
            }
        }
        Some(Attribute::Transitional) => {
            if own_label == NO_CLASS {
                if would_remain_outside(clusters, &h, ch, g) {
                    clusters.assign(registry, g.clone(), ch);
                }
            } else {
                let c = own_label as usize;
                let c_weight = clusters.get(c).map_or(0, |cl| cl.weight());
                let ch_weight = clusters.get(ch).map_or(0, |cl| cl.weight());
                if c_weight >= ch_weight {
                    move_grid(registry, clusters, &h, ch, c);
                }
            }
        }
        _ => {}
    }
}

fn handle_transitional(registry: &mut GridRegistry, clusters: &mut ClusterRegistry, g: &GridKey) {
    let own_label = registry.get(g).map(|cv| cv.label).unwrap_or(NO_CLASS);

    let mut best: Option<(usize, usize)> = None;
    for h in g.neighbours() {
        let Some(h_cv) = registry.get(&h) else {
            continue;
        };
        if h_cv.label == NO_CLASS || h_cv.label == own_label {
            continue;
        }
        let ch = h_cv.label as usize;
        if !would_g_be_outside_of(clusters, g, ch) {
            continue;
        }
        let weight = clusters.get(ch).map_or(0, |c| c.weight());
        let is_better = match &best {
            None => true,
            Some((_, best_weight)) => weight > *best_weight,
        };
        if is_better {
            best = Some((ch, weight));
        }
    }

    match best {
        Some((ch, _)) => {
            if own_label != NO_CLASS {
                clusters.remove_member(registry, own_label as usize, g);
            }
            clusters.assign(registry, g.clone(), ch);
        }
        None => {
            let label = clusters.push_new();
            clusters.assign(registry, g.clone(), label);
        }
    }
}

/// `true` iff, after hypothetically adding `candidate` to cluster `ch`,
/// `h` would remain an outside grid of `ch` (i.e. not all of `h`'s
/// neighbours, counting the newly added candidate, are members of `ch`).
fn would_remain_outside(
    clusters: &ClusterRegistry,
    h: &GridKey,
    ch: usize,
    candidate: &GridKey,
) -> bool {
    let Some(cluster) = clusters.get(ch) else {
        return true;
    };
    !h.neighbours()
        .all(|n| &n == candidate || cluster.contains(&n))
}

/// `true` iff `g`, once added to cluster `ch`, would be classified as an
/// outside grid of `ch` (i.e. not all of `g`'s own neighbours are already
/// members of `ch`).
fn would_g_be_outside_of(clusters: &ClusterRegistry, g: &GridKey, ch: usize) -> bool {
    let Some(cluster) = clusters.get(ch) else {
        return true;
    };
    !g.neighbours().all(|n| cluster.contains(&n))
}

/// Moves a single grid from one cluster to another, relabelling it and
/// recomputing inside/outside flags for both clusters.
fn move_grid(
    registry: &mut GridRegistry,
    clusters: &mut ClusterRegistry,
    key: &GridKey,
    from: usize,
    to: usize,
) {
    let compacted = clusters.remove_member(registry, from, key);
    let to = if compacted && from < to { to - 1 } else { to };
    clusters.assign(registry, key.clone(), to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use test_log::test;

    // N=1 (the engine's uninitialized default) puts `dm` at `Cm /
    // (1-lambda)`, far above the ~500 ceiling any decayed density can
    // reach; no grid could ever go dense. A real stream observes many
    // grids, so widen N the same way the Driver would once it has seen a
    // non-trivial coordinate range.
    fn engine(gap: u64) -> DensityEngine {
        let cfg = Config::new().time_gap(gap);
        let mut engine = DensityEngine::new(cfg.decay_factor, cfg.cm, cfg.cl, cfg.time_gap);
        engine.recompute(100);
        engine
    }

    fn feed(registry: &mut GridRegistry, density: &DensityEngine, key: &GridKey, tc: u64) {
        let cv = registry.insert_new(key.clone(), tc);
        density.update_on_record(cv, tc);
    }

    #[test]
    fn single_attractor_forms_one_cluster() {
        let density = engine(50);
        let mut registry = GridRegistry::new();
        let mut clusters = ClusterRegistry::new();
        let key = GridKey::new(vec![5]);

        for tc in 0..50 {
            feed(&mut registry, &density, &key, tc);
        }
        initial_clustering(50, &density, &mut registry, &mut clusters);

        assert_eq!(clusters.len(), 1);
        assert!(clusters.get(0).unwrap().contains(&key));
    }

    #[test]
    fn transitional_bridge_merges_two_dense_grids() {
        let density = engine(30);
        let mut registry = GridRegistry::new();
        let mut clusters = ClusterRegistry::new();

        let left = GridKey::new(vec![0]);
        let right = GridKey::new(vec![2]);
        let bridge = GridKey::new(vec![1]);

        for tc in 0..30 {
            feed(&mut registry, &density, &left, tc);
            feed(&mut registry, &density, &right, tc);
        }
        // bridge grid gets fewer hits, landing transitional rather than dense
        for tc in 0..6 {
            feed(&mut registry, &density, &bridge, tc);
        }

        initial_clustering(30, &density, &mut registry, &mut clusters);

        // left and right are dense and adjacent to the transitional bridge;
        // propagation must merge them into one cluster via the bridge.
        assert_eq!(clusters.len(), 1);
        let cluster = clusters.get(0).unwrap();
        assert!(cluster.contains(&left));
        assert!(cluster.contains(&right));
    }

    #[test]
    fn propagation_is_idempotent() {
        let density = engine(30);
        let mut registry = GridRegistry::new();
        let mut clusters = ClusterRegistry::new();
        let key = GridKey::new(vec![0]);
        for tc in 0..30 {
            feed(&mut registry, &density, &key, tc);
        }
        initial_clustering(30, &density, &mut registry, &mut clusters);
        assert!(!propagate_once(&mut registry, &mut clusters));
    }
}
