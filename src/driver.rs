// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Per-record ingestion loop, tick management, and dispatch to the
//! density, clustering and sporadic-detection subsystems at gap
//! boundaries (§4.4).

use crate::cluster::GridCluster;
use crate::cluster_registry::ClusterRegistry;
use crate::clustering::{incremental_adjust, initial_clustering};
use crate::config::Config;
use crate::coordinate::{Component, GridKey};
use crate::density::DensityEngine;
use crate::error::{Error, Result};
use crate::grid_registry::GridRegistry;
use crate::record::Record;
use crate::sporadic::sweep;

/// Per-dimension metadata the driver tracks to derive the grid-space size
/// `N` (§4.1, §4.4).
#[derive(Clone, Debug)]
enum DimensionTracker {
    Numeric { min: Component, max: Component },
    Categorical { cardinality: usize },
}

impl DimensionTracker {
    fn size(&self) -> usize {
        match self {
            Self::Numeric { min, max } => (*max - *min + 1).max(1) as usize,
            Self::Categorical { cardinality } => (*cardinality).max(1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DriverState {
    Uninitialized,
    Running,
}

/// The stream driver (§4.4): the engine's entry point. Owns the Grid
/// Registry and Cluster Registry and orchestrates the density, clustering
/// and sporadic-detection subsystems as records arrive.
pub struct Driver {
    state: DriverState,
    dims: usize,
    trackers: Vec<DimensionTracker>,
    density: DensityEngine,
    registry: GridRegistry,
    clusters: ClusterRegistry,
    beta: f64,
    tc: u64,
}

impl Driver {
    /// Builds a new driver from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails [`Config::validate`];
    /// the driver never enters the running state in that case (§7).
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: DriverState::Uninitialized,
            dims: 0,
            trackers: Vec::new(),
            density: DensityEngine::new(config.decay_factor, config.cm, config.cl, config.time_gap),
            registry: GridRegistry::new(),
            clusters: ClusterRegistry::new(),
            beta: config.beta,
            tc: 0,
        })
    }

    /// The current tick `tc`: the number of records ingested so far.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tc
    }

    /// Number of live grids currently held in the registry.
    #[must_use]
    pub fn grid_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of live clusters currently held in the cluster registry.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// All live clusters, paired with their label.
    pub fn clusters(&self) -> impl Iterator<Item = ClusterView<'_>> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(label, cluster)| ClusterView { label, cluster })
    }

    /// `1.0` if `record` maps to a grid currently in cluster `label`, else
    /// `0.0` (§6). Returns `Ok(0.0)` rather than an error for an
    /// out-of-range label or before the engine has seen any record.
    pub fn inclusion_probability(&self, record: &impl Record, label: usize) -> Result<f64> {
        if self.state == DriverState::Uninitialized {
            return Ok(0.0);
        }
        if record.dimensions() != self.dims {
            return Err(Error::SchemaMismatch {
                expected: self.dims,
                found: record.dimensions(),
            });
        }

        let key = self.map_to_key(record);
        let in_cluster = self
            .registry
            .get(&key)
            .is_some_and(|cv| cv.label == label as i64);
        Ok(if in_cluster { 1.0 } else { 0.0 })
    }

    /// Ingests one record (§4.4): maps it to a grid, updates the grid's
    /// characteristic vector, and dispatches clustering/sporadic-detection
    /// work at gap boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `record`'s dimensionality
    /// differs from the one fixed by the first ingested record, or
    /// [`Error::Invariant`] if a label/cluster-membership inconsistency
    /// (§8 property 2) is detected after dispatch — a programmer error
    /// that should never occur in a correct build.
    pub fn ingest(&mut self, record: &impl Record) -> Result<()> {
        if self.state == DriverState::Uninitialized {
            self.initialize(record);
        } else if record.dimensions() != self.dims {
            return Err(Error::SchemaMismatch {
                expected: self.dims,
                found: record.dimensions(),
            });
        }

        let grew = self.update_trackers(record);
        if grew {
            self.density.recompute(self.grid_space_size());
            log::debug!(
                "tc={}: grid-space size grew to N={}, thresholds recomputed: dm={:.6} dl={:.6} gap={}",
                self.tc,
                self.density.grid_count(),
                self.density.dm(),
                self.density.dl(),
                self.density.gap(),
            );
        }

        let tc = self.tc;
        let key = self.map_to_key(record);
        let cv = self.registry.insert_new(key, tc);
        self.density.update_on_record(cv, tc);

        let gap = self.density.gap();
        if tc != 0 && tc % gap == 0 {
            if tc == gap {
                log::debug!("tc={tc}: gap boundary reached, running initial clustering");
                initial_clustering(tc, &self.density, &mut self.registry, &mut self.clusters);
            } else {
                log::debug!(
                    "tc={tc}: gap boundary reached, running sporadic sweep then incremental adjustment"
                );
                sweep(
                    tc,
                    &self.density,
                    self.beta,
                    &mut self.registry,
                    &mut self.clusters,
                );
                incremental_adjust(tc, &self.density, &mut self.registry, &mut self.clusters);
            }
            self.clusters.check_consistency(&self.registry)?;
        }

        self.tc += 1;
        Ok(())
    }

    fn initialize(&mut self, record: &impl Record) {
        self.dims = record.dimensions();
        self.trackers = (0..self.dims)
            .map(|i| {
                if record.is_numeric(i) {
                    let v = record.value(i).floor() as Component;
                    DimensionTracker::Numeric { min: v, max: v }
                } else {
                    let cardinality = record.num_values(i).unwrap_or(1);
                    DimensionTracker::Categorical { cardinality }
                }
            })
            .collect();
        self.density.recompute(self.grid_space_size());
        self.state = DriverState::Running;
    }

    /// Updates the per-dimension trackers for `record`. Returns `true` if
    /// the grid-space size `N` may have grown as a result.
    fn update_trackers(&mut self, record: &impl Record) -> bool {
        let mut grew = false;
        for (i, tracker) in self.trackers.iter_mut().enumerate() {
            match tracker {
                DimensionTracker::Numeric { min, max } => {
                    let v = record.value(i).floor() as Component;
                    if v < *min {
                        *min = v;
                        grew = true;
                    }
                    if v > *max {
                        *max = v;
                        grew = true;
                    }
                }
                DimensionTracker::Categorical { cardinality } => {
                    if let Some(n) = record.num_values(i) {
                        if n > *cardinality {
                            *cardinality = n;
                            grew = true;
                        }
                    }
                }
            }
        }
        grew
    }

    fn grid_space_size(&self) -> usize {
        self.trackers
            .iter()
            .map(DimensionTracker::size)
            .product::<usize>()
            .max(1)
    }

    fn map_to_key(&self, record: &impl Record) -> GridKey {
        let components: Vec<Component> = (0..self.dims)
            .map(|i| record.value(i).floor() as Component)
            .collect();
        GridKey::new(components)
    }
}

/// A read view onto one live cluster: its label plus its members.
pub struct ClusterView<'a> {
    label: usize,
    cluster: &'a GridCluster,
}

impl<'a> ClusterView<'a> {
    /// This cluster's label, i.e. its index in the Cluster Registry.
    #[must_use]
    pub fn label(&self) -> usize {
        self.label
    }

    /// Cluster weight: number of member grids.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.cluster.weight()
    }

    /// Member grid keys paired with their inside/outside flag.
    pub fn members(&self) -> impl Iterator<Item = (&GridKey, bool)> + '_ {
        self.cluster.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DenseRecord;
    use test_log::test;

    fn feed_value(driver: &mut Driver, value: f64, times: usize) {
        let record = DenseRecord::numeric(vec![value]);
        for _ in 0..times {
            driver.ingest(&record).expect("ingest should succeed");
        }
    }

    /// Widens the observed range to `[0, width-1]` with one hit per
    /// coordinate, then settles on `target` for the rest of the run.
    ///
    /// A stream that only ever visits one coordinate keeps `N == 1`
    /// forever, and with the default `Cm = 3.0` that makes `dm` (§4.1)
    /// permanently larger than the `1/(1-lambda)` ceiling any density can
    /// reach — no attractor could ever go dense. Real deployments observe
    /// many grids; this widens the range the same way before concentrating
    /// the load, so the scenario is reachable under the stated formulas.
    fn seed_then_concentrate(driver: &mut Driver, width: i64, target: f64, times: usize) {
        for v in 0..width {
            driver
                .ingest(&DenseRecord::numeric(vec![v as f64]))
                .expect("ingest should succeed");
        }
        feed_value(driver, target, times);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = Config::new().decay_factor(5.0);
        assert!(Driver::new(config).is_err());
    }

    #[test]
    fn scenario_s1_single_dense_attractor() {
        let config = Config::new().time_gap(500);
        let mut driver = Driver::new(config).unwrap();
        seed_then_concentrate(&mut driver, 10, 5.0, 600);

        assert_eq!(driver.cluster_count(), 1);
        let cluster = driver.clusters().next().unwrap();
        assert!(cluster
            .members()
            .any(|(key, _)| key == &GridKey::new(vec![5])));
    }

    #[test]
    fn scenario_s2_two_disjoint_attractors() {
        // both attractors present from the very first ticks, so a single
        // initial-clustering pass (not incremental adjustment) is what
        // discovers both of them dense.
        let config = Config::new().time_gap(300);
        let mut driver = Driver::new(config).unwrap();
        let a = DenseRecord::numeric(vec![1.0]);
        let b = DenseRecord::numeric(vec![20.0]);
        for _ in 0..300 {
            driver.ingest(&a).unwrap();
            driver.ingest(&b).unwrap();
        }

        assert_eq!(driver.cluster_count(), 2);
        let labels: Vec<GridKey> = driver
            .clusters()
            .flat_map(|c| c.members().map(|(k, _)| k.clone()).collect::<Vec<_>>())
            .collect();
        assert!(labels.contains(&GridKey::new(vec![1])));
        assert!(labels.contains(&GridKey::new(vec![20])));
    }

    #[test]
    fn incremental_adjustment_discovers_grid_via_threshold_shift() {
        // grid(1) sits just under `dm` while N stays 1 (no cluster forms
        // at the first cycle, tc=50); when a later record at a distant
        // coordinate widens N, `dm` drops enough that the very next
        // incremental-adjustment bulk refresh reclassifies grid(1) dense
        // without it receiving a new hit itself.
        let config = Config::new().time_gap(50);
        let mut driver = Driver::new(config).unwrap();
        feed_value(&mut driver, 1.0, 100);
        assert_eq!(driver.cluster_count(), 0);

        feed_value(&mut driver, 20.0, 1);

        assert_eq!(driver.cluster_count(), 1);
        let cluster = driver.clusters().next().unwrap();
        assert!(cluster
            .members()
            .any(|(key, _)| key == &GridKey::new(vec![1])));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let config = Config::new();
        let mut driver = Driver::new(config).unwrap();
        driver.ingest(&DenseRecord::numeric(vec![1.0])).unwrap();
        let err = driver
            .ingest(&DenseRecord::numeric(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { expected: 1, found: 2 }));
    }

    #[test]
    fn empty_registry_before_first_cycle_has_no_clusters() {
        let config = Config::new().time_gap(1_000);
        let mut driver = Driver::new(config).unwrap();
        feed_value(&mut driver, 1.0, 3);
        assert_eq!(driver.cluster_count(), 0);
        assert_eq!(driver.clusters().count(), 0);
    }

    #[test]
    fn inclusion_probability_is_binary() {
        let config = Config::new().time_gap(500);
        let mut driver = Driver::new(config).unwrap();
        seed_then_concentrate(&mut driver, 10, 5.0, 600);

        let here = DenseRecord::numeric(vec![5.0]);
        let elsewhere = DenseRecord::numeric(vec![500.0]);
        assert_eq!(driver.inclusion_probability(&here, 0).unwrap(), 1.0);
        assert_eq!(driver.inclusion_probability(&elsewhere, 0).unwrap(), 0.0);
    }
}
