// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A density-grid stream clustering engine (Chen & Tu, 2007).
//!
//! Records arriving one at a time are mapped onto an infinite integer
//! lattice; each cell accumulates an exponentially time-decayed density.
//! Periodically, dense cells seed clusters and absorb their less-dense
//! neighbours, while cells that go cold are evicted from the registry.
//! The whole pipeline is single-threaded and allocation-light enough to
//! keep pace with a live stream.
//!
//! # Example usage
//!
//! ```
//! use dstream_grid::{Config, Driver, DenseRecord};
//!
//! let mut driver = Driver::new(Config::new().time_gap(50))?;
//!
//! for value in [1.0, 1.0, 1.0, 20.0, 20.0, 20.0] {
//!     driver.ingest(&DenseRecord::numeric(vec![value]))?;
//! }
//!
//! for cluster in driver.clusters() {
//!     println!("cluster {} has {} members", cluster.label(), cluster.weight());
//! }
//! # Ok::<(), dstream_grid::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

mod characteristic_vector;
mod cluster;
mod cluster_registry;
mod clustering;
mod config;
mod coordinate;
mod debug_format;
mod density;
mod driver;
mod error;
mod grid_registry;
mod record;
mod sporadic;

pub use characteristic_vector::{Attribute, CharacteristicVector, NO_CLASS};
pub use config::Config;
pub use coordinate::{Component, GridKey};
pub use debug_format::{render as render_debug_cv, DebugCv};
pub use driver::{ClusterView, Driver};
pub use error::{ConfigError, Error, Result};
pub use record::{AttributeKind, DenseRecord, Record};
