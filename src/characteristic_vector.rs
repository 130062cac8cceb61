// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fmt;

/// Sentinel label meaning "currently unassigned to any cluster".
pub const NO_CLASS: i64 = -1;

/// The three density classes a grid can be in at any tick (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum Attribute {
    /// `D < dl`: below the sparse threshold.
    Sparse,
    /// `dl <= D < dm`.
    Transitional,
    /// `D >= dm`: at or above the dense threshold.
    Dense,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sparse => "Sparse",
            Self::Transitional => "Transitional",
            Self::Dense => "Dense",
        };
        f.write_str(s)
    }
}

impl Attribute {
    /// Single-letter code used by the debug formatter (`D`/`T`/`S`).
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::Sparse => 'S',
            Self::Transitional => 'T',
            Self::Dense => 'D',
        }
    }
}

/// Per-grid metadata (§3): `(tg, tm, D, label, status, attribute,
/// attChanged)`.
#[derive(Clone, Debug)]
pub struct CharacteristicVector {
    /// Tick of the last density update (`tg`).
    pub last_update_tick: u64,

    /// Tick of the last deletion-as-sporadic (`tm`), or `None` if this grid
    /// (at this coordinate) has never been removed.
    pub last_removed_tick: Option<u64>,

    /// Decayed density (`D`).
    pub density: f64,

    /// Cluster label, or [`NO_CLASS`].
    pub label: i64,

    /// `true` iff currently flagged sporadic.
    pub sporadic: bool,

    /// Density class cached at the last density update.
    pub attribute: Attribute,

    /// `true` iff the most recent density update moved `attribute` to a
    /// different value than it held immediately before that update. Never
    /// toggled by label reassignment or sporadic-flag changes (§9).
    pub attribute_changed: bool,
}

impl CharacteristicVector {
    /// Creates the characteristic vector for a grid seen for the first
    /// time at tick `tc`, inheriting `tm` from a prior tombstone if this
    /// coordinate was previously evicted as sporadic.
    #[must_use]
    pub fn new(tc: u64, inherited_tm: Option<u64>) -> Self {
        Self {
            last_update_tick: tc,
            last_removed_tick: inherited_tm,
            density: 0.0,
            label: NO_CLASS,
            sporadic: false,
            attribute: Attribute::Sparse,
            attribute_changed: false,
        }
    }

    /// `true` iff this grid currently belongs to a cluster.
    #[must_use]
    pub fn is_labelled(&self) -> bool {
        self.label != NO_CLASS
    }
}
