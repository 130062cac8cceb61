// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::fmt;

/// A configuration value outside its admissible range (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// `decayFactor` must lie in `(0.001, 0.999)`.
    DecayFactorOutOfRange(f64),
    /// `Cm` must be `> 1.001`.
    CmOutOfRange(f64),
    /// `Cl` must lie in `(0.001, 0.999)`.
    ClOutOfRange(f64),
    /// `Beta` must be `> 0.001`.
    BetaOutOfRange(f64),
    /// `timeGap`, when pinned by the user, must be `>= 1`.
    TimeGapBelowOne(u64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecayFactorOutOfRange(v) => {
                write!(f, "decayFactor {v} is not in (0.001, 0.999)")
            }
            Self::CmOutOfRange(v) => write!(f, "Cm {v} is not > 1.001"),
            Self::ClOutOfRange(v) => write!(f, "Cl {v} is not in (0.001, 0.999)"),
            Self::BetaOutOfRange(v) => write!(f, "Beta {v} is not > 0.001"),
            Self::TimeGapBelowOne(v) => write!(f, "timeGap {v} is not >= 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors the engine can return.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration; the engine never enters the running state.
    Config(ConfigError),

    /// A later record reported a different attribute count than the one
    /// fixed by the first record ingested.
    SchemaMismatch {
        /// Dimensionality fixed by the first record.
        expected: usize,
        /// Dimensionality reported by the offending record.
        found: usize,
    },

    /// An internal invariant was violated (programmer error). Carries a
    /// short, static description of which invariant.
    Invariant(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::SchemaMismatch { expected, found } => write!(
                f,
                "record dimensionality changed: expected {expected}, found {found}"
            ),
            Self::Invariant(what) => write!(f, "internal invariant violated: {what}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, Error>;
