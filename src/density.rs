// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::characteristic_vector::{Attribute, CharacteristicVector};

/// Decay computation, threshold computation, and attribute classification
/// (§4.1).
///
/// Holds the user-chosen `λ`, `Cm`, `Cl`, an optional pinned `timeGap`, and
/// the derived quantities `dm`, `dl`, `gap`, which are recomputed whenever
/// the observed grid-space size `N` changes.
#[derive(Clone, Debug)]
pub struct DensityEngine {
    lambda: f64,
    cm: f64,
    cl: f64,
    user_gap: Option<u64>,
    grid_count: usize,
    dm: f64,
    dl: f64,
    gap: u64,
}

impl DensityEngine {
    /// Builds a density engine for grid-space size `N = 1` (recomputed as
    /// soon as the driver observes the first record's range).
    #[must_use]
    pub fn new(lambda: f64, cm: f64, cl: f64, user_gap: Option<u64>) -> Self {
        let mut engine = Self {
            lambda,
            cm,
            cl,
            user_gap,
            grid_count: 1,
            dm: 0.0,
            dl: 0.0,
            gap: 1,
        };
        engine.recompute(1);
        engine
    }

    #[must_use]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    #[must_use]
    pub fn grid_count(&self) -> usize {
        self.grid_count
    }

    #[must_use]
    pub fn dm(&self) -> f64 {
        self.dm
    }

    #[must_use]
    pub fn dl(&self) -> f64 {
        self.dl
    }

    #[must_use]
    pub fn gap(&self) -> u64 {
        self.gap
    }

    /// Recomputes `dm`, `dl` and `gap` for a new grid-space size `N`
    /// (§4.1). Called whenever the observed coordinate range grows.
    pub fn recompute(&mut self, grid_count: usize) {
        let n = grid_count.max(1);
        self.grid_count = n;

        let denom = n as f64 * (1.0 - self.lambda);
        self.dm = self.cm / denom;
        self.dl = self.cl / denom;

        self.gap = self
            .user_gap
            .unwrap_or_else(|| derive_gap(n, self.cm, self.cl, self.lambda));
    }

    /// Classifies a decayed density value against the current thresholds.
    #[must_use]
    pub fn classify(&self, density: f64) -> Attribute {
        if density >= self.dm {
            Attribute::Dense
        } else if density <= self.dl {
            Attribute::Sparse
        } else {
            Attribute::Transitional
        }
    }

    /// Applies a record-triggered decay update: `D <- lambda^(tc-tg) * D +
    /// 1`.
    pub fn update_on_record(&self, cv: &mut CharacteristicVector, tc: u64) {
        let decayed = self.decay_factor(cv.last_update_tick, tc) * cv.density + 1.0;
        self.apply(cv, tc, decayed);
    }

    /// Applies a bulk-refresh decay update (no new record): `D <-
    /// lambda^(tc-tg) * D`.
    pub fn refresh(&self, cv: &mut CharacteristicVector, tc: u64) {
        let decayed = self.decay_factor(cv.last_update_tick, tc) * cv.density;
        self.apply(cv, tc, decayed);
    }

    /// The sporadicity threshold `pi(tg)` (§4.1).
    #[must_use]
    pub fn sporadic_threshold(&self, tg: u64, tc: u64) -> f64 {
        let elapsed = (tc - tg + 1) as f64;
        self.cl * (1.0 - self.lambda.powf(elapsed)) / (self.grid_count as f64 * (1.0 - self.lambda))
    }

    fn decay_factor(&self, tg: u64, tc: u64) -> f64 {
        self.lambda.powf((tc - tg) as f64)
    }

    fn apply(&self, cv: &mut CharacteristicVector, tc: u64, new_density: f64) {
        let previous = cv.attribute;
        cv.density = new_density;
        cv.last_update_tick = tc;
        cv.attribute = self.classify(new_density);
        cv.attribute_changed = cv.attribute != previous;
    }
}

fn log_base(x: f64, base: f64) -> f64 {
    x.ln() / base.ln()
}

/// `gap = floor(min(log_lambda(Cl/Cm), log_lambda((N-Cm)/(N-Cl))))`, at
/// least 1 (§4.1).
fn derive_gap(n: usize, cm: f64, cl: f64, lambda: f64) -> u64 {
    let n = n as f64;
    let first = log_base(cl / cm, lambda);
    let second = if n > cm && n > cl {
        log_base((n - cm) / (n - cl), lambda)
    } else {
        f64::INFINITY
    };

    let candidate = first.min(second).floor();
    if candidate.is_finite() && candidate >= 1.0 {
        candidate as u64
    } else {
        1
    }
}
