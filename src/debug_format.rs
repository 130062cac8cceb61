// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Human-readable debug formatting for a grid's characteristic vector
//! (§6), reproducing the informational wire format given there:
//! `"CV / A (tg tm D class status) chgflag: <A> <tg> <tm> <D> <class>
//! <Sporadic|Normal> [CHANGED]"`.

use std::fmt;

use crate::characteristic_vector::CharacteristicVector;
use crate::coordinate::GridKey;

/// Wraps a [`CharacteristicVector`] for the one-line, informational (not
/// machine-parsed) debug rendering given in §6. The grid's coordinate
/// itself is not part of that format; pass it separately if needed
/// (e.g. via [`GridKey`]'s own `Display`).
pub struct DebugCv<'a> {
    cv: &'a CharacteristicVector,
}

impl<'a> DebugCv<'a> {
    /// Wraps `cv` for rendering in the §6 informational format.
    #[must_use]
    pub fn new(cv: &'a CharacteristicVector) -> Self {
        Self { cv }
    }
}

impl fmt::Display for DebugCv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tm = self
            .cv
            .last_removed_tick
            .map_or_else(|| "-1".to_string(), |tm| tm.to_string());
        let status = if self.cv.sporadic { "Sporadic" } else { "Normal" };

        write!(
            f,
            "CV / A (tg tm D class status) chgflag: {} {} {} {:.4} {} {}",
            self.cv.attribute.code(),
            self.cv.last_update_tick,
            tm,
            self.cv.density,
            self.cv.label,
            status,
        )?;
        if self.cv.attribute_changed {
            write!(f, " [CHANGED]")?;
        }
        Ok(())
    }
}

/// Renders `key`'s grid alongside its characteristic vector, for call
/// sites that want the coordinate prefixed onto the §6 format.
#[must_use]
pub fn render(key: &GridKey, cv: &CharacteristicVector) -> String {
    format!("{key} {}", DebugCv::new(cv))
}
