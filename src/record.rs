// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// The record interface consumed by the engine (§6).
///
/// An external stream-mining framework's record/attribute abstraction is
/// treated as an outside collaborator; the engine only needs the narrow
/// surface below.
pub trait Record {
    /// Number of attributes (`d`).
    fn dimensions(&self) -> usize;

    /// `true` iff attribute `index` is numeric.
    fn is_numeric(&self, index: usize) -> bool;

    /// `true` iff attribute `index` is nominal (categorical).
    fn is_nominal(&self, index: usize) -> bool {
        !self.is_numeric(index)
    }

    /// For a nominal attribute, the number of distinct categories it can
    /// take. `None` for numeric attributes.
    fn num_values(&self, index: usize) -> Option<usize>;

    /// The attribute's value: the raw numeric value for a numeric
    /// attribute, or the category index (as a real) for a nominal one.
    fn value(&self, index: usize) -> f64;

    /// For a nominal attribute, the string label of its current category,
    /// if the record exposes one.
    fn string_value(&self, index: usize) -> Option<&str>;

    /// For a nominal attribute, the index of a named category.
    fn index_of_value(&self, index: usize, name: &str) -> Option<usize>;
}

/// The kind of a single attribute in a [`DenseRecord`].
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeKind {
    /// A real-valued attribute, mapped to a grid coordinate by flooring.
    Numeric,
    /// A categorical attribute with the given list of category names.
    Nominal(Vec<String>),
}

/// A simple, allocation-light [`Record`] implementation for tests and
/// embedders who don't already have their own record type.
///
/// Each attribute is either numeric or nominal; nominal attributes carry
/// their full category list so `string_value`/`index_of_value` work.
#[derive(Clone, Debug)]
pub struct DenseRecord {
    kinds: Vec<AttributeKind>,
    values: Vec<f64>,
}

impl DenseRecord {
    /// Builds a record from explicit per-attribute kinds and values.
    ///
    /// # Panics
    ///
    /// Panics if `kinds` and `values` have different lengths.
    #[must_use]
    pub fn new(kinds: Vec<AttributeKind>, values: Vec<f64>) -> Self {
        assert_eq!(
            kinds.len(),
            values.len(),
            "attribute kinds and values must have the same length"
        );
        Self { kinds, values }
    }

    /// Convenience constructor for an all-numeric record.
    #[must_use]
    pub fn numeric(values: Vec<f64>) -> Self {
        let kinds = values.iter().map(|_| AttributeKind::Numeric).collect();
        Self { kinds, values }
    }
}

impl Record for DenseRecord {
    fn dimensions(&self) -> usize {
        self.values.len()
    }

    fn is_numeric(&self, index: usize) -> bool {
        matches!(self.kinds.get(index), Some(AttributeKind::Numeric))
    }

    fn num_values(&self, index: usize) -> Option<usize> {
        match self.kinds.get(index) {
            Some(AttributeKind::Nominal(values)) => Some(values.len()),
            _ => None,
        }
    }

    fn value(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn string_value(&self, index: usize) -> Option<&str> {
        match self.kinds.get(index) {
            Some(AttributeKind::Nominal(values)) => {
                let idx = *self.values.get(index)? as usize;
                values.get(idx).map(String::as_str)
            }
            _ => None,
        }
    }

    fn index_of_value(&self, index: usize, name: &str) -> Option<usize> {
        match self.kinds.get(index) {
            Some(AttributeKind::Nominal(values)) => values.iter().position(|v| v == name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_record_reports_values() {
        let record = DenseRecord::numeric(vec![5.0, -2.0]);
        assert_eq!(record.dimensions(), 2);
        assert!(record.is_numeric(0));
        assert_eq!(record.value(1), -2.0);
        assert_eq!(record.num_values(0), None);
    }

    #[test]
    fn nominal_record_resolves_names() {
        let kinds = vec![
            AttributeKind::Nominal(vec!["a".into(), "b".into(), "c".into()]),
            AttributeKind::Numeric,
        ];
        let record = DenseRecord::new(kinds, vec![1.0, 3.5]);
        assert!(record.is_nominal(0));
        assert_eq!(record.num_values(0), Some(3));
        assert_eq!(record.string_value(0), Some("b"));
        assert_eq!(record.index_of_value(0, "c"), Some(2));
        assert_eq!(record.index_of_value(0, "z"), None);
    }
}
