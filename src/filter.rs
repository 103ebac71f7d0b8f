//! Metadata filter predicates.
//!
//! Filters are an explicit sum type rather than an opaque key-value map, so
//! the query entry points can validate and reject malformed predicates at the
//! boundary instead of failing deep inside a query. A filter set is a
//! conjunction: every predicate must hold for an item to be eligible, and
//! items that fail any predicate are excluded before ranking, not merely
//! down-ranked.

use serde::{Deserialize, Serialize};

use crate::content::Metadata;
use crate::error::{Result, TesseraError};

/// A single filter predicate over item metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldFilter {
    /// The metadata value under `key` must equal `value` exactly.
    Equals {
        /// Metadata key to test.
        key: String,
        /// Required value.
        value: crate::content::MetadataValue,
    },
    /// The numeric metadata value under `key` must fall within the bounds.
    /// At least one bound must be present; both bounds are inclusive.
    Range {
        /// Metadata key to test.
        key: String,
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// The string metadata value under `key` must be one of `values`.
    AnyOf {
        /// Metadata key to test.
        key: String,
        /// Accepted values; must be non-empty.
        values: Vec<String>,
    },
}

impl FieldFilter {
    /// The metadata key this predicate tests.
    pub fn key(&self) -> &str {
        match self {
            FieldFilter::Equals { key, .. }
            | FieldFilter::Range { key, .. }
            | FieldFilter::AnyOf { key, .. } => key,
        }
    }

    /// Validate this predicate, rejecting shapes that can never match or that
    /// indicate a caller bug.
    pub fn validate(&self) -> Result<()> {
        if self.key().is_empty() {
            return Err(TesseraError::invalid_filter("filter key must not be empty"));
        }
        match self {
            FieldFilter::Equals { .. } => Ok(()),
            FieldFilter::Range { key, min, max } => match (min, max) {
                (None, None) => Err(TesseraError::invalid_filter(format!(
                    "range filter on '{key}' needs at least one bound"
                ))),
                (Some(lo), Some(hi)) if lo > hi => Err(TesseraError::invalid_filter(format!(
                    "range filter on '{key}' has min {lo} > max {hi}"
                ))),
                _ => Ok(()),
            },
            FieldFilter::AnyOf { key, values } => {
                if values.is_empty() {
                    return Err(TesseraError::invalid_filter(format!(
                        "any_of filter on '{key}' has no values"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Test this predicate against an item's metadata.
    ///
    /// Items without the key, or with a value of the wrong shape, do not
    /// match.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            FieldFilter::Equals { key, value } => metadata.get(key) == Some(value),
            FieldFilter::Range { key, min, max } => {
                let Some(n) = metadata.get(key).and_then(|v| v.as_num()) else {
                    return false;
                };
                min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi)
            }
            FieldFilter::AnyOf { key, values } => {
                let Some(s) = metadata.get(key).and_then(|v| v.as_str()) else {
                    return false;
                };
                values.iter().any(|v| v == s)
            }
        }
    }
}

/// Validate a whole filter set before a query executes.
pub fn validate_filters(filters: &[FieldFilter]) -> Result<()> {
    for filter in filters {
        filter.validate()?;
    }
    Ok(())
}

/// Test a filter conjunction against an item's metadata.
pub fn matches_all(filters: &[FieldFilter], metadata: &Metadata) -> bool {
    filters.iter().all(|f| f.matches(metadata))
}
