//! Single-key stable sorting.

use crate::filter::FieldResolver;
use ledgerview_protocol::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Which records a sort reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortScope {
    /// Sort the whole filtered set, then page it. Pages stay consistent
    /// with each other.
    #[default]
    FilteredSet,
    /// Page the filtered set in collection order, then sort only the
    /// visible page.
    VisiblePage,
}

/// A single-key sort.
///
/// Missing fields sort as null. Records with equal keys keep their
/// relative order in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort by.
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    /// Sorts by `field`, smallest first.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sorts by `field`, largest first.
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Sorts `records` in place.
    pub fn sort(&self, records: &mut Vec<&Record>, resolver: &FieldResolver) {
        let mut keyed: Vec<(FieldValue, &Record)> = records
            .iter()
            .map(|r| (resolver(*r, &self.field).unwrap_or(FieldValue::Null), *r))
            .collect();

        keyed.sort_by(|(a, _), (b, _)| self.order(a, b));

        records.clear();
        records.extend(keyed.into_iter().map(|(_, r)| r));
    }

    fn order(&self, a: &FieldValue, b: &FieldValue) -> Ordering {
        match self.direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => b.compare(a),
        }
    }
}
