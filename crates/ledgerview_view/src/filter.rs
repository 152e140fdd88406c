//! Field filtering.

use ledgerview_protocol::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resolves a named field of a record, including derived or joined fields.
pub type FieldResolver = Arc<dyn Fn(&Record, &str) -> Option<FieldValue> + Send + Sync>;

/// The resolver used when a view is not given one: stored fields, with
/// `id` falling back to the record identifier.
pub fn default_resolver() -> FieldResolver {
    Arc::new(|record: &Record, field: &str| record.resolve(field))
}

/// A case-insensitive prefix filter on one field.
///
/// An empty query matches every record. Otherwise a record matches when
/// the stringified field value, lowercased, starts with the lowercased
/// query. A record without the field never matches a non-empty query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Field to match on.
    pub field: String,
    /// Prefix to look for.
    pub query: String,
}

impl FilterSpec {
    /// Creates a filter.
    pub fn new(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            query: query.into(),
        }
    }

    /// Returns true if this filter keeps every record.
    pub fn is_identity(&self) -> bool {
        self.query.is_empty()
    }

    /// Checks one record.
    pub fn matches(&self, record: &Record, resolver: &FieldResolver) -> bool {
        if self.is_identity() {
            return true;
        }
        prefix_match(
            resolver(record, &self.field).as_ref(),
            &self.query.to_lowercase(),
        )
    }

    /// Returns the matching records in their original order.
    pub fn apply<'a>(&self, records: &'a [Record], resolver: &FieldResolver) -> Vec<&'a Record> {
        if self.is_identity() {
            return records.iter().collect();
        }
        let query = self.query.to_lowercase();
        records
            .iter()
            .filter(|r| prefix_match(resolver(*r, &self.field).as_ref(), &query))
            .collect()
    }
}

fn prefix_match(value: Option<&FieldValue>, lowered_query: &str) -> bool {
    value.is_some_and(|v| v.stringify().to_lowercase().starts_with(lowered_query))
}
