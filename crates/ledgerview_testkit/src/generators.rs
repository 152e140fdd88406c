//! Property-based test generators using proptest.
//!
//! Strategies produce records with unique identifiers and a fixed set of
//! field names, so filters and sorts generated alongside them have
//! something to match.

use ledgerview_protocol::{FieldValue, Record, RecordId};
use proptest::prelude::*;
use std::collections::HashSet;

/// Field names used by generated records.
pub const FIELD_NAMES: &[&str] = &["setName", "serialNumber", "play.FullName", "flag"];

/// Strategy for record identifiers.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    prop_oneof![
        (0u64..10_000).prop_map(RecordId::from),
        "0x[0-9a-f]{1,8}".prop_map(RecordId::new),
    ]
}

/// Strategy for scalar field values.
pub fn field_value_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        1 => Just(FieldValue::Null),
        1 => any::<bool>().prop_map(FieldValue::Bool),
        3 => (-1_000i64..1_000).prop_map(FieldValue::Integer),
        1 => (-1e6f64..1e6).prop_map(FieldValue::Float),
        4 => "[A-Za-z ]{0,12}".prop_map(FieldValue::Text),
    ]
}

/// Strategy for a record with the given id and a subset of
/// [`FIELD_NAMES`].
pub fn record_strategy(id: RecordId) -> impl Strategy<Value = Record> {
    prop::collection::vec(
        (prop::sample::select(FIELD_NAMES), field_value_strategy()),
        0..FIELD_NAMES.len(),
    )
    .prop_map(move |fields| {
        fields
            .into_iter()
            .fold(Record::new(id.clone()), |record, (name, value)| {
                record.with_field(name, value)
            })
    })
}

/// Strategy for a list of records with unique identifiers.
pub fn records_strategy(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_id_strategy(), 0..=max_len)
        .prop_map(|ids| {
            let mut seen = HashSet::new();
            ids.into_iter()
                .filter(|id| seen.insert(id.clone()))
                .collect::<Vec<_>>()
        })
        .prop_flat_map(|ids| {
            ids.into_iter()
                .map(record_strategy)
                .collect::<Vec<_>>()
        })
}

/// Strategy for a list of records that may repeat identifiers, as a
/// misbehaving remote might return them.
pub fn records_with_duplicates_strategy(max_len: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(0u64..(max_len as u64 / 2).max(1), 0..=max_len)
        .prop_map(|ids| ids.into_iter().map(Record::new).collect::<Vec<Record>>())
}

/// Strategy for a filter field and query.
pub fn filter_strategy() -> impl Strategy<Value = (String, String)> {
    (
        prop::sample::select(FIELD_NAMES).prop_map(str::to_string),
        "[A-Za-z0-9]{0,3}",
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_ids_are_unique(records in records_strategy(40)) {
            let ids: HashSet<_> = records.iter().map(|r| r.id().clone()).collect();
            prop_assert_eq!(ids.len(), records.len());
        }

        #[test]
        fn generated_fields_are_known(record in record_strategy(RecordId::from(1u64))) {
            for (name, _) in record.fields() {
                prop_assert!(FIELD_NAMES.contains(&name));
            }
        }

        #[test]
        fn duplicate_strategy_repeats_ids(records in records_with_duplicates_strategy(20)) {
            prop_assert!(records.len() <= 20);
        }
    }
}
