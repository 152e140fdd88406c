//! Records and collections.

use crate::error::{ProtocolError, ProtocolResult};
use crate::value::FieldValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Pseudo field name that resolves to a record's identifier.
pub const ID_FIELD: &str = "id";

/// Unique identifier of a record within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates an identifier from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// An opaque record: an identifier plus a map of scalar fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates a record with no fields.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field (builder style).
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns the record identifier.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns a stored field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Resolves a field by name, falling back to the identifier for
    /// [`ID_FIELD`] when no stored field has that name.
    pub fn resolve(&self, name: &str) -> Option<FieldValue> {
        match self.fields.get(name) {
            Some(v) => Some(v.clone()),
            None if name == ID_FIELD => Some(FieldValue::Text(self.id.0.clone())),
            None => None,
        }
    }

    /// Iterates over stored fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Decodes a record from a JSON object.
    ///
    /// `id_field` names the identifier; it must hold a string or a
    /// non-negative integer and is kept as a regular field as well.
    /// Nested objects are flattened into dot-joined names
    /// (`{"play": {"FullName": ..}}` becomes `play.FullName`).
    /// Arrays are rejected.
    pub fn from_json(value: &serde_json::Value, id_field: &str) -> ProtocolResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::invalid_structure("record must be a JSON object"))?;

        let id = match object.get(id_field) {
            Some(serde_json::Value::String(s)) => RecordId::new(s.clone()),
            Some(serde_json::Value::Number(n)) if n.as_u64().is_some() => {
                RecordId::new(n.to_string())
            }
            _ => {
                return Err(ProtocolError::MissingId {
                    field: id_field.to_string(),
                })
            }
        };

        let mut record = Record::new(id);
        flatten_into(&mut record.fields, None, object)?;
        Ok(record)
    }
}

fn flatten_into(
    out: &mut BTreeMap<String, FieldValue>,
    prefix: Option<&str>,
    object: &serde_json::Map<String, serde_json::Value>,
) -> ProtocolResult<()> {
    for (key, value) in object {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            serde_json::Value::Object(inner) => flatten_into(out, Some(&name), inner)?,
            serde_json::Value::Array(_) => {
                return Err(ProtocolError::invalid_structure(format!(
                    "field `{name}` is an array"
                )))
            }
            scalar => {
                if let Some(v) = FieldValue::from_json(scalar) {
                    out.insert(name, v);
                }
            }
        }
    }
    Ok(())
}

/// An ordered, duplicate-free sequence of records produced by one fetch
/// cycle. Collections are immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a collection, keeping the first occurrence of each identifier.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut builder = CollectionBuilder::new();
        builder.extend(records);
        builder.finish()
    }

    /// Decodes a JSON array of record objects.
    pub fn from_json_array(value: &serde_json::Value, id_field: &str) -> ProtocolResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| ProtocolError::invalid_structure("expected a JSON array of records"))?;
        let records = items
            .iter()
            .map(|item| Record::from_json(item, id_field))
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok(Self::from_records(records))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in fetch order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Iterates over records in fetch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Looks up a record by identifier.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    /// Returns true if a record with this identifier exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiers in fetch order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<Record>::deserialize(deserializer)?;
        Ok(Collection::from_records(records))
    }
}

/// Accumulates records into a [`Collection`], dropping repeated identifiers.
#[derive(Debug, Default)]
pub struct CollectionBuilder {
    records: Vec<Record>,
    seen: HashSet<RecordId>,
    duplicates: usize,
}

impl CollectionBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Returns `false` (and drops the record) if its
    /// identifier was already pushed.
    pub fn push(&mut self, record: Record) -> bool {
        if !self.seen.insert(record.id.clone()) {
            self.duplicates += 1;
            return false;
        }
        self.records.push(record);
        true
    }

    /// Appends every record, returning how many were accepted.
    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        records
            .into_iter()
            .map(|r| self.push(r))
            .filter(|accepted| *accepted)
            .count()
    }

    /// Number of accepted records so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records dropped as duplicates.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Finishes the collection.
    pub fn finish(self) -> Collection {
        let index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        Collection {
            records: self.records,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_builder_and_resolve() {
        let record = Record::new(7u64)
            .with_field("setName", "Base Set")
            .with_field("serialNumber", 12i64);

        assert_eq!(record.id().as_str(), "7");
        assert_eq!(record.get("setName"), Some(&FieldValue::from("Base Set")));
        assert_eq!(record.resolve("id"), Some(FieldValue::Text("7".into())));
        assert_eq!(record.resolve("missing"), None);
        assert_eq!(record.field_count(), 2);
    }

    #[test]
    fn stored_id_field_wins_over_pseudo_field() {
        let record = Record::new("a").with_field("id", 99i64);
        assert_eq!(record.resolve("id"), Some(FieldValue::Integer(99)));
    }

    #[test]
    fn from_json_flattens_nested_objects() {
        let value = json!({
            "id": 1001,
            "setName": "Genesis",
            "play": {"FullName": "Zion Williamson", "Team": {"City": "New Orleans"}},
            "price": 12.5,
            "retired": false
        });

        let record = Record::from_json(&value, "id").unwrap();
        assert_eq!(record.id().as_str(), "1001");
        assert_eq!(
            record.get("play.FullName"),
            Some(&FieldValue::from("Zion Williamson"))
        );
        assert_eq!(
            record.get("play.Team.City"),
            Some(&FieldValue::from("New Orleans"))
        );
        assert_eq!(record.get("price"), Some(&FieldValue::Float(12.5)));
        assert_eq!(record.get("id"), Some(&FieldValue::Integer(1001)));
    }

    #[test]
    fn from_json_rejects_bad_shapes() {
        assert!(matches!(
            Record::from_json(&json!({"name": "x"}), "id"),
            Err(ProtocolError::MissingId { .. })
        ));
        assert!(matches!(
            Record::from_json(&json!({"id": -3}), "id"),
            Err(ProtocolError::MissingId { .. })
        ));
        assert!(matches!(
            Record::from_json(&json!({"id": 1, "tags": [1, 2]}), "id"),
            Err(ProtocolError::InvalidStructure(_))
        ));
        assert!(Record::from_json(&json!([1]), "id").is_err());
    }

    #[test]
    fn builder_drops_duplicates_keeping_first() {
        let mut builder = CollectionBuilder::new();
        assert!(builder.push(Record::new(1u64).with_field("v", "first")));
        assert!(builder.push(Record::new(2u64)));
        assert!(!builder.push(Record::new(1u64).with_field("v", "second")));
        assert_eq!(builder.duplicates(), 1);

        let collection = builder.finish();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.get(&RecordId::from(1u64)).unwrap().get("v"),
            Some(&FieldValue::from("first"))
        );
        assert_eq!(collection.ids(), vec![RecordId::from(1u64), RecordId::from(2u64)]);
    }

    #[test]
    fn collection_from_json_array() {
        let value = json!([
            {"playID": 3, "FullName": "A"},
            {"playID": 1, "FullName": "B"},
        ]);
        let collection = Collection::from_json_array(&value, "playID").unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.records()[0].id().as_str(), "3");
        assert!(collection.contains(&RecordId::from(1u64)));
        assert!(!collection.contains(&RecordId::from(2u64)));
    }

    #[test]
    fn empty_collection() {
        let collection = Collection::empty();
        assert!(collection.is_empty());
        assert_eq!(collection.iter().count(), 0);
    }

    #[test]
    fn collection_serializes_as_record_array() {
        let collection = Collection::from_records(vec![Record::new("a").with_field("n", 1i64)]);
        let text = serde_json::to_string(&collection).unwrap();
        assert_eq!(text, r#"[{"id":"a","fields":{"n":1}}]"#);

        let decoded: Collection = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, collection);
    }
}
