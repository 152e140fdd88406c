//! Detail lookups for a page of record identifiers.
//!
//! Views page over identifier collections and resolve the details of only
//! the visible identifiers. [`lookup_ids`] issues one lookup per page and
//! returns the records in the order the page listed them.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use ledgerview_protocol::{Collection, Record, RecordId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Resolves record details by identifier.
#[async_trait]
pub trait RecordLookup<K: Sync>: Send + Sync {
    /// Returns the records for `ids` under `key`, in any order. Unknown
    /// identifiers may be omitted.
    async fn lookup(&self, key: &K, ids: &[RecordId]) -> SyncResult<Vec<Record>>;
}

#[async_trait]
impl<K: Sync> RecordLookup<K> for Collection {
    async fn lookup(&self, _key: &K, ids: &[RecordId]) -> SyncResult<Vec<Record>> {
        Ok(ids.iter().filter_map(|id| self.get(id)).cloned().collect())
    }
}

#[async_trait]
impl<K, L> RecordLookup<K> for Arc<L>
where
    K: Sync,
    L: RecordLookup<K> + ?Sized,
{
    async fn lookup(&self, key: &K, ids: &[RecordId]) -> SyncResult<Vec<Record>> {
        (**self).lookup(key, ids).await
    }
}

/// Resolves `ids` and returns them as a collection in request order.
///
/// An empty id list resolves to an empty collection without calling the
/// lookup. Repeated ids are resolved once. An id the lookup did not return
/// fails the whole call with [`SyncError::NotFound`].
pub async fn lookup_ids<K, L>(lookup: &L, key: &K, ids: &[RecordId]) -> SyncResult<Collection>
where
    K: fmt::Display + Sync,
    L: RecordLookup<K> + ?Sized,
{
    if ids.is_empty() {
        return Ok(Collection::empty());
    }

    let mut found: HashMap<RecordId, Record> = lookup
        .lookup(key, ids)
        .await?
        .into_iter()
        .map(|r| (r.id().clone(), r))
        .collect();

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            continue;
        }
        let record = found
            .remove(id)
            .ok_or_else(|| SyncError::not_found(format!("{key}/{id}")))?;
        records.push(record);
    }

    tracing::trace!(%key, requested = ids.len(), resolved = records.len(), "ids resolved");
    Ok(Collection::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        inner: Collection,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordLookup<String> for CountingLookup {
        async fn lookup(&self, key: &String, ids: &[RecordId]) -> SyncResult<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // answer in reverse to check reordering
            let mut records = self.inner.lookup(key, ids).await?;
            records.reverse();
            Ok(records)
        }
    }

    fn lookup() -> CountingLookup {
        CountingLookup {
            inner: Collection::from_records(
                (1u64..=5).map(|i| Record::new(i).with_field("serial", i)),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    fn ids(raw: &[u64]) -> Vec<RecordId> {
        raw.iter().copied().map(RecordId::from).collect()
    }

    #[tokio::test]
    async fn empty_ids_skip_lookup() {
        let lookup = lookup();
        let result = lookup_ids(&lookup, &"0x01".to_string(), &[]).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn results_follow_request_order() {
        let lookup = lookup();
        let result = lookup_ids(&lookup, &"0x01".to_string(), &ids(&[4, 2, 5]))
            .await
            .unwrap();
        assert_eq!(result.ids(), ids(&[4, 2, 5]));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_ids_resolve_once() {
        let lookup = lookup();
        let result = lookup_ids(&lookup, &"0x01".to_string(), &ids(&[3, 3, 1]))
            .await
            .unwrap();
        assert_eq!(result.ids(), ids(&[3, 1]));
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let lookup = lookup();
        let err = lookup_ids(&lookup, &"0x01".to_string(), &ids(&[1, 9]))
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::not_found("0x01/9"));
    }

    #[tokio::test]
    async fn shared_collection_lookup() {
        let shared: Arc<Collection> = Arc::new(lookup().inner);
        let result = lookup_ids(&shared, &"set-26", &ids(&[2])).await.unwrap();
        assert_eq!(result.len(), 1);
    }
}
