//! Chunked collection loading.

use crate::config::LoaderConfig;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::RangeFetcher;
use async_trait::async_trait;
use ledgerview_protocol::{Collection, CollectionBuilder, RangeCursor, Record};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Outcome of one complete chunked load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// The assembled collection, in chunk order.
    pub collection: Collection,
    /// Number of range queries issued.
    pub chunks: u32,
    /// Records dropped because their identifier was already seen.
    pub duplicates: usize,
}

/// Walks a remote collection in fixed-size ranges until the remote signals
/// completion, concatenating every page into one collection.
///
/// Chunks are requested strictly one after another: chunk `n + 1` is only
/// issued after chunk `n` resolved without error. Any chunk failure fails
/// the whole load and the partial result is discarded.
pub struct ChunkedCollectionLoader<F> {
    fetcher: F,
    config: LoaderConfig,
}

impl<F> ChunkedCollectionLoader<F> {
    /// Creates a loader, validating `config`.
    pub fn new(fetcher: F, config: LoaderConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self { fetcher, config })
    }

    /// Returns the loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Returns the underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<F> ChunkedCollectionLoader<F> {
    /// Loads the full collection for `key`.
    pub async fn load<K>(&self, key: &K) -> SyncResult<Collection>
    where
        K: fmt::Debug + Sync,
        F: RangeFetcher<K>,
    {
        self.load_with_report(key).await.map(|r| r.collection)
    }

    /// Loads the full collection for `key`, reporting chunk statistics.
    pub async fn load_with_report<K>(&self, key: &K) -> SyncResult<LoadReport>
    where
        K: fmt::Debug + Sync,
        F: RangeFetcher<K>,
    {
        let mut cursor = RangeCursor::first(self.config.start_offset, self.config.chunk_size)?;
        let mut builder = CollectionBuilder::new();
        let mut chunks: u32 = 0;

        loop {
            if let Some(max) = self.config.max_chunks {
                if chunks >= max {
                    tracing::warn!(?key, chunks, "remote never signalled completion");
                    return Err(SyncError::ChunkLimitExceeded { chunks });
                }
            }

            let page = self
                .fetcher
                .fetch_range(key, cursor)
                .await
                .inspect_err(|e| {
                    tracing::debug!(?key, start = cursor.start(), error = %e, "chunk failed");
                })?;
            chunks += 1;

            let received = page.records.len();
            let accepted = builder.extend(page.records);
            if accepted < received {
                tracing::warn!(
                    ?key,
                    start = cursor.start(),
                    dropped = received - accepted,
                    "dropped records with duplicate ids"
                );
            }
            tracing::debug!(
                ?key,
                start = cursor.start(),
                end = cursor.end(),
                received,
                complete = page.is_complete,
                "chunk loaded"
            );

            if page.is_complete {
                break;
            }
            cursor = cursor.advance()?;
        }

        let duplicates = builder.duplicates();
        let collection = builder.finish();
        tracing::debug!(?key, records = collection.len(), chunks, "collection loaded");

        Ok(LoadReport {
            collection,
            chunks,
            duplicates,
        })
    }
}

/// Anything that can produce a complete collection for a key.
///
/// A [`crate::SyncedEntity`] polls a source; the chunked loader is the usual
/// one, but single-shot queries plug in through [`FnSource`].
#[async_trait]
pub trait CollectionSource<K: Sync>: Send + Sync {
    /// Fetches the complete collection for `key`.
    async fn fetch_collection(&self, key: &K) -> SyncResult<Collection>;
}

#[async_trait]
impl<K, F> CollectionSource<K> for ChunkedCollectionLoader<F>
where
    K: fmt::Debug + Sync,
    F: RangeFetcher<K>,
{
    async fn fetch_collection(&self, key: &K) -> SyncResult<Collection> {
        self.load(key).await
    }
}

#[async_trait]
impl<K, S> CollectionSource<K> for Arc<S>
where
    K: Sync,
    S: CollectionSource<K> + ?Sized,
{
    async fn fetch_collection(&self, key: &K) -> SyncResult<Collection> {
        (**self).fetch_collection(key).await
    }
}

/// A [`CollectionSource`] backed by an async closure returning records.
pub struct FnSource<F> {
    f: F,
}

impl<F> FnSource<F> {
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<K, F, Fut> CollectionSource<K> for FnSource<F>
where
    K: Clone + Send + Sync + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = SyncResult<Vec<Record>>> + Send + 'static,
{
    async fn fetch_collection(&self, key: &K) -> SyncResult<Collection> {
        let records = (self.f)(key.clone()).await?;
        Ok(Collection::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockRangeFetcher;
    use ledgerview_protocol::{RangePage, RecordId};
    use proptest::prelude::*;

    fn records(n: u64) -> Vec<Record> {
        (0..n).map(|i| Record::new(i).with_field("n", i)).collect()
    }

    fn loader(records: Vec<Record>, chunk: u64) -> ChunkedCollectionLoader<MockRangeFetcher> {
        ChunkedCollectionLoader::new(MockRangeFetcher::new(records), LoaderConfig::new(chunk))
            .unwrap()
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let result = ChunkedCollectionLoader::new(MockRangeFetcher::default(), LoaderConfig::new(0));
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn complete_on_first_chunk() {
        let loader = loader(records(5), 3000);
        let collection = loader.load(&"0x01").await.unwrap();

        assert_eq!(collection.len(), 5);
        assert_eq!(loader.fetcher().call_count(), 1);
    }

    #[tokio::test]
    async fn walks_chunks_in_order() {
        let loader = loader(records(25), 10);
        let report = loader.load_with_report(&"0x01").await.unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.collection.len(), 25);
        let bounds: Vec<_> = loader
            .fetcher()
            .calls()
            .iter()
            .map(|c| (c.start(), c.end()))
            .collect();
        assert_eq!(bounds, vec![(0, 10), (10, 20), (20, 30)]);
        assert_eq!(report.collection.records()[24].id(), &RecordId::from(24u64));
    }

    #[tokio::test]
    async fn empty_collection() {
        let loader = loader(Vec::new(), 10);
        let collection = loader.load(&"0x01").await.unwrap();
        assert!(collection.is_empty());
        assert_eq!(loader.fetcher().call_count(), 1);
    }

    #[tokio::test]
    async fn start_offset_shifts_first_range() {
        let loader = ChunkedCollectionLoader::new(
            MockRangeFetcher::new(records(4)),
            LoaderConfig::new(2).with_start_offset(1),
        )
        .unwrap();
        let collection = loader.load(&"0x01").await.unwrap();

        assert_eq!(collection.len(), 3);
        assert_eq!(loader.fetcher().calls()[0].start(), 1);
    }

    #[tokio::test]
    async fn failure_on_later_chunk_fails_load() {
        let loader = loader(records(25), 10);
        loader
            .fetcher()
            .fail_on_call(1, SyncError::transport_retryable("timeout"));

        let result = loader.load(&"0x01").await;
        assert!(matches!(result, Err(SyncError::Transport { .. })));
        assert_eq!(loader.fetcher().call_count(), 2);
    }

    #[tokio::test]
    async fn chunk_cap_stops_endless_remote() {
        struct Endless;

        #[async_trait]
        impl RangeFetcher<&'static str> for Endless {
            async fn fetch_range(
                &self,
                _key: &&'static str,
                cursor: RangeCursor,
            ) -> SyncResult<RangePage> {
                Ok(RangePage::partial(vec![Record::new(cursor.start())]))
            }
        }

        let loader =
            ChunkedCollectionLoader::new(Endless, LoaderConfig::new(1).with_max_chunks(4)).unwrap();
        let result = loader.load(&"0x01").await;
        assert_eq!(result, Err(SyncError::ChunkLimitExceeded { chunks: 4 }));
    }

    #[tokio::test]
    async fn duplicates_across_chunks_are_dropped() {
        let mut served = records(4);
        served.push(Record::new(1u64).with_field("n", 99u64));
        let loader = loader(served, 2);

        let report = loader.load_with_report(&"0x01").await.unwrap();
        assert_eq!(report.collection.len(), 4);
        assert_eq!(report.duplicates, 1);
        let first = report.collection.get(&RecordId::from(1u64)).unwrap();
        assert_eq!(first.get("n"), Some(&1u64.into()));
    }

    #[tokio::test]
    async fn fn_source_builds_collection() {
        let source = FnSource::new(|key: String| async move {
            Ok(vec![Record::new(key.as_str()), Record::new("other")])
        });
        let collection = source.fetch_collection(&"self".to_string()).await.unwrap();
        assert_eq!(collection.ids(), vec![RecordId::from("self"), RecordId::from("other")]);
    }

    #[tokio::test]
    async fn loader_as_shared_source() {
        let source: Arc<dyn CollectionSource<&'static str>> = Arc::new(loader(records(7), 3));
        let collection = source.fetch_collection(&"0x01").await.unwrap();
        assert_eq!(collection.len(), 7);
    }

    proptest! {
        #[test]
        fn load_returns_every_record_in_order(n in 0u64..200, chunk in 1u64..64) {
            let loader = loader(records(n), chunk);
            let collection = runtime().block_on(loader.load(&"k")).unwrap();

            prop_assert_eq!(collection.len() as u64, n);
            let expected: Vec<RecordId> = (0..n).map(RecordId::from).collect();
            prop_assert_eq!(collection.ids(), expected);
            let expected_calls = if n == 0 { 1 } else { n.div_ceil(chunk) };
            prop_assert_eq!(loader.fetcher().call_count() as u64, expected_calls);
        }
    }
}
