mod common;

use async_trait::async_trait;
use bson::{Document, doc, oid::ObjectId};
use futures::{StreamExt, TryStreamExt};
use rstest::rstest;
use std::time::Duration;

use podstore::{
    memory::InMemoryStore,
    podcast::{Episode, Podcast},
    prelude::*,
};

use crate::common::{MemoryGateway, connected_gateway, gateway, polyglot_podcast, quickstart_episodes};

#[rstest]
#[tokio::test]
async fn insert_then_get_round_trips(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();

    let podcast = polyglot_podcast();
    let id = podcasts.insert_one(&podcast).await.unwrap();
    let stored = podcasts.get(id).await.unwrap();

    assert_eq!(stored, Podcast { id: Some(id), ..podcast });
}

#[rstest]
#[tokio::test]
async fn insert_many_preserves_input_order(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();

    let batch = quickstart_episodes(ObjectId::new());
    let ids = episodes.insert_many(&batch).await.unwrap();

    assert_eq!(ids.len(), 2);
    for (id, expected) in ids.iter().zip(&batch) {
        assert_eq!(episodes.get(*id).await.unwrap().title, expected.title);
    }
}

#[rstest]
#[tokio::test]
async fn empty_batch_inserts_nothing(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();

    assert!(episodes.insert_many(&[]).await.unwrap().is_empty());
    assert!(episodes.find_all(Filter::all()).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn equality_filter_selects_exactly_one(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    let filtered = episodes.find_all(Filter::eq("duration", 25)).await.unwrap();

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].title, "GraphQL for API Development");
}

#[rstest]
#[tokio::test]
async fn sorted_read_orders_by_key(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    let sorted = episodes
        .find_sorted(Filter::gt("duration", 22), "duration", SortDirection::Desc)
        .await
        .unwrap();
    let durations = sorted.iter().map(|episode| episode.duration).collect::<Vec<_>>();

    assert_eq!(durations, vec![32, 25]);
}

#[rstest]
#[tokio::test]
async fn query_applies_offset_and_limit(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    let page = episodes
        .query(
            Query::builder()
                .sort("duration", SortDirection::Asc)
                .offset(1)
                .limit(5)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page[0].duration, 32);
}

#[rstest]
#[tokio::test]
async fn update_changes_only_listed_fields(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();
    let id = podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    let outcome = podcasts
        .update_one(Filter::id(id), Changes::new().set("author", "Nicolas Roby"))
        .await
        .unwrap();
    let updated = podcasts.get(id).await.unwrap();

    assert_eq!(outcome, UpdateOutcome { matched_count: 1, modified_count: 1 });
    assert_eq!(updated.author, "Nicolas Roby");
    assert_eq!(updated.title, "The Polyglot Developer Podcast");
    assert_eq!(updated.tags, vec!["development", "programming", "coding"]);
}

#[rstest]
#[tokio::test]
async fn update_without_match_is_not_an_error(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();

    let outcome = podcasts
        .update_one(Filter::id(ObjectId::new()), Changes::new().set("author", "Nobody"))
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::default());
}

#[rstest]
#[tokio::test]
async fn update_rejects_identity_changes(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();
    let id = podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    let result = podcasts
        .update_one(Filter::id(id), Changes::new().set("_id", ObjectId::new()))
        .await;

    assert!(matches!(result, Err(DocumentStoreError::Write(_))));
    assert!(podcasts.get(id).await.is_ok());
}

#[rstest]
#[tokio::test]
async fn replace_drops_absent_fields(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();
    let id = podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    let outcome = podcasts
        .replace_one(
            Filter::eq("title", "The Polyglot Developer Podcast"),
            &Podcast::new("The Sudhakar Nandigam show", "Sudhakar N"),
        )
        .await
        .unwrap();
    let raw = podcasts.untyped().get(id).await.unwrap();

    assert_eq!(outcome.matched_count, 1);
    assert_eq!(raw.get_str("title").unwrap(), "The Sudhakar Nandigam show");
    assert!(!raw.contains_key("tags"));
}

#[rstest]
#[tokio::test]
async fn delete_without_match_returns_zero(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    assert_eq!(episodes.delete_one(Filter::eq("duration", 99)).await.unwrap(), 0);
    assert_eq!(episodes.delete_one(Filter::eq("duration", 25)).await.unwrap(), 1);
    assert_eq!(episodes.find_all(Filter::all()).await.unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn find_one_without_match_is_not_found(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();

    let err = podcasts.find_one(Filter::all()).await.unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, DocumentStoreError::NotFound(ref collection) if collection == "podcasts"));
}

#[rstest]
#[tokio::test]
async fn malformed_filter_fails_at_call_time(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();

    let materialized = episodes.find_all(Filter::starts_with("title", 5)).await;
    let streamed = episodes.find_stream(Filter::any_of("duration", 25)).await;

    assert!(matches!(materialized, Err(DocumentStoreError::Query(_))));
    assert!(matches!(streamed, Err(DocumentStoreError::Query(_))));
}

#[rstest]
#[tokio::test]
async fn stream_yields_the_same_records_as_find_all(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    let materialized = episodes.find_all(Filter::all()).await.unwrap();
    let mut stream = episodes.find_stream(Filter::all()).await.unwrap();

    let mut streamed = Vec::new();
    while let Some(episode) = stream.try_next().await.unwrap() {
        streamed.push(episode);
    }

    assert_eq!(streamed, materialized);
}

#[rstest]
#[tokio::test]
async fn untyped_collection_accepts_optional_fields(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.collection("podcasts");

    let id = podcasts
        .insert_one(doc! { "title": "Untitled", "author": "Anonymous", "rating": 4.5 })
        .await
        .unwrap();
    let typed = gateway.typed_collection::<Podcast>().get(id).await.unwrap();

    assert_eq!(typed.title, "Untitled");
    assert!(typed.tags.is_empty());
}

#[rstest]
#[tokio::test]
async fn every_operation_requires_a_connection(gateway: MemoryGateway) {
    let podcasts = gateway.typed_collection::<Podcast>();
    let filter = Filter::all;

    assert!(!gateway.is_connected().await);
    assert!(matches!(podcasts.insert_one(&polyglot_podcast()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(podcasts.insert_many(&[]).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(podcasts.find_all(filter()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(podcasts.find_stream(filter()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(podcasts.find_one(filter()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(podcasts.get(ObjectId::new()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(
        podcasts.find_sorted(filter(), "title", SortDirection::Asc).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(podcasts.query(Query::new()).await, Err(DocumentStoreError::NotConnected)));
    assert!(matches!(
        podcasts.update_one(filter(), Changes::new().set("author", "x")).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(
        podcasts.replace_one(filter(), &polyglot_podcast()).await,
        Err(DocumentStoreError::NotConnected)
    ));
    assert!(matches!(podcasts.delete_one(filter()).await, Err(DocumentStoreError::NotConnected)));
}

#[rstest]
#[tokio::test]
async fn connect_is_idempotent(gateway: MemoryGateway) {
    gateway.connect().await.unwrap();
    gateway.connect().await.unwrap();

    assert!(gateway.is_connected().await);
}

#[rstest]
#[tokio::test]
async fn reconnect_sees_the_same_data(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let podcasts = gateway.typed_collection::<Podcast>();
    let id = podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    gateway.disconnect().await.unwrap();
    assert!(matches!(podcasts.get(id).await, Err(DocumentStoreError::NotConnected)));

    gateway.connect().await.unwrap();
    assert_eq!(podcasts.get(id).await.unwrap().author, "Nic Raboy");
}

#[rstest]
#[tokio::test]
async fn disconnecting_twice_is_harmless(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;

    gateway.disconnect().await.unwrap();
    gateway.disconnect().await.unwrap();

    assert!(!gateway.is_connected().await);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn disconnect_does_not_wait_for_open_streams(#[future] connected_gateway: MemoryGateway) {
    let gateway = connected_gateway.await;
    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    let mut stream = episodes.find_stream(Filter::all()).await.unwrap();
    stream.try_next().await.unwrap();

    let disconnected = tokio::time::timeout(Duration::from_secs(5), gateway.disconnect()).await;

    assert!(matches!(disconnected, Ok(Ok(()))));
    assert!(!gateway.is_connected().await);
    drop(stream);
}

/// Delegates to an in-memory store, stalling lookups and each stream pull by `delay`.
#[derive(Debug, Clone)]
struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

#[async_trait]
impl StoreBackend for SlowStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_document(&self, document: Document, collection: &str) -> DocumentStoreResult<ObjectId> {
        self.inner.insert_document(document, collection).await
    }

    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<ObjectId>> {
        self.inner.insert_documents(documents, collection).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        self.inner.query_documents(query, collection).await
    }

    async fn stream_documents(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DocumentStream> {
        let delay = self.delay;
        let documents = self.inner.stream_documents(filter, collection).await?;

        // Opening is quick, every pull stalls.
        Ok(documents
            .then(move |document| async move {
                tokio::time::sleep(delay).await;
                document
            })
            .boxed())
    }

    async fn find_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<Option<Document>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_document(filter, collection).await
    }

    async fn update_document(&self, filter: Expr, changes: Changes, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        self.inner.update_document(filter, changes, collection).await
    }

    async fn replace_document(&self, filter: Expr, replacement: Document, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        self.inner.replace_document(filter, replacement, collection).await
    }

    async fn delete_document(&self, filter: Expr, collection: &str) -> DocumentStoreResult<u64> {
        self.inner.delete_document(filter, collection).await
    }
}

struct SlowConnector {
    delay: Duration,
}

#[async_trait]
impl StoreConnector for SlowConnector {
    type Backend = SlowStore;

    async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
        Ok(SlowStore { inner: InMemoryStore::new(), delay: self.delay })
    }
}

#[tokio::test(start_paused = true)]
async fn slow_operations_time_out() {
    let config = GatewayConfig::builder().with_operation_timeout_secs(1).build();
    let gateway = StoreGateway::with_config(SlowConnector { delay: Duration::from_secs(30) }, config);
    gateway.connect().await.unwrap();

    let podcasts = gateway.typed_collection::<Podcast>();
    let id = podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    let result = podcasts.get(id).await;

    assert!(matches!(
        result,
        Err(DocumentStoreError::Timeout { operation: "find_one", timeout }) if timeout == Duration::from_secs(1)
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_stream_pulls_time_out() {
    let config = GatewayConfig::builder().with_operation_timeout_secs(1).build();
    let gateway = StoreGateway::with_config(SlowConnector { delay: Duration::from_secs(30) }, config);
    gateway.connect().await.unwrap();

    let podcasts = gateway.typed_collection::<Podcast>();
    podcasts.insert_one(&polyglot_podcast()).await.unwrap();

    let mut stream = podcasts.find_stream(Filter::all()).await.unwrap();

    assert!(matches!(
        stream.try_next().await,
        Err(DocumentStoreError::Timeout { operation: "find_stream", .. })
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn quick_stream_pulls_are_not_cut_short() {
    let config = GatewayConfig::builder().with_operation_timeout_secs(5).build();
    let gateway = StoreGateway::with_config(SlowConnector { delay: Duration::from_secs(1) }, config);
    gateway.connect().await.unwrap();

    let episodes = gateway.typed_collection::<Episode>();
    episodes.insert_many(&quickstart_episodes(ObjectId::new())).await.unwrap();

    // Two seconds in total, but no single pull reaches the deadline.
    let streamed = episodes
        .find_stream(Filter::all())
        .await
        .unwrap()
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(streamed.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_connect_times_out() {
    struct StalledConnector;

    #[async_trait]
    impl StoreConnector for StalledConnector {
        type Backend = InMemoryStore;

        async fn connect(&self) -> DocumentStoreResult<Self::Backend> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(InMemoryStore::new())
        }
    }

    let config = GatewayConfig::builder().with_connect_timeout_secs(2).build();
    let gateway = StoreGateway::with_config(StalledConnector, config);

    assert!(matches!(gateway.connect().await, Err(DocumentStoreError::Connection(_))));
    assert!(!gateway.is_connected().await);
}
