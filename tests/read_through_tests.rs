//! Integration Tests for the Read-Through Repository
//!
//! Drives `EntityRepository` against a counting data source to check when
//! queries reach the source and when they are served from cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use entity_cache::cache::{CacheKey, CacheStore, ManualClock, MemoryBackend};
use entity_cache::repository::{
    DataSource, EntityDescriptor, EntityRepository, FetchMode, FilterSpec, MemoryDataSource,
    Operator, Record, GET_BY_PARAMS,
};
use entity_cache::{CacheBackend, RepoError, Result, TtlPolicy};
use serde_json::{json, Value};

// == Helpers ==

/// Wraps a memory source and counts query executions.
#[derive(Default)]
struct CountingSource {
    inner: MemoryDataSource,
    executions: AtomicUsize,
}

impl CountingSource {
    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for CountingSource {
    async fn find(&self, entity: &EntityDescriptor, id: i64) -> Result<Option<Record>> {
        self.inner.find(entity, id).await
    }

    async fn find_one(&self, entity: &EntityDescriptor, criteria: &Record) -> Result<Option<Record>> {
        self.inner.find_one(entity, criteria).await
    }

    async fn execute(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        mode: FetchMode,
    ) -> Result<Vec<Record>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(entity, filter, mode).await
    }

    async fn count(&self, entity: &EntityDescriptor) -> Result<u64> {
        self.inner.count(entity).await
    }

    async fn persist(&self, entity: &EntityDescriptor, record: Record) -> Result<i64> {
        self.inner.persist(entity, record).await
    }

    async fn merge(
        &self,
        entity: &EntityDescriptor,
        id: i64,
        values: &Record,
    ) -> Result<Option<i64>> {
        self.inner.merge(entity, id, values).await
    }

    async fn remove(&self, entity: &EntityDescriptor, id: i64) -> Result<bool> {
        self.inner.remove(entity, id).await
    }

    async fn execute_update(
        &self,
        entity: &EntityDescriptor,
        filter: &FilterSpec,
        values: &Record,
    ) -> Result<u64> {
        self.inner.execute_update(entity, filter, values).await
    }
}

/// A cache backend whose connection is always down.
struct UnavailableBackend;

#[async_trait]
impl CacheBackend for UnavailableBackend {
    async fn save(&self, _key: &CacheKey, _value: String, _ttl_secs: u64) -> Result<()> {
        Err(RepoError::StoreUnavailable("connection lost".into()))
    }

    async fn contains(&self, _key: &CacheKey) -> Result<bool> {
        Err(RepoError::StoreUnavailable("connection lost".into()))
    }

    async fn fetch(&self, _key: &CacheKey) -> Result<Option<String>> {
        Err(RepoError::StoreUnavailable("connection lost".into()))
    }

    async fn delete(&self, _key: &CacheKey) -> Result<()> {
        Err(RepoError::StoreUnavailable("connection lost".into()))
    }
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn entity() -> EntityDescriptor {
    EntityDescriptor::new("Entity").unwrap()
}

struct Fixture {
    repo: EntityRepository,
    source: Arc<CountingSource>,
    clock: Arc<ManualClock>,
}

async fn fixture(policy: TtlPolicy) -> Fixture {
    let source = Arc::new(CountingSource::default());
    let rows = (1..=15).map(|n| {
        let status = if n % 3 == 0 { "inactive" } else { "active" };
        record(json!({"name": format!("user{}", n), "status": status}))
    });
    source.inner.seed(&entity(), rows).await.unwrap();

    let clock = Arc::new(ManualClock::new(0));
    let backend = MemoryBackend::new(CacheStore::with_clock(1000, clock.clone()));
    let repo = EntityRepository::new(entity(), source.clone(), Arc::new(backend), policy);

    Fixture { repo, source, clock }
}

fn active(limit: usize) -> FilterSpec {
    FilterSpec::new()
        .filter("status", Operator::Eq, json!("active"))
        .unwrap()
        .limit(limit)
}

// == Read-Through Behaviour ==

#[tokio::test]
async fn test_second_identical_call_served_from_cache() {
    let f = fixture(TtlPolicy::default()).await;

    let first = f.repo.get_by_params(&active(10), false).await.unwrap().unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(f.source.executions(), 1);

    let second = f.repo.get_by_params(&active(10), false).await.unwrap().unwrap();
    assert_eq!(second, first);
    assert_eq!(f.source.executions(), 1);
}

#[tokio::test]
async fn test_different_limit_is_distinct_key() {
    let f = fixture(TtlPolicy::default()).await;

    f.repo.get_by_params(&active(10), false).await.unwrap();
    let wider = f.repo.get_by_params(&active(20), false).await.unwrap().unwrap();

    assert_eq!(wider.len(), 10, "only 10 active rows exist");
    assert_eq!(f.source.executions(), 2);

    let key_10 = f.repo.cache().compute_key(GET_BY_PARAMS, &[&active(10), &false]);
    let key_20 = f.repo.cache().compute_key(GET_BY_PARAMS, &[&active(20), &false]);
    assert_ne!(key_10, key_20);
}

#[tokio::test]
async fn test_mapping_and_builder_share_cache_entry() {
    let f = fixture(TtlPolicy::default()).await;

    f.repo.get_by_params(&active(10), false).await.unwrap();

    let parsed = FilterSpec::try_from(&json!({
        "status": {"operator": "eq", "value": "active"},
        "limit": 10
    }))
    .unwrap();
    f.repo.get_by_params(&parsed, false).await.unwrap();

    assert_eq!(f.source.executions(), 1);
}

#[tokio::test]
async fn test_empty_result_not_cached() {
    let f = fixture(TtlPolicy::default()).await;
    let banned = FilterSpec::new()
        .filter("status", Operator::Eq, json!("banned"))
        .unwrap();

    assert!(f.repo.get_by_params(&banned, false).await.unwrap().is_none());
    assert!(f.repo.get_by_params(&banned, false).await.unwrap().is_none());
    assert_eq!(f.source.executions(), 2);

    // a write that produces data is visible on the next read
    f.repo
        .create(record(json!({"name": "late", "status": "banned"})))
        .await
        .unwrap();
    let rows = f.repo.get_by_params(&banned, false).await.unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(f.source.executions(), 3);
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let f = fixture(TtlPolicy::new(1800).with_method(GET_BY_PARAMS, 60)).await;

    f.repo.get_by_params(&active(5), false).await.unwrap();
    f.clock.advance_secs(59);
    f.repo.get_by_params(&active(5), false).await.unwrap();
    assert_eq!(f.source.executions(), 1);

    f.clock.advance_secs(1);
    f.repo.get_by_params(&active(5), false).await.unwrap();
    assert_eq!(f.source.executions(), 2);
}

#[tokio::test]
async fn test_default_ttl_applies_without_entry() {
    let f = fixture(TtlPolicy::default()).await;

    f.repo.get_by_params(&active(5), false).await.unwrap();
    f.clock.advance_secs(1799);
    f.repo.get_by_params(&active(5), false).await.unwrap();
    assert_eq!(f.source.executions(), 1);

    f.clock.advance_secs(1);
    f.repo.get_by_params(&active(5), false).await.unwrap();
    assert_eq!(f.source.executions(), 2);
}

#[tokio::test]
async fn test_cached_results_survive_writes_until_invalidated() {
    let f = fixture(TtlPolicy::default()).await;

    let before = f.repo.get_by_params(&active(50), false).await.unwrap().unwrap();
    f.repo
        .create(record(json!({"name": "new", "status": "active"})))
        .await
        .unwrap();

    let cached = f.repo.get_by_params(&active(50), false).await.unwrap().unwrap();
    assert_eq!(cached.len(), before.len());

    f.repo.invalidate_get_by_params(&active(50), false).await;
    let fresh = f.repo.get_by_params(&active(50), false).await.unwrap().unwrap();
    assert_eq!(fresh.len(), before.len() + 1);
    assert_eq!(f.source.executions(), 2);
}

#[tokio::test]
async fn test_backend_outage_falls_through_to_source() {
    let source = Arc::new(CountingSource::default());
    source
        .inner
        .seed(&entity(), vec![record(json!({"status": "active"}))])
        .await
        .unwrap();
    let repo = EntityRepository::new(
        entity(),
        source.clone(),
        Arc::new(UnavailableBackend),
        TtlPolicy::default(),
    );

    for _ in 0..3 {
        let rows = repo.get_by_params(&active(10), false).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
    }
    assert_eq!(source.executions(), 3);

    repo.invalidate_get_by_params(&active(10), false).await;
}

// == CRUD Surface ==

#[tokio::test]
async fn test_update_existing_and_missing() {
    let f = fixture(TtlPolicy::default()).await;

    assert_eq!(f.repo.update(5, &record(json!({"name": "x"}))).await.unwrap(), Some(5));
    assert_eq!(f.repo.update(500, &record(json!({"name": "x"}))).await.unwrap(), None);

    let row = f.repo.select(&record(json!({"id": 5}))).await.unwrap().unwrap();
    assert_eq!(row["name"], json!("x"));
}

#[tokio::test]
async fn test_create_assigns_positive_id() {
    let f = fixture(TtlPolicy::default()).await;

    let id = f.repo.create(record(json!({"name": "y"}))).await.unwrap();
    assert!(id > 0);
    assert_eq!(f.repo.get_count().await.unwrap(), 16);
}

#[tokio::test]
async fn test_update_by_params_and_delete() {
    let f = fixture(TtlPolicy::default()).await;
    let inactive = FilterSpec::new()
        .filter("status", Operator::Eq, json!("inactive"))
        .unwrap();

    assert!(f
        .repo
        .update_by_params(&inactive, &record(json!({"status": "archived"})))
        .await
        .unwrap());
    assert!(f.repo.get_by_params(&inactive, false).await.unwrap().is_none());

    assert!(f.repo.delete(3).await.unwrap());
    assert!(!f.repo.delete(3).await.unwrap());
    assert_eq!(f.repo.get_count().await.unwrap(), 14);
}
