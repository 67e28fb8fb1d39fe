//! Query cache with tag-based invalidation.
//!
//! Every query result is cached under a [`QueryKey`] (endpoint name plus
//! canonical JSON of its arguments) together with the [`Tag`]s it provides.
//! A successful mutation invalidates tags; matching entries are marked stale
//! and the invalidation is broadcast so live observers refetch.
//!
//! # Ordering
//!
//! Each fetch takes a sequence number when it is dispatched. A response only
//! replaces an entry whose sequence is not newer, so the latest-issued
//! successful response for a key wins even when responses land out of order.
//! Marking an entry stale stamps it with a fresh sequence, which also keeps
//! responses dispatched before the invalidation from resurrecting old data.
//! Invalidation and optimistic patches only write over the entry they read.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bazaar_core::PageMeta;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ApiError;

const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

/// Entity families that queries provide and mutations invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Profile,
    Shop,
    Category,
    Product,
    Order,
    Coupon,
    Chat,
    Message,
    Wishlist,
    Dashboard,
}

/// A cache tag: a whole entity family, or one entity in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<String>,
}

impl Tag {
    /// Tag for a whole family (list queries provide this).
    #[must_use]
    pub const fn list(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// Tag for one entity.
    #[must_use]
    pub fn id(kind: TagKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    /// Whether invalidating `self` makes a query that provided `provided` stale.
    ///
    /// A family tag matches every tag of its kind. An entity tag matches the
    /// same entity and any family tag of its kind, since lists contain it.
    #[must_use]
    pub fn matches(&self, provided: &Self) -> bool {
        self.kind == provided.kind
            && (self.id.is_none() || provided.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{:?}:{id}", self.kind),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

/// Identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub endpoint: &'static str,
    pub args: String,
}

impl QueryKey {
    /// Build a key from an endpoint name and its arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments cannot be serialised.
    pub fn new<A: Serialize + ?Sized>(endpoint: &'static str, args: &A) -> Result<Self, ApiError> {
        let args = serde_json::to_string(args)
            .map_err(|e| ApiError::InvalidRequest(format!("unserialisable query args: {e}")))?;
        Ok(Self { endpoint, args })
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Type-erased cached value.
pub type CachedData = Arc<dyn Any + Send + Sync>;

/// A cached query result.
#[derive(Clone)]
pub struct CacheEntry {
    pub data: CachedData,
    pub meta: Option<PageMeta>,
    pub tags: Arc<[Tag]>,
    pub seq: u64,
    pub stale: bool,
}

impl CacheEntry {
    #[must_use]
    pub fn new<T: Any + Send + Sync>(data: T, tags: Vec<Tag>, seq: u64) -> Self {
        Self {
            data: Arc::new(data),
            meta: None,
            tags: tags.into(),
            seq,
            stale: false,
        }
    }

    /// The cached value, if it has type `T`.
    #[must_use]
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.data.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("tags", &self.tags)
            .field("seq", &self.seq)
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

/// Shared query cache. Cheap to clone.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<QueryKey, CacheEntry>,
    seq: Arc<AtomicU64>,
    invalidations: broadcast::Sender<Arc<[Tag]>>,
    updates: broadcast::Sender<QueryKey>,
}

impl QueryCache {
    /// Create a cache holding at most `capacity` results for `ttl` each.
    #[must_use]
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);

        Self {
            entries,
            seq: Arc::new(AtomicU64::new(0)),
            invalidations,
            updates,
        }
    }

    /// Take the next dispatch sequence number.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fresh (not stale) entry for `key`.
    pub async fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).await.filter(|e| !e.stale)
    }

    /// Entry for `key` even if stale.
    pub async fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).await
    }

    /// Store `entry` unless a newer one is already cached.
    ///
    /// Returns whether the entry was stored.
    pub async fn insert(&self, key: QueryKey, entry: CacheEntry) -> bool {
        let seq = entry.seq;
        let result = self
            .entries
            .entry(key)
            .and_compute_with(move |existing| {
                let newer_cached = existing.is_some_and(|e| e.value().seq > entry.seq);
                std::future::ready(if newer_cached {
                    Op::Nop
                } else {
                    Op::Put(entry)
                })
            })
            .await;

        let stored = matches!(
            result,
            CompResult::Inserted(_) | CompResult::ReplacedWith(_)
        );
        if !stored {
            debug!(seq, "Discarded out-of-order response");
        }
        stored
    }

    /// Mark every entry providing a tag that matches `tags` as stale and
    /// notify observers.
    ///
    /// Returns the number of entries marked.
    pub async fn invalidate_tags(&self, tags: &[Tag]) -> usize {
        if tags.is_empty() {
            return 0;
        }

        let floor = self.next_seq();
        let matching: Vec<(Arc<QueryKey>, CacheEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                !entry.stale
                    && entry
                        .tags
                        .iter()
                        .any(|provided| tags.iter().any(|t| t.matches(provided)))
            })
            .collect();

        let mut marked = 0;
        for (key, entry) in matching {
            if self.mark_stale(QueryKey::clone(&key), entry.seq, floor).await {
                marked += 1;
            }
        }

        debug!(
            tags = %tags.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            marked,
            "Invalidated cache tags"
        );

        // No receivers just means nothing is being observed.
        let _ = self.invalidations.send(tags.into());
        marked
    }

    /// Mark the entry for `key` stale if it still carries `read_seq`.
    async fn mark_stale(&self, key: QueryKey, read_seq: u64, floor: u64) -> bool {
        let result = self
            .entries
            .entry(key)
            .and_compute_with(move |current| {
                std::future::ready(match current {
                    Some(current) if current.value().seq == read_seq => {
                        let current = current.into_value();
                        Op::Put(CacheEntry {
                            stale: true,
                            seq: floor.max(current.seq),
                            ..current
                        })
                    }
                    _ => Op::Nop,
                })
            })
            .await;
        matches!(result, CompResult::ReplacedWith(_))
    }

    /// Subscribe to invalidation broadcasts.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<[Tag]>> {
        self.invalidations.subscribe()
    }

    /// Replace the cached value for `key` in place, returning a handle that
    /// can roll the change back.
    ///
    /// Returns `None` if nothing is cached, the value is not a `T`, or another
    /// write replaced the entry while `f` ran.
    pub async fn patch<T, F>(&self, key: &QueryKey, f: F) -> Option<PatchHandle>
    where
        T: Any + Clone + Send + Sync,
        F: FnOnce(&mut T),
    {
        let entry = self.entries.get(key).await?;
        let mut value = entry.downcast::<T>()?;
        f(&mut value);

        let read_seq = entry.seq;
        let data: CachedData = Arc::new(value);
        let result = self
            .entries
            .entry(key.clone())
            .and_compute_with(move |current| {
                std::future::ready(match current {
                    Some(current) if current.value().seq == read_seq => Op::Put(CacheEntry {
                        data,
                        ..current.into_value()
                    }),
                    _ => Op::Nop,
                })
            })
            .await;
        if !matches!(result, CompResult::ReplacedWith(_)) {
            debug!(%key, "Skipped patch of a replaced entry");
            return None;
        }
        self.notify_updated(key);

        Some(PatchHandle {
            cache: self.clone(),
            key: key.clone(),
            previous: entry.data,
            seq: read_seq,
        })
    }

    /// Subscribe to in-place updates made by [`QueryCache::patch`] and
    /// [`PatchHandle::undo`].
    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<QueryKey> {
        self.updates.subscribe()
    }

    fn notify_updated(&self, key: &QueryKey) {
        let _ = self.updates.send(key.clone());
    }

    /// Drop every entry (e.g., on logout).
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Number of entries, including stale ones.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

/// Handle to an optimistic cache patch.
#[must_use = "dropping the handle makes the patch permanent"]
pub struct PatchHandle {
    cache: QueryCache,
    key: QueryKey,
    previous: CachedData,
    seq: u64,
}

impl PatchHandle {
    /// Restore the value from before the patch.
    ///
    /// Does nothing if a newer response or an invalidation has replaced the
    /// entry since.
    pub async fn undo(self) {
        let previous = self.previous;
        let seq = self.seq;
        let result = self
            .cache
            .entries
            .entry(self.key.clone())
            .and_compute_with(move |existing| {
                std::future::ready(match existing {
                    Some(current) if current.value().seq == seq && !current.value().stale => {
                        Op::Put(CacheEntry {
                            data: previous,
                            ..current.into_value()
                        })
                    }
                    _ => Op::Nop,
                })
            })
            .await;
        if matches!(result, CompResult::ReplacedWith(_)) {
            self.cache.notify_updated(&self.key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cache() -> QueryCache {
        QueryCache::new(100, Duration::from_secs(60))
    }

    fn key(name: &'static str) -> QueryKey {
        QueryKey::new(name, &()).unwrap()
    }

    #[test]
    fn test_tag_matching() {
        let list = Tag::list(TagKind::Product);
        let p1 = Tag::id(TagKind::Product, "p1");
        let p2 = Tag::id(TagKind::Product, "p2");
        let order = Tag::list(TagKind::Order);

        assert!(list.matches(&p1));
        assert!(p1.matches(&list));
        assert!(p1.matches(&p1));
        assert!(!p1.matches(&p2));
        assert!(!order.matches(&p1));
    }

    #[test]
    fn test_query_key_canonical() {
        #[derive(Serialize)]
        struct Args {
            page: u32,
        }
        let a = QueryKey::new("products", &Args { page: 1 }).unwrap();
        let b = QueryKey::new("products", &Args { page: 1 }).unwrap();
        let c = QueryKey::new("products", &Args { page: 2 }).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), r#"products({"page":1})"#);
    }

    #[tokio::test]
    async fn test_older_response_does_not_replace_newer() {
        let cache = cache();
        let k = key("products");
        assert!(cache.insert(k.clone(), CacheEntry::new(2_u32, vec![], 2)).await);
        assert!(!cache.insert(k.clone(), CacheEntry::new(1_u32, vec![], 1)).await);
        assert_eq!(cache.get(&k).await.unwrap().downcast::<u32>(), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_marks_matching_stale() {
        let cache = cache();
        let products = key("products");
        let orders = key("orders");
        cache
            .insert(
                products.clone(),
                CacheEntry::new(1_u32, vec![Tag::list(TagKind::Product)], cache.next_seq()),
            )
            .await;
        cache
            .insert(
                orders.clone(),
                CacheEntry::new(1_u32, vec![Tag::list(TagKind::Order)], cache.next_seq()),
            )
            .await;

        let mut rx = cache.subscribe();
        let marked = cache
            .invalidate_tags(&[Tag::id(TagKind::Product, "p1")])
            .await;

        assert_eq!(marked, 1);
        assert!(cache.get(&products).await.is_none());
        assert!(cache.peek(&products).await.unwrap().stale);
        assert!(cache.get(&orders).await.is_some());
        let broadcast = rx.recv().await.unwrap();
        assert_eq!(&*broadcast, &[Tag::id(TagKind::Product, "p1")]);
    }

    #[tokio::test]
    async fn test_response_dispatched_before_invalidation_is_discarded() {
        let cache = cache();
        let k = key("products");
        let tags = vec![Tag::list(TagKind::Product)];
        cache
            .insert(k.clone(), CacheEntry::new(1_u32, tags.clone(), cache.next_seq()))
            .await;

        let in_flight = cache.next_seq();
        cache.invalidate_tags(&[Tag::list(TagKind::Product)]).await;
        assert!(!cache.insert(k.clone(), CacheEntry::new(2_u32, tags.clone(), in_flight)).await);

        let refetch = cache.next_seq();
        assert!(cache.insert(k.clone(), CacheEntry::new(3_u32, tags, refetch)).await);
        assert_eq!(cache.get(&k).await.unwrap().downcast::<u32>(), Some(3));
    }

    #[tokio::test]
    async fn test_patch_and_undo() {
        let cache = cache();
        let k = key("wishlist");
        cache
            .insert(k.clone(), CacheEntry::new(vec![1_u32, 2], vec![], cache.next_seq()))
            .await;

        let handle = cache
            .patch::<Vec<u32>, _>(&k, |items| items.push(3))
            .await
            .unwrap();
        assert_eq!(
            cache.get(&k).await.unwrap().downcast::<Vec<u32>>(),
            Some(vec![1, 2, 3])
        );

        handle.undo().await;
        assert_eq!(
            cache.get(&k).await.unwrap().downcast::<Vec<u32>>(),
            Some(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn test_undo_skipped_after_newer_response() {
        let cache = cache();
        let k = key("wishlist");
        cache
            .insert(k.clone(), CacheEntry::new(vec![1_u32], vec![], cache.next_seq()))
            .await;
        let handle = cache
            .patch::<Vec<u32>, _>(&k, |items| items.clear())
            .await
            .unwrap();

        cache
            .insert(k.clone(), CacheEntry::new(vec![7_u32], vec![], cache.next_seq()))
            .await;
        handle.undo().await;

        assert_eq!(
            cache.get(&k).await.unwrap().downcast::<Vec<u32>>(),
            Some(vec![7])
        );
    }

    #[tokio::test]
    async fn test_patch_notifies_update_subscribers() {
        let cache = cache();
        let k = key("wishlist");
        cache
            .insert(k.clone(), CacheEntry::new(vec![1_u32], vec![], cache.next_seq()))
            .await;
        let mut updates = cache.subscribe_updates();

        let handle = cache
            .patch::<Vec<u32>, _>(&k, |items| items.push(2))
            .await
            .unwrap();
        assert_eq!(updates.recv().await.unwrap(), k);

        handle.undo().await;
        assert_eq!(updates.recv().await.unwrap(), k);
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_patch_does_not_overwrite_response_that_landed_meanwhile() {
        let cache = cache();
        let k = key("wishlist");
        cache
            .insert(k.clone(), CacheEntry::new(vec![1_u32], vec![], cache.next_seq()))
            .await;
        let newer = cache.next_seq();

        let handle = cache
            .patch::<Vec<u32>, _>(&k, |items| {
                items.push(2);
                tokio::task::block_in_place(|| {
                    tokio::runtime::Handle::current().block_on(cache.insert(
                        k.clone(),
                        CacheEntry::new(vec![9_u32], vec![], newer),
                    ))
                });
            })
            .await;

        assert!(handle.is_none());
        let entry = cache.get(&k).await.unwrap();
        assert_eq!(entry.seq, newer);
        assert_eq!(entry.downcast::<Vec<u32>>(), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_mark_stale_skips_entry_replaced_since_read() {
        let cache = cache();
        let k = key("products");
        let tags = vec![Tag::list(TagKind::Product)];
        let read = cache.next_seq();
        cache
            .insert(k.clone(), CacheEntry::new(1_u32, tags.clone(), read))
            .await;
        let newer = cache.next_seq();
        cache
            .insert(k.clone(), CacheEntry::new(2_u32, tags, newer))
            .await;

        let floor = cache.next_seq();
        assert!(!cache.mark_stale(k.clone(), read, floor).await);

        let entry = cache.get(&k).await.unwrap();
        assert_eq!(entry.seq, newer);
        assert_eq!(entry.downcast::<u32>(), Some(2));
        assert!(cache.mark_stale(k.clone(), newer, floor).await);
        assert_eq!(cache.peek(&k).await.unwrap().seq, floor);
    }

    #[tokio::test]
    async fn test_patch_wrong_type_is_none() {
        let cache = cache();
        let k = key("stats");
        cache
            .insert(k.clone(), CacheEntry::new(5_u32, vec![], cache.next_seq()))
            .await;
        assert!(cache.patch::<String, _>(&k, |_| {}).await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache();
        cache
            .insert(key("a"), CacheEntry::new(1_u32, vec![], cache.next_seq()))
            .await;
        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}
