//! Query and mutation endpoints.
//!
//! A [`Query`] reads data and declares the tags its result provides. A
//! [`Mutation`] changes data and declares the tags it invalidates. The
//! client wires the two together through the [`QueryCache`]: running a
//! mutation marks matching queries stale, and any [`QueryObserver`] watching
//! them refetches.
//!
//! [`QueryCache`]: crate::cache::QueryCache

use std::sync::Arc;

use bazaar_core::{Paginated, PageMeta};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::cache::{CacheEntry, PatchHandle, QueryKey, Tag};
use crate::client::{ApiClient, RawResponse};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::validation::Validate;

/// A cacheable read.
pub trait Query: Send + Sync + 'static {
    /// Endpoint name; part of the cache key.
    const NAME: &'static str;

    type Args: Serialize + Clone + Send + Sync + 'static;
    type Output: DeserializeOwned + Clone + Send + Sync + 'static;

    /// Describe the HTTP call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built.
    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError>;

    /// Tags the result provides. `output` is `None` when the fetch failed,
    /// so a failed query can still be refreshed by an invalidation.
    fn provides(args: &Self::Args, output: Option<&Self::Output>) -> Vec<Tag>;

    /// Turn the unwrapped envelope into the output type.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if `data` has the wrong shape.
    fn decode(raw: RawResponse) -> Result<Self::Output, ApiError> {
        Ok(serde_json::from_value(raw.data)?)
    }
}

/// A write that invalidates cached queries.
pub trait Mutation: Send + Sync + 'static {
    const NAME: &'static str;

    type Args: Validate + Send + Sync;
    type Output: DeserializeOwned + Send;

    /// Describe the HTTP call. Only called once `args` has validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built.
    fn request(args: &Self::Args) -> Result<ApiRequest, ApiError>;

    /// Tags to invalidate after the server accepted the change.
    fn invalidates(args: &Self::Args, output: &Self::Output) -> Vec<Tag>;

    /// # Errors
    ///
    /// Returns `ApiError::Decode` if `data` has the wrong shape.
    fn decode(raw: RawResponse) -> Result<Self::Output, ApiError> {
        Ok(serde_json::from_value(raw.data)?)
    }
}

/// Output of mutations whose response body carries nothing but a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub message: Option<String>,
}

impl From<RawResponse> for Ack {
    fn from(raw: RawResponse) -> Self {
        Self {
            message: raw.message,
        }
    }
}

/// Decode a list response, keeping the envelope's pagination metadata.
///
/// # Errors
///
/// Returns `ApiError::Decode` if `data` is not an array of `T`.
pub fn decode_page<T: DeserializeOwned>(raw: RawResponse) -> Result<Paginated<T>, ApiError> {
    let items: Vec<T> = serde_json::from_value(raw.data)?;
    Ok(Paginated::new(items, raw.meta))
}

// =============================================================================
// Query state
// =============================================================================

/// What a screen renders for one query.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last successful result. Kept while refetching and after a failed refetch.
    pub data: Option<T>,
    /// Pagination metadata of the last successful result.
    pub meta: Option<PageMeta>,
    /// No result yet and a fetch is running.
    pub is_loading: bool,
    /// Any fetch is running.
    pub is_fetching: bool,
    /// Failure of the most recent fetch.
    pub error: Option<Arc<ApiError>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            meta: None,
            is_loading: false,
            is_fetching: false,
            error: None,
        }
    }
}

impl<T> QueryState<T> {
    /// Initial state while the first fetch runs.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            is_fetching: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        let mut state = Self::default();
        state.apply(result);
        state
    }

    /// Mark a refetch as started.
    pub fn start_fetch(&mut self) {
        self.is_fetching = true;
        self.is_loading = self.data.is_none();
    }

    /// Record a finished fetch. A failure keeps the previous data.
    pub fn apply(&mut self, result: Result<T, ApiError>) {
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => self.error = Some(Arc::new(err)),
        }
        self.is_loading = false;
        self.is_fetching = false;
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    /// The user-facing error message, if the last fetch failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.toast_message())
    }
}

/// Live view of a query that refetches when its tags are invalidated.
///
/// Dropping the observer stops the background task.
pub struct QueryObserver<T> {
    rx: watch::Receiver<QueryState<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone> QueryObserver<T> {
    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. Returns `false` once the observer
    /// has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the state satisfies `predicate`.
    ///
    /// Returns `None` if the observer stops first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&QueryState<T>) -> bool,
    ) -> Option<QueryState<T>> {
        self.rx.wait_for(predicate).await.ok().map(|s| s.clone())
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Client integration
// =============================================================================

impl ApiClient {
    /// Run a query, serving a fresh cached result when there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self, args), fields(endpoint = Q::NAME))]
    pub async fn query<Q: Query>(&self, args: &Q::Args) -> Result<Q::Output, ApiError> {
        let key = QueryKey::new(Q::NAME, args)?;
        if let Some(entry) = self.cache().get(&key).await
            && let Some(output) = entry.downcast::<Q::Output>()
        {
            debug!(%key, "Cache hit");
            return Ok(output);
        }
        self.fetch::<Q>(key, args).await
    }

    /// Run a query against the server, replacing the cached result.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails.
    #[instrument(skip(self, args), fields(endpoint = Q::NAME))]
    pub async fn refetch<Q: Query>(&self, args: &Q::Args) -> Result<Q::Output, ApiError> {
        let key = QueryKey::new(Q::NAME, args)?;
        self.fetch::<Q>(key, args).await
    }

    async fn fetch<Q: Query>(&self, key: QueryKey, args: &Q::Args) -> Result<Q::Output, ApiError> {
        let seq = self.cache().next_seq();
        let raw = self.send(Q::request(args)?).await?;
        let meta = raw.meta.clone();
        let output = Q::decode(raw)?;

        let mut entry = CacheEntry::new(output.clone(), Q::provides(args, Some(&output)), seq);
        entry.meta = meta;
        self.cache().insert(key, entry).await;

        Ok(output)
    }

    /// Validate, send, and invalidate the mutation's tags on success.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` without sending anything if `args` is
    /// invalid, otherwise any transport or server error.
    #[instrument(skip(self, args), fields(endpoint = M::NAME))]
    pub async fn mutate<M: Mutation>(&self, args: &M::Args) -> Result<M::Output, ApiError> {
        args.validate()?;

        let raw = self.send(M::request(args)?).await?;
        let output = M::decode(raw)?;

        let tags = M::invalidates(args, &output);
        self.cache().invalidate_tags(&tags).await;

        Ok(output)
    }

    /// Optimistically rewrite a cached query result.
    ///
    /// Returns `None` if the query is not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if `args` cannot be serialised into a cache key.
    pub async fn update_query_data<Q: Query>(
        &self,
        args: &Q::Args,
        f: impl FnOnce(&mut Q::Output),
    ) -> Result<Option<PatchHandle>, ApiError> {
        let key = QueryKey::new(Q::NAME, args)?;
        Ok(self.cache().patch::<Q::Output, _>(&key, f).await)
    }

    /// Observe a query: fetch it now and again whenever a matching tag is
    /// invalidated. Optimistic patches and their rollback show up without a
    /// refetch.
    #[must_use]
    pub fn watch<Q: Query>(&self, args: Q::Args) -> QueryObserver<Q::Output> {
        let (tx, rx) = watch::channel(QueryState::loading());
        // Subscribe before the first fetch so no invalidation slips between.
        let mut invalidations = self.cache().subscribe();
        let mut updates = self.cache().subscribe_updates();
        let key = QueryKey::new(Q::NAME, &args).ok();
        let client = self.clone();

        let task = tokio::spawn(async move {
            let result = client.query::<Q>(&args).await;
            let mut tags = Q::provides(&args, result.as_ref().ok());
            let meta = client.cached_meta::<Q>(&args).await;
            tx.send_modify(|state| {
                state.apply(result);
                state.meta = meta;
            });

            loop {
                let wake = tokio::select! {
                    received = invalidations.recv() => match received {
                        Ok(invalidated) => {
                            let hit = invalidated
                                .iter()
                                .any(|t| tags.iter().any(|provided| t.matches(provided)));
                            if !hit {
                                continue;
                            }
                            Wake::Refetch
                        }
                        // Missed broadcasts may have included ours.
                        Err(broadcast::error::RecvError::Lagged(_)) => Wake::Refetch,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    updated = updates.recv() => match updated {
                        Ok(updated) if key.as_ref() == Some(&updated) => Wake::Reread,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(_)) => Wake::Reread,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                if tx.is_closed() {
                    break;
                }
                match wake {
                    Wake::Reread => {
                        let Some(key) = &key else { continue };
                        let cached = client.cache().peek(key).await;
                        if let Some(data) = cached.and_then(|e| e.downcast::<Q::Output>()) {
                            debug!(endpoint = Q::NAME, "Cached value updated in place");
                            tx.send_modify(|state| state.data = Some(data));
                        }
                    }
                    Wake::Refetch => {
                        debug!(endpoint = Q::NAME, "Refetching after invalidation");
                        tx.send_modify(QueryState::start_fetch);

                        let result = client.query::<Q>(&args).await;
                        if let Ok(output) = &result {
                            tags = Q::provides(&args, Some(output));
                        }
                        let meta = client.cached_meta::<Q>(&args).await;
                        tx.send_modify(|state| {
                            let succeeded = result.is_ok();
                            state.apply(result);
                            if succeeded {
                                state.meta = meta;
                            }
                        });
                    }
                }
            }
        });

        QueryObserver { rx, task }
    }

    async fn cached_meta<Q: Query>(&self, args: &Q::Args) -> Option<PageMeta> {
        let key = QueryKey::new(Q::NAME, args).ok()?;
        self.cache().peek(&key).await.and_then(|e| e.meta)
    }
}

/// Why an observer woke up.
enum Wake {
    Refetch,
    Reread,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(data: serde_json::Value, meta: Option<PageMeta>) -> RawResponse {
        RawResponse {
            data,
            message: Some("done".to_string()),
            meta,
        }
    }

    #[test]
    fn test_decode_page_uses_envelope_meta() {
        let meta = PageMeta {
            total: 25,
            page: 2,
            limit: 10,
            total_page: 3,
        };
        let page: Paginated<u32> = decode_page(raw(json!([1, 2, 3]), Some(meta))).unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.meta.total, 25);
        assert!(page.meta.has_next());
    }

    #[test]
    fn test_decode_page_rejects_object() {
        let err = decode_page::<u32>(raw(json!({"id": 1}), None)).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_ack_from_raw() {
        let ack = Ack::from(raw(json!(null), None));
        assert_eq!(ack.message.as_deref(), Some("done"));
    }

    #[test]
    fn test_query_state_keeps_data_on_error() {
        let mut state = QueryState::from_result(Ok(5_u32));
        assert!(state.is_success());

        state.start_fetch();
        assert!(state.is_fetching);
        assert!(!state.is_loading);

        state.apply(Err(ApiError::NotFound("gone".to_string())));
        assert_eq!(state.data, Some(5));
        assert_eq!(state.error_message().as_deref(), Some("gone"));
        assert!(!state.is_fetching);
    }

    #[test]
    fn test_loading_state() {
        let mut state = QueryState::<u32>::loading();
        assert!(state.is_loading);
        state.apply(Err(ApiError::Decode("bad".to_string())));
        assert!(!state.is_loading);
        assert!(state.data.is_none());
    }
}
