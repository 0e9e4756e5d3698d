//! Turns stabilized filter snapshots into store queries, last request wins.
//!
//! Every issued request gets a fresh [`RequestId`] and becomes the only one
//! allowed to write results. Issuing a new request cancels the previous one
//! (dropping its store future), and a response that still arrives for a
//! superseded id is discarded. That bookkeeping alone keeps stale data out,
//! whether or not the transport honoured the cancellation.
//!
//! One orchestrator is shared by every consumer of the same filtered data
//! (map, card carousel); they observe results through [`subscribe`].
//!
//! [`subscribe`]: PoiQueryOrchestrator::subscribe

use crate::config::catalog::CategoryCatalog;
use crate::core::cache::QueryCache;
use crate::core::fallback::{FallbackPolicy, ResultSource};
use crate::core::hasher::{FilterHash, StableHash};
use crate::core::query::PoiQuery;
use crate::domain::filters::FilterState;
use crate::domain::model::{Poi, QueryRequest, RequestId};
use crate::domain::ports::PoiStore;
use crate::utils::error::Result;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What consumers render: the visible results and request status.
#[derive(Debug, Clone, Default)]
pub struct ResultsView {
    pub pois: Vec<Poi>,
    pub source: ResultSource,
    pub request_id: Option<RequestId>,
    pub filters_hash: Option<FilterHash>,
    pub loading: bool,
    /// Set when the latest request failed; `pois` keeps the last good results.
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// The request was current when it settled and its results are visible.
    Applied(ResultsView),
    /// Same canonical filters as the in-flight or last settled request.
    Unchanged,
    /// A newer request superseded this one.
    Discarded,
}

struct InFlight {
    request: QueryRequest,
    hash: FilterHash,
    cancel: CancellationToken,
}

#[derive(Default)]
struct QueryState {
    next_id: u64,
    current: Option<InFlight>,
    last_settled: Option<FilterHash>,
    last_issued: Option<FilterState>,
}

enum Issue {
    Skip,
    Settled(ResultsView),
    Send {
        request: QueryRequest,
        hash: FilterHash,
        cancel: CancellationToken,
    },
}

struct Shared<S> {
    store: S,
    catalog: Arc<CategoryCatalog>,
    fallback: FallbackPolicy,
    cache: Option<Mutex<QueryCache>>,
    max_results: Option<usize>,
    state: Mutex<QueryState>,
    view: watch::Sender<ResultsView>,
}

pub struct PoiQueryOrchestrator<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for PoiQueryOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: PoiStore> PoiQueryOrchestrator<S> {
    pub fn new(store: S, catalog: Arc<CategoryCatalog>, fallback: FallbackPolicy) -> Self {
        let (view, _) = watch::channel(ResultsView::default());
        Self {
            inner: Arc::new(Shared {
                store,
                catalog,
                fallback,
                cache: None,
                max_results: None,
                state: Mutex::new(QueryState::default()),
                view,
            }),
        }
    }

    /// Must be called before the orchestrator is cloned.
    pub fn with_cache(mut self, cache: QueryCache) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.cache = Some(Mutex::new(cache)),
            None => tracing::warn!("Orchestrator already shared, cache not installed"),
        }
        self
    }

    /// Must be called before the orchestrator is cloned.
    pub fn with_max_results(mut self, limit: usize) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => inner.max_results = Some(limit),
            None => tracing::warn!("Orchestrator already shared, result limit not applied"),
        }
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultsView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> ResultsView {
        self.inner.view.borrow().clone()
    }

    pub fn query_for(&self, filters: &FilterState) -> PoiQuery {
        let query = PoiQuery::from_filters(filters, &self.inner.catalog);
        match self.inner.max_results {
            Some(limit) => query.with_limit(limit),
            None => query,
        }
    }

    /// Queries the store for `filters` unless an equivalent request is
    /// already in flight or was the last to settle.
    ///
    /// Store failures are returned only while the request is still current.
    /// They are not retried here; see [`retry`](Self::retry).
    pub async fn fetch(&self, filters: FilterState) -> Result<FetchOutcome> {
        self.run(filters.normalized_with(&self.inner.catalog), false).await
    }

    /// Like [`fetch`](Self::fetch), but the request is registered before this
    /// returns. Requests rank by call order, whenever the returned futures
    /// get polled.
    pub fn submit(
        &self,
        filters: FilterState,
    ) -> impl Future<Output = Result<FetchOutcome>> + Send + 'static
    where
        S: 'static,
    {
        let issue = self.begin(filters.normalized_with(&self.inner.catalog), false);
        let this = self.clone();
        async move { this.send(issue).await }
    }

    /// Re-issues the most recent request, bypassing deduplication and cache.
    pub async fn retry(&self) -> Result<FetchOutcome> {
        let last = lock(&self.inner.state).last_issued.clone();
        match last {
            Some(filters) => {
                tracing::info!("Retrying last point of interest query");
                self.run(filters, true).await
            }
            None => Ok(FetchOutcome::Unchanged),
        }
    }

    /// Cancels the in-flight request, if any. Its response will be ignored.
    pub fn cancel(&self) {
        let mut state = lock(&self.inner.state);
        if let Some(in_flight) = state.current.take() {
            tracing::debug!("Cancelling {}", in_flight.request.request_id);
            in_flight.cancel.cancel();
            self.inner.view.send_modify(|view| view.loading = false);
        }
    }

    async fn run(&self, filters: FilterState, force: bool) -> Result<FetchOutcome> {
        let issue = self.begin(filters, force);
        self.send(issue).await
    }

    async fn send(&self, issue: Issue) -> Result<FetchOutcome> {
        let (request, hash, cancel) = match issue {
            Issue::Skip => return Ok(FetchOutcome::Unchanged),
            Issue::Settled(view) => return Ok(FetchOutcome::Applied(view)),
            Issue::Send {
                request,
                hash,
                cancel,
            } => (request, hash, cancel),
        };

        let query = self.query_for(&request.filters);
        tracing::debug!(
            "Issuing {} (unrestricted: {})",
            request.request_id,
            query.is_unrestricted()
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("{} cancelled before the store answered", request.request_id);
                return Ok(FetchOutcome::Discarded);
            }
            result = self.inner.store.query(&query) => result,
        };

        self.complete(&request, hash, result)
    }

    fn begin(&self, filters: FilterState, force: bool) -> Issue {
        let hash = filters.stable_hash();
        let mut state = lock(&self.inner.state);

        if !force {
            let duplicate = match &state.current {
                Some(in_flight) => in_flight.hash == hash,
                None => state.last_settled.as_ref() == Some(&hash),
            };
            if duplicate {
                tracing::debug!("Skipping query, filters unchanged ({})", hash);
                return Issue::Skip;
            }
        }

        if let Some(previous) = state.current.take() {
            tracing::debug!("Superseding {}", previous.request.request_id);
            previous.cancel.cancel();
        }

        state.next_id += 1;
        let request = QueryRequest::new(RequestId(state.next_id), filters);
        state.last_issued = Some(request.filters.clone());

        if !force {
            let cached = self
                .inner
                .cache
                .as_ref()
                .and_then(|cache| lock(cache).get(&hash));
            if let Some(pois) = cached {
                tracing::debug!("Serving {} from cache", request.request_id);
                state.last_settled = Some(hash.clone());
                let view = self.publish(&request, hash, pois, ResultSource::Cached);
                return Issue::Settled(view);
            }
        }

        let cancel = CancellationToken::new();
        state.current = Some(InFlight {
            request: request.clone(),
            hash: hash.clone(),
            cancel: cancel.clone(),
        });
        self.inner.view.send_modify(|view| {
            view.loading = true;
        });

        Issue::Send {
            request,
            hash,
            cancel,
        }
    }

    fn complete(
        &self,
        request: &QueryRequest,
        hash: FilterHash,
        result: Result<Vec<Poi>>,
    ) -> Result<FetchOutcome> {
        let mut state = lock(&self.inner.state);

        let is_current = state
            .current
            .as_ref()
            .is_some_and(|in_flight| in_flight.request.request_id == request.request_id);
        if !is_current {
            tracing::debug!("Discarding stale response for {}", request.request_id);
            return Ok(FetchOutcome::Discarded);
        }
        state.current = None;
        state.last_settled = Some(hash.clone());

        match result {
            Ok(pois) => {
                if let Some(cache) = &self.inner.cache {
                    lock(cache).insert(hash.clone(), pois.clone());
                }
                let view = self.publish(request, hash, pois, ResultSource::Live);
                Ok(FetchOutcome::Applied(view))
            }
            Err(e) => {
                tracing::warn!(
                    "{} failed: {} (retryable: {})",
                    request.request_id,
                    e,
                    e.is_retryable()
                );
                let message = e.user_friendly_message();
                self.inner.view.send_modify(|view| {
                    view.loading = false;
                    view.error = Some(message);
                });
                Err(e)
            }
        }
    }

    fn publish(
        &self,
        request: &QueryRequest,
        hash: FilterHash,
        pois: Vec<Poi>,
        source: ResultSource,
    ) -> ResultsView {
        let (pois, source) = self.inner.fallback.resolve(pois, &request.filters, source);
        tracing::info!(
            "{} settled with {} points of interest ({:?})",
            request.request_id,
            pois.len(),
            source
        );
        let view = ResultsView {
            pois,
            source,
            request_id: Some(request.request_id),
            filters_hash: Some(hash),
            loading: false,
            error: None,
        };
        self.inner.view.send_replace(view.clone());
        view
    }
}
