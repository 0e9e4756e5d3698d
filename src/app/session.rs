//! Root object of a discovery screen.
//!
//! Owns everything the screen needs (codec, debounced filter and viewport
//! state, the one shared orchestrator) and the driver task that feeds
//! stabilized filter snapshots into the orchestrator. Dropping the session
//! tears all of it down.

use crate::app::view_model::DiscoveryViewModel;
use crate::config::toml_config::AppConfig;
use crate::core::cache::QueryCache;
use crate::core::codec::FilterCodec;
use crate::core::debounce::DebouncedStore;
use crate::core::fallback::FallbackPolicy;
use crate::core::orchestrator::{FetchOutcome, PoiQueryOrchestrator, ResultsView};
use crate::domain::filters::{FilterState, GeoBounds};
use crate::domain::ports::PoiStore;
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub struct DiscoverySession<S> {
    codec: FilterCodec,
    filters: DebouncedStore<FilterState>,
    viewport: DebouncedStore<Option<GeoBounds>>,
    orchestrator: PoiQueryOrchestrator<S>,
    shutdown: CancellationToken,
}

impl<S: PoiStore + 'static> DiscoverySession<S> {
    /// Builds the session from configuration and URL state and issues the
    /// first query right away. Must be called inside a tokio runtime.
    pub fn start(config: &AppConfig, store: S, initial_query: &str) -> Self {
        let catalog = Arc::new(config.catalog());
        let codec = FilterCodec::new(Arc::clone(&catalog));
        let initial = codec.decode(initial_query);

        let fallback = if config.fallback.is_empty() {
            FallbackPolicy::default()
        } else {
            FallbackPolicy::new(config.fallback.clone())
        };

        let mut orchestrator = PoiQueryOrchestrator::new(store, catalog, fallback)
            .with_max_results(config.store.max_results);
        if config.cache.enabled {
            orchestrator = orchestrator.with_cache(QueryCache::new(
                config.cache.ttl(),
                config.cache.max_entries,
            ));
        }

        let filters = DebouncedStore::new(initial, config.debounce.filters());
        let viewport = DebouncedStore::new(None, config.debounce.map_bounds());
        let shutdown = CancellationToken::new();

        tokio::spawn(drive(
            orchestrator.clone(),
            filters.subscribe(),
            shutdown.clone(),
        ));

        Self {
            codec,
            filters,
            viewport,
            orchestrator,
            shutdown,
        }
    }

    pub fn edit(&self, edit: impl FnOnce(&mut FilterState)) {
        self.filters.update(edit);
    }

    pub fn set_filters(&self, filters: FilterState) {
        self.filters.set(filters);
    }

    /// Replaces the filters with the state encoded in a shared URL.
    pub fn apply_query_string(&self, query: &str) {
        self.filters.set(self.codec.decode(query));
    }

    /// Current (not yet stabilized) filters.
    pub fn filters(&self) -> FilterState {
        self.filters.live()
    }

    /// URL state for the current filters.
    pub fn query_string(&self) -> String {
        self.codec.encode(&self.filters.live())
    }

    pub fn set_viewport(&self, bounds: GeoBounds) {
        self.viewport.set(Some(bounds));
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultsView> {
        self.orchestrator.subscribe()
    }

    pub fn results(&self) -> ResultsView {
        self.orchestrator.view()
    }

    pub fn view_model(&self) -> DiscoveryViewModel {
        DiscoveryViewModel::build(&self.orchestrator.view(), self.viewport.stabilized().as_ref())
    }

    pub async fn retry(&self) -> Result<FetchOutcome> {
        self.orchestrator.retry().await
    }

    pub fn orchestrator(&self) -> &PoiQueryOrchestrator<S> {
        &self.orchestrator
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.filters.shutdown();
        self.viewport.shutdown();
        self.orchestrator.cancel();
    }
}

impl<S> Drop for DiscoverySession<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn drive<S: PoiStore + 'static>(
    orchestrator: PoiQueryOrchestrator<S>,
    mut stabilized: watch::Receiver<FilterState>,
    shutdown: CancellationToken,
) {
    let mut snapshot = stabilized.borrow_and_update().clone();
    loop {
        spawn_fetch(&orchestrator, snapshot);

        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = stabilized.changed() => {
                if changed.is_err() {
                    break;
                }
                snapshot = stabilized.borrow_and_update().clone();
            }
        }
    }
    orchestrator.cancel();
    tracing::debug!("Discovery session driver stopped");
}

/// Each fetch runs on its own task so a newer snapshot can supersede it.
/// The request is registered here, in snapshot order, before the task starts.
fn spawn_fetch<S: PoiStore + 'static>(orchestrator: &PoiQueryOrchestrator<S>, filters: FilterState) {
    let fetch = orchestrator.submit(filters);
    tokio::spawn(async move {
        if let Err(e) = fetch.await {
            tracing::warn!(
                "Point of interest query failed: {} ({})",
                e,
                e.recovery_suggestion()
            );
        }
    });
}
