//! Live value plus a stabilized copy that trails it by a quiet period.

use crate::core::hasher::{FilterHash, StableHash};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Holds a live value updated on every edit and publishes a stabilized copy
/// once the live value has stopped changing for `quiet`.
///
/// Changes are detected by [`StableHash`], so rebuilding an equal value does
/// not restart the quiet period. Rapid edits collapse into one emission of the
/// final value. Dropping the store (or calling [`shutdown`](Self::shutdown))
/// stops the worker; a pending emission is abandoned.
///
/// Must be created inside a tokio runtime.
pub struct DebouncedStore<T> {
    live: watch::Sender<T>,
    stabilized: watch::Receiver<T>,
    quiet: Duration,
    shutdown: CancellationToken,
}

impl<T> DebouncedStore<T>
where
    T: StableHash + Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, quiet: Duration) -> Self {
        let (live, live_rx) = watch::channel(initial.clone());
        let (stabilized_tx, stabilized) = watch::channel(initial);
        let shutdown = CancellationToken::new();

        tokio::spawn(run_debounce(live_rx, stabilized_tx, quiet, shutdown.clone()));

        Self {
            live,
            stabilized,
            quiet,
            shutdown,
        }
    }

    /// Replaces the live value.
    pub fn set(&self, value: T) {
        self.live.send_replace(value);
    }

    /// Edits the live value in place.
    pub fn update(&self, edit: impl FnOnce(&mut T)) {
        self.live.send_modify(edit);
    }

    pub fn live(&self) -> T {
        self.live.borrow().clone()
    }

    pub fn stabilized(&self) -> T {
        self.stabilized.borrow().clone()
    }

    /// Receiver notified on every stabilized emission.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.stabilized.clone()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl<T> Drop for DebouncedStore<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_debounce<T>(
    mut live: watch::Receiver<T>,
    stabilized: watch::Sender<T>,
    quiet: Duration,
    shutdown: CancellationToken,
) where
    T: StableHash + Clone + Send + Sync + 'static,
{
    let mut emitted: FilterHash = stabilized.borrow().stable_hash();
    let mut pending: FilterHash = emitted.clone();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = live.changed() => {
                if changed.is_err() {
                    break;
                }
                let hash = live.borrow_and_update().stable_hash();
                if hash != pending {
                    pending = hash;
                    deadline = Some(Instant::now() + quiet);
                }
            }
            _ = async {
                if let Some(at) = deadline {
                    sleep_until(at).await;
                }
            }, if deadline.is_some() => {
                deadline = None;
                let value = live.borrow_and_update().clone();
                let hash = value.stable_hash();
                if hash != pending {
                    // edited in the same instant the timer fired
                    pending = hash;
                    deadline = Some(Instant::now() + quiet);
                } else if pending != emitted {
                    tracing::debug!("Stabilized value after {:?} quiet period", quiet);
                    stabilized.send_replace(value);
                    emitted = pending.clone();
                }
            }
        }
    }
    tracing::debug!("Debounce worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::{FilterState, GeoBounds, Zone};
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_collapse_into_one_emission() {
        let store = DebouncedStore::new(FilterState::default(), Duration::from_millis(300));
        let mut rx = store.subscribe();
        let start = Instant::now();

        store.set(FilterState::default().with_zone(Zone::Rimini));
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.set(FilterState::default().with_zone(Zone::Riccione));
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.set(FilterState::default().with_zone(Zone::Cattolica));

        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(400));
        assert_eq!(rx.borrow_and_update().zone, Zone::Cattolica);

        let again = timeout(Duration::from_secs(5), rx.changed()).await;
        assert!(again.is_err(), "only one stabilized emission expected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_at_deadline_is_not_emitted_early() {
        let quiet = Duration::from_millis(300);
        let store = DebouncedStore::new(FilterState::default(), quiet);
        let mut rx = store.subscribe();
        let start = Instant::now();

        store.set(FilterState::default().with_zone(Zone::Rimini));
        tokio::time::sleep(quiet).await;
        store.set(FilterState::default().with_zone(Zone::Faenza));
        let edited_at = start.elapsed();

        let mut emissions = Vec::new();
        while let Ok(Ok(())) = timeout(Duration::from_secs(2), rx.changed()).await {
            emissions.push((start.elapsed(), rx.borrow_and_update().zone));
        }

        let (last_at, last_zone) = *emissions.last().unwrap();
        assert_eq!(last_zone, Zone::Faenza);
        assert_eq!(last_at, edited_at + quiet);
        assert_eq!(
            emissions.iter().filter(|(_, zone)| *zone == Zone::Faenza).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_rebuild_does_not_emit() {
        let initial = FilterState::default().with_categories(["cibo", "cultura"]);
        let store = DebouncedStore::new(initial, Duration::from_millis(300));
        let mut rx = store.subscribe();

        store.set(FilterState::default().with_categories(["cultura", "cibo", "all"]));

        let result = timeout(Duration::from_secs(2), rx.changed()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_and_revert_within_window_does_not_emit() {
        let store = DebouncedStore::new(FilterState::default(), Duration::from_millis(300));
        let mut rx = store.subscribe();

        store.update(|f| f.zone = Zone::Cervia);
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.update(|f| f.zone = Zone::AllZones);

        let result = timeout(Duration::from_secs(2), rx.changed()).await;
        assert!(result.is_err());
        assert_eq!(store.live(), FilterState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_quiet_period_cancels_emission() {
        let store = DebouncedStore::new(FilterState::default(), Duration::from_millis(300));
        let mut rx = store.subscribe();

        store.set(FilterState::default().with_zone(Zone::Ravenna));
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.shutdown();

        // the worker exits and drops its sender without emitting
        assert!(rx.changed().await.is_err());
        assert_eq!(rx.borrow().zone, Zone::AllZones);
        assert_eq!(store.stabilized().zone, Zone::AllZones);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_bounds_use_their_own_quiet_period() {
        let store = DebouncedStore::new(None::<GeoBounds>, Duration::from_millis(800));
        let mut rx = store.subscribe();
        let start = Instant::now();

        store.set(Some(GeoBounds {
            south: 44.0,
            west: 12.4,
            north: 44.2,
            east: 12.7,
        }));

        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(800));
        assert!(rx.borrow().is_some());
        assert_eq!(store.quiet_period(), Duration::from_millis(800));
    }
}
