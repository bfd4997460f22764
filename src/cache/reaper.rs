//! Periodic sweep of expired cache entries.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::store::CacheStore;
use crate::{Error, ErrorContext, Result};

/// Background task calling [`CacheStore::cleanup`] on a fixed interval.
///
/// Holds only a weak reference to the store, so it stops on its own once the store is
/// gone. Cancelled on [`Reaper::cancel`] or drop.
pub struct Reaper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Reaper {
    /// Spawn on the current tokio runtime.
    pub fn spawn<V>(store: &Arc<CacheStore<V>>, interval: Duration) -> Result<Self>
    where
        V: Clone + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                format!("cache reaper needs a tokio runtime: {e}"),
                ErrorContext::new().with_source("reaper"),
            )
        })?;
        let start = Some(interval)
            .filter(|i| !i.is_zero())
            .and_then(|i| tokio::time::Instant::now().checked_add(i))
            .ok_or_else(|| {
                Error::configuration_with_context(
                    format!("invalid cache sweep interval: {interval:?}"),
                    ErrorContext::new()
                        .with_field_path("manager.cleanup_interval_ms")
                        .with_source("reaper"),
                )
            })?;
        let token = CancellationToken::new();
        let handle = runtime.spawn(sweep(Arc::downgrade(store), start, interval, token.clone()));
        Ok(Self { token, handle })
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the sweep loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn sweep<V: Clone>(
    store: Weak<CacheStore<V>>,
    start: tokio::time::Instant,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let removed = store.cleanup();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "swept expired cache entries");
                } else {
                    trace!("cache sweep found nothing to remove");
                }
            }
        }
    }
    debug!("cache reaper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RequestKey;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sweeps_on_interval() {
        let store = Arc::new(CacheStore::new(10, Duration::from_secs(60)));
        store.set(RequestKey::from("a"), 1, Some(Duration::from_secs(5)));
        store.set(RequestKey::from("b"), 2, Some(Duration::from_secs(30)));
        let reaper = Reaper::spawn(&store, Duration::from_secs(10)).unwrap();

        // First sweep at t=10s removes only "a".
        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains(&RequestKey::from("b")));

        // "b" expires at 30s and is swept at the 40s tick.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.is_empty());
        reaper.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_task() {
        let store = Arc::new(CacheStore::<u8>::new(10, Duration::from_secs(60)));
        let reaper = Reaper::spawn(&store, Duration::from_secs(1)).unwrap();
        reaper.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(reaper.is_cancelled());
        assert!(reaper.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_store_dropped() {
        let store = Arc::new(CacheStore::<u8>::new(10, Duration::from_secs(60)));
        let reaper = Reaper::spawn(&store, Duration::from_secs(1)).unwrap();
        drop(store);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(reaper.is_finished());
        assert!(!reaper.is_cancelled());
    }

    #[tokio::test]
    async fn test_zero_or_unrepresentable_interval_is_an_error() {
        let store = Arc::new(CacheStore::<u8>::new(10, Duration::from_secs(60)));
        assert!(matches!(
            Reaper::spawn(&store, Duration::ZERO),
            Err(Error::Configuration { .. })
        ));
        assert!(matches!(
            Reaper::spawn(&store, Duration::MAX),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let store = Arc::new(CacheStore::<u8>::new(10, Duration::from_secs(60)));
        assert!(matches!(
            Reaper::spawn(&store, Duration::from_secs(1)),
            Err(Error::Configuration { .. })
        ));
    }
}
