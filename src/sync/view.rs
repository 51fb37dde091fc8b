//! Polling view of one resource key
//!
//! A [`SyncView`] keeps the latest response for a key (path + query) fresh by
//! polling, and lets mutations force a refresh through [`SyncView::revalidate`].
//!
//! Ordering rules:
//! - responses are applied in arrival order; whatever arrives last wins,
//!   regardless of which request was issued first;
//! - at most one poll is outstanding per key, extra ticks are coalesced;
//! - [`SyncView::set_key`] starts a new generation. Responses from an older
//!   generation are dropped when they arrive and the old timer stops.

use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::{fetch_json, ApiError, Fetcher};

/// What the UI renders for a view
pub struct Snapshot<T> {
    pub key: String,
    /// Most recently arrived successful body
    pub data: Option<Arc<T>>,
    /// Failure that happened while no good value exists yet
    pub error: Option<ApiError>,
    /// Bumps on every applied response and on every key change
    pub version: u64,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            data: self.data.clone(),
            error: self.error.clone(),
            version: self.version,
        }
    }
}

impl<T> Snapshot<T> {
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

struct ViewState {
    key: String,
    generation: u64,
    in_flight: usize,
    version: u64,
    timer: Option<JoinHandle<()>>,
}

struct Shared<T> {
    fetcher: Arc<dyn Fetcher>,
    interval: Option<Duration>,
    state: Mutex<ViewState>,
    tx: watch::Sender<Snapshot<T>>,
}

pub struct SyncView<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Shared<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn fetch(&self, key: &str) -> Result<Arc<T>, ApiError> {
        fetch_json::<T>(self.fetcher.as_ref(), Method::GET, key, None)
            .await
            .map(Arc::new)
    }

    /// Dispatch a poll for `generation`; false once that generation is superseded
    fn poll(self: &Arc<Self>, generation: u64) -> bool {
        let key = {
            let mut state = self.lock();
            if state.generation != generation {
                return false;
            }
            if state.in_flight > 0 {
                tracing::debug!("Poll for {} coalesced", state.key);
                return true;
            }
            state.in_flight += 1;
            state.key.clone()
        };

        let shared = self.clone();
        tokio::spawn(async move {
            let result = shared.fetch(&key).await;
            shared.apply(generation, result);
        });
        true
    }

    /// Apply a response on arrival
    fn apply(&self, generation: u64, result: Result<Arc<T>, ApiError>) {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!("Dropping response for superseded key");
            return;
        }
        state.in_flight = state.in_flight.saturating_sub(1);

        match result {
            Ok(data) => {
                state.version += 1;
                let version = state.version;
                self.tx.send_modify(|snapshot| {
                    snapshot.data = Some(data);
                    snapshot.error = None;
                    snapshot.version = version;
                });
            }
            Err(err) => {
                let has_data = self.tx.borrow().data.is_some();
                if has_data {
                    // Keep showing the last good value
                    tracing::warn!("Refresh of {} failed: {}", state.key, err);
                    return;
                }
                tracing::warn!("Initial load of {} failed: {}", state.key, err);
                state.version += 1;
                let version = state.version;
                self.tx.send_modify(|snapshot| {
                    snapshot.error = Some(err);
                    snapshot.version = version;
                });
            }
        }
    }

    /// Initial fetch plus the interval timer for `generation`
    fn start(self: &Arc<Self>, generation: u64) -> Option<JoinHandle<()>> {
        self.poll(generation);

        let interval = self.interval?;
        let weak: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately; the initial fetch already went out
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.poll(generation) {
                    break;
                }
            }
        }))
    }
}

impl<T> SyncView<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Bind `key` and start loading it; `interval` of `None` loads once
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(fetcher: Arc<dyn Fetcher>, key: impl Into<String>, interval: Option<Duration>) -> Self {
        let key = key.into();
        let (tx, _rx) = watch::channel(Snapshot {
            key: key.clone(),
            data: None,
            error: None,
            version: 0,
        });
        let shared = Arc::new(Shared {
            fetcher,
            interval,
            state: Mutex::new(ViewState {
                key,
                generation: 0,
                in_flight: 0,
                version: 0,
                timer: None,
            }),
            tx,
        });

        let timer = shared.start(0);
        shared.lock().timer = timer;
        Self { shared }
    }

    pub fn key(&self) -> String {
        self.shared.lock().key.clone()
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.shared.tx.borrow().clone()
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.shared.tx.borrow().data.clone()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.shared.tx.subscribe()
    }

    /// Fetch the current key now, outside the poll schedule
    ///
    /// Always dispatches, even with a poll outstanding. The response is
    /// applied like any other arrival and also returned to the caller.
    pub async fn revalidate(&self) -> Result<Arc<T>, ApiError> {
        let (generation, key) = {
            let mut state = self.shared.lock();
            state.in_flight += 1;
            (state.generation, state.key.clone())
        };

        // Own task: the arrival is applied even if the caller stops waiting
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let result = shared.fetch(&key).await;
            shared.apply(generation, result.clone());
            result
        });

        handle
            .await
            .map_err(|e| ApiError::new(0, crate::client::error::INTERNAL_ERROR, e.to_string()))?
    }

    /// Rebind to a new key; no-op when unchanged
    pub fn set_key(&self, key: impl Into<String>) {
        let key = key.into();
        let generation = {
            let mut state = self.shared.lock();
            if state.key == key {
                return;
            }
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            tracing::debug!("View key {} -> {}", state.key, key);
            state.generation += 1;
            state.version += 1;
            state.in_flight = 0;
            state.key = key.clone();

            let version = state.version;
            self.shared.tx.send_modify(|snapshot| {
                snapshot.key = key;
                snapshot.data = None;
                snapshot.error = None;
                snapshot.version = version;
            });
            state.generation
        };

        let timer = self.shared.start(generation);
        let mut state = self.shared.lock();
        if state.generation == generation {
            state.timer = timer;
        } else if let Some(timer) = timer {
            timer.abort();
        }
    }
}

impl<T> Drop for SyncView<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}
