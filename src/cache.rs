use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Backlinks(String),
    ForwardLinks(String),
    Summary(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Titles are case-sensitive on Wikipedia, so keys keep their casing.
        match self {
            CacheKey::Backlinks(title) => write!(f, "backlinks:{}", title),
            CacheKey::ForwardLinks(title) => write!(f, "links:{}", title),
            CacheKey::Summary(title) => write!(f, "summary:{}", title),
        }
    }
}

/// Result broadcast to coalesced waiters; errors travel as strings because
/// `AppError` is not `Clone`.
type SharedOutcome = Option<Result<String, String>>;

struct Stored {
    json: String,
    fetched_at: Instant,
}

struct Entry {
    value: Option<Stored>,
    in_flight: Option<watch::Receiver<SharedOutcome>>,
    last_access: Instant,
    gc_time: Duration,
}

enum Plan {
    Hit(String),
    Wait(watch::Receiver<SharedOutcome>),
    Produce(watch::Sender<SharedOutcome>),
}

/// In-process request cache with stale-while-revalidate semantics
///
/// Values are stored as serialized JSON so a single map can hold link lists
/// and page summaries alike. At most one producer runs per key at any time;
/// concurrent callers for the same key share the in-flight result. A failed
/// producer notifies every waiter and leaves the entry retryable rather than
/// poisoned.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the value for `key`, invoking `producer` only on a stale or
    /// absent entry.
    ///
    /// `stale_time` bounds how long a stored value is served without a
    /// refetch; `gc_time` bounds how long an unused entry survives at all.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &CacheKey,
        stale_time: Duration,
        gc_time: Duration,
        producer: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let key = key.to_string();

        // The map lock is only ever held between awaits, never across one.
        let plan = {
            let mut entries = self.lock_entries();
            Self::sweep(&mut entries);

            let now = Instant::now();
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                value: None,
                in_flight: None,
                last_access: now,
                gc_time,
            });
            entry.last_access = now;
            entry.gc_time = gc_time;

            if let Some(stored) = &entry.value {
                if stored.fetched_at.elapsed() < stale_time {
                    tracing::debug!(key = %key, "Cache hit");
                    Plan::Hit(stored.json.clone())
                } else if let Some(rx) = &entry.in_flight {
                    tracing::debug!(key = %key, "Cache stale, refetch in flight");
                    Plan::Wait(rx.clone())
                } else {
                    tracing::debug!(key = %key, "Cache stale, refetching");
                    let (tx, rx) = watch::channel(None);
                    entry.in_flight = Some(rx);
                    Plan::Produce(tx)
                }
            } else if let Some(rx) = &entry.in_flight {
                tracing::debug!(key = %key, "Coalescing onto in-flight fetch");
                Plan::Wait(rx.clone())
            } else {
                tracing::debug!(key = %key, "Cache miss");
                let (tx, rx) = watch::channel(None);
                entry.in_flight = Some(rx);
                Plan::Produce(tx)
            }
        };

        match plan {
            Plan::Hit(json) => Self::decode(&json),
            Plan::Wait(rx) => self.wait_for_outcome(rx).await,
            Plan::Produce(tx) => self.produce(&key, tx, producer).await,
        }
    }

    async fn produce<T, F, Fut>(
        &self,
        key: &str,
        tx: watch::Sender<SharedOutcome>,
        producer: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let outcome = match producer().await {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(json) => Ok((value, json)),
                Err(e) => Err(AppError::Internal(format!(
                    "Cache serialization error: {}",
                    e
                ))),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok((value, json)) => {
                let mut entries = self.lock_entries();
                if let Some(entry) = entries.get_mut(key) {
                    entry.value = Some(Stored {
                        json: json.clone(),
                        fetched_at: Instant::now(),
                    });
                    entry.in_flight = None;
                }
                drop(entries);

                let _ = tx.send(Some(Ok(json)));
                Ok(value)
            }
            Err(e) => {
                // Leave the last good value in place; only the pending
                // marker is cleared so the next caller retries.
                let mut entries = self.lock_entries();
                if let Some(entry) = entries.get_mut(key) {
                    entry.in_flight = None;
                }
                drop(entries);

                tracing::warn!(key = %key, error = %e, "Cache producer failed");
                let _ = tx.send(Some(Err(e.to_string())));
                Err(e)
            }
        }
    }

    async fn wait_for_outcome<T: DeserializeOwned>(
        &self,
        mut rx: watch::Receiver<SharedOutcome>,
    ) -> AppResult<T> {
        let outcome = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|_| AppError::Cache("in-flight fetch was abandoned".to_string()))?
            .clone();

        match outcome {
            Some(Ok(json)) => Self::decode(&json),
            Some(Err(message)) => Err(AppError::Cache(message)),
            None => unreachable!("wait_for yields only settled outcomes"),
        }
    }

    fn decode<T: DeserializeOwned>(json: &str) -> AppResult<T> {
        serde_json::from_str(json)
            .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))
    }

    /// Evicts entries idle past their gc horizon. Entries with a live
    /// producer survive so waiters are never orphaned; a producer dropped
    /// without settling leaves a closed, empty channel behind, and that
    /// marker is cleared so the key becomes fetchable again.
    fn sweep(entries: &mut HashMap<String, Entry>) {
        entries.retain(|key, entry| {
            if let Some(rx) = &entry.in_flight {
                let abandoned = rx.has_changed().is_err() && rx.borrow().is_none();
                if abandoned {
                    tracing::debug!(key = %key, "Clearing abandoned in-flight fetch");
                    entry.in_flight = None;
                } else {
                    return true;
                }
            }

            let keep = entry.last_access.elapsed() < entry.gc_time;
            if !keep {
                tracing::debug!(key = %key, "Evicting idle cache entry");
            }
            keep
        });
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock_entries().len()
    }
}
