//! Time-bounded, single-flight cache in front of a [`MappingSource`].
//!
//! # Responsibilities
//! - Answer `resolve(country)` from the current snapshot without locking
//! - Lazily refresh on the first request that observes staleness
//! - Coalesce concurrent refreshes into one fetch
//! - Keep the last good mapping when a refresh fails
//!
//! # Design Decisions
//! - The current entry lives in an `ArcSwapOption` and is replaced whole
//! - The in-flight fetch is a `Shared` future; the mutex around it is only
//!   held to decide between joining and starting, never across an await
//! - The fetch itself runs on a spawned task, so it completes even when the
//!   request that started it is cancelled

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::time::{timeout, Instant};

use crate::config::GeoRewriteConfig;
use crate::mapping::source::MappingSource;
use crate::mapping::types::{CountryMapping, MappingError, MappingResult};
use crate::observability::metrics;

type Flight = Shared<BoxFuture<'static, MappingResult<Arc<CountryMapping>>>>;

/// One successfully fetched mapping and when it was fetched.
#[derive(Debug)]
struct CacheEntry {
    mapping: Arc<CountryMapping>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(mapping: CountryMapping) -> Self {
        Self {
            mapping: Arc::new(mapping),
            fetched_at: Instant::now(),
        }
    }

    /// Whether this entry may still be served without a refresh.
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.fetched_at.elapsed() < ttl,
            None => true,
        }
    }

    fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

/// Point-in-time view of the cache for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub fresh: bool,
    pub age_secs: Option<u64>,
    pub ttl_secs: Option<u64>,
    pub countries: usize,
    pub fetch_in_flight: bool,
}

struct CacheInner {
    source: Arc<dyn MappingSource>,
    ttl: Option<Duration>,
    fetch_timeout: Duration,
    current: ArcSwapOption<CacheEntry>,
    in_flight: Mutex<Option<Flight>>,
}

impl CacheInner {
    /// Run one bounded fetch and publish its result.
    async fn refresh(&self) -> MappingResult<Arc<CountryMapping>> {
        // Dropped after the entry is published, including on panic or abort.
        let _slot = FlightSlot(&self.in_flight);

        let outcome = match timeout(self.fetch_timeout, self.source.fetch_mapping()).await {
            Ok(result) => result,
            Err(_) => Err(MappingError::Timeout(self.fetch_timeout)),
        };

        match outcome {
            Ok(mapping) => {
                let entry = Arc::new(CacheEntry::new(mapping));
                let mapping = Arc::clone(&entry.mapping);
                self.current.store(Some(entry));
                metrics::record_mapping_fetch("success");
                tracing::info!(countries = mapping.len(), "Country mapping refreshed");
                Ok(mapping)
            }
            Err(err) => {
                metrics::record_mapping_fetch(fetch_outcome(&err));
                tracing::warn!(error = %err, "Country mapping fetch failed");
                Err(err)
            }
        }
    }
}

/// Empties the in-flight slot when the refresh task ends, however it ends.
struct FlightSlot<'a>(&'a Mutex<Option<Flight>>);

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn fetch_outcome(err: &MappingError) -> &'static str {
    match err {
        MappingError::Timeout(_) => "timeout",
        MappingError::Parse(_) => "parse_error",
        MappingError::Config(_) => "config_error",
        _ => "fetch_error",
    }
}

/// Shared handle to the country mapping cache.
///
/// Cheap to clone; all clones see the same entry and the same in-flight
/// fetch.
#[derive(Clone)]
pub struct MappingCache {
    inner: Arc<CacheInner>,
}

impl MappingCache {
    /// Create an empty cache. `ttl` of `None` keeps the first mapping until
    /// the process exits.
    pub fn new(source: Arc<dyn MappingSource>, ttl: Option<Duration>, fetch_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                source,
                ttl,
                fetch_timeout,
                current: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Create a cache using the TTL and fetch timeout from configuration.
    pub fn from_config(source: Arc<dyn MappingSource>, config: &GeoRewriteConfig) -> Self {
        Self::new(source, config.cache.ttl(), config.mapping_source.timeout())
    }

    /// Landing path for `country`.
    ///
    /// `Ok(None)` means the country is not mapped. `Err` only when no mapping
    /// has ever been fetched and the fetch just failed.
    pub async fn resolve(&self, country: &str) -> MappingResult<Option<String>> {
        let mapping = self.snapshot().await?;
        Ok(mapping.get(country).map(str::to_owned))
    }

    /// Current mapping, refreshing first if stale.
    pub async fn snapshot(&self) -> MappingResult<Arc<CountryMapping>> {
        if let Some(mapping) = self.fresh_mapping() {
            metrics::record_cache_lookup("hit");
            return Ok(mapping);
        }
        metrics::record_cache_lookup("miss");

        let flight = self.join_flight(true);
        self.settle(flight.await)
    }

    /// Fetch now regardless of freshness, joining any fetch already running.
    ///
    /// Returns the fetch outcome itself; a failure still leaves the previous
    /// mapping in place.
    pub async fn refresh(&self) -> MappingResult<Arc<CountryMapping>> {
        self.join_flight(false).await
    }

    /// Describe the cache without triggering a fetch.
    pub fn status(&self) -> CacheStatus {
        let entry = self.inner.current.load_full();
        let fetch_in_flight = self
            .inner
            .in_flight
            .lock()
            .expect("mapping flight mutex poisoned")
            .is_some();

        CacheStatus {
            populated: entry.is_some(),
            fresh: entry.as_ref().is_some_and(|e| e.is_fresh(self.inner.ttl)),
            age_secs: entry.as_ref().map(|e| e.age().as_secs()),
            ttl_secs: self.inner.ttl.map(|ttl| ttl.as_secs()),
            countries: entry.as_ref().map_or(0, |e| e.mapping.len()),
            fetch_in_flight,
        }
    }

    /// Last successfully fetched mapping, fresh or not.
    pub fn current(&self) -> Option<Arc<CountryMapping>> {
        self.inner
            .current
            .load_full()
            .map(|entry| Arc::clone(&entry.mapping))
    }

    fn fresh_mapping(&self) -> Option<Arc<CountryMapping>> {
        self.inner
            .current
            .load_full()
            .filter(|entry| entry.is_fresh(self.inner.ttl))
            .map(|entry| Arc::clone(&entry.mapping))
    }

    /// Join the running fetch or start one.
    ///
    /// With `reuse_fresh`, freshness is checked again under the lock: a fetch
    /// that completed since the caller's first look is not repeated.
    fn join_flight(&self, reuse_fresh: bool) -> Flight {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .expect("mapping flight mutex poisoned");

        if let Some(flight) = slot.as_ref() {
            return flight.clone();
        }
        if reuse_fresh {
            if let Some(mapping) = self.fresh_mapping() {
                return future::ready(Ok(mapping)).boxed().shared();
            }
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.refresh().await });
        let flight = async move {
            task.await.unwrap_or_else(|e| {
                Err(MappingError::Fetch(format!("mapping refresh task failed: {e}")))
            })
        }
        .boxed()
        .shared();

        tracing::debug!("Starting country mapping fetch");
        *slot = Some(flight.clone());
        flight
    }

    /// Fall back to the last good mapping when a refresh failed.
    fn settle(&self, outcome: MappingResult<Arc<CountryMapping>>) -> MappingResult<Arc<CountryMapping>> {
        match outcome {
            Ok(mapping) => Ok(mapping),
            Err(err) => match self.current() {
                Some(previous) => {
                    tracing::debug!(error = %err, "Serving previous country mapping");
                    Ok(previous)
                }
                None => Err(MappingError::Unavailable(err.to_string())),
            },
        }
    }
}

impl std::fmt::Debug for MappingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingCache")
            .field("ttl", &self.inner.ttl)
            .field("fetch_timeout", &self.inner.fetch_timeout)
            .finish()
    }
}
