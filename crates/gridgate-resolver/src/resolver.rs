//! The two-tier resolver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gridgate_cache::{CacheStats, TtlCache};
use gridgate_core::{GridError, GridResult, HubUrl};

use crate::backend::DirectoryBackend;

/// Initial limits of the two tiers.
///
/// The defaults mirror the production settings: the services tier keeps
/// one hour of bindings for up to 200k references, the directory tier is
/// unbounded and never expires (directory sets move rarely).
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub high_ttl: u64,
    pub high_max: u32,
    pub low_ttl: u64,
    pub low_max: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            high_ttl: 0,
            high_max: 0,
            low_ttl: 3600,
            low_max: 200_000,
        }
    }
}

/// Statistics of both tiers plus the shared clock reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverStats {
    pub clock: u64,
    pub high: CacheStats,
    pub low: CacheStats,
}

/// Two-tier cached resolver.
///
/// Both tiers are guarded by plain mutexes held only for the in-memory
/// operation; upstream lookups happen with no lock held, so concurrent
/// misses may fill the same entry twice (harmless, last write wins).
pub struct Resolver {
    high: Mutex<TtlCache<Vec<String>>>,
    low: Mutex<TtlCache<Vec<String>>>,
    clock: AtomicU64,
    backend: Arc<dyn DirectoryBackend>,
}

fn high_key(ns: &str) -> String {
    format!("csm0|{}", ns)
}

fn low_key(ns: &str, reference: &str, srvtype: &str) -> String {
    format!("{}|{}|{}", ns, reference, srvtype)
}

fn low_key_prefix(ns: &str, reference: &str) -> String {
    format!("{}|{}|", ns, reference)
}

fn require_ns(url: &HubUrl) -> GridResult<&str> {
    url.ns().ok_or_else(|| GridError::bad_request("Missing NS"))
}

fn require_reference(url: &HubUrl) -> GridResult<&str> {
    url.reference()
        .ok_or_else(|| GridError::bad_request("Missing REF"))
}

impl Resolver {
    pub fn new(backend: Arc<dyn DirectoryBackend>, config: ResolverConfig) -> Self {
        Self {
            high: Mutex::new(TtlCache::new(config.high_max, config.high_ttl)),
            low: Mutex::new(TtlCache::new(config.low_max, config.low_ttl)),
            clock: AtomicU64::new(0),
            backend,
        }
    }

    /// Advances the shared clock used to stamp and expire entries.
    pub fn set_now(&self, now: u64) {
        self.clock.store(now, Ordering::Relaxed);
    }

    fn now(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Directory (meta1) addresses of the URL's namespace.
    pub async fn resolve_directory(&self, url: &HubUrl) -> GridResult<Vec<String>> {
        let ns = require_ns(url)?;
        let key = high_key(ns);
        if let Some(hit) = self.high.lock().unwrap().get(&key) {
            return Ok(hit);
        }
        let urls = self
            .backend
            .directory_urls(ns)
            .await
            .map_err(|e| e.prefixed("csm0: "))?;
        tracing::debug!(ns, count = urls.len(), "directory set resolved");
        self.high.lock().unwrap().put(&key, urls.clone(), self.now());
        Ok(urls)
    }

    /// Packed service URLs of `srvtype` linked to the URL's reference.
    ///
    /// On a miss the directory replicas are queried in order; a replica
    /// failing with a transport error is skipped, an application error
    /// surfaces immediately.
    pub async fn resolve_service(&self, url: &HubUrl, srvtype: &str) -> GridResult<Vec<String>> {
        let ns = require_ns(url)?;
        let reference = require_reference(url)?;
        let key = low_key(ns, reference, srvtype);
        if let Some(hit) = self.low.lock().unwrap().get(&key) {
            return Ok(hit);
        }

        let dirs = self.resolve_directory(url).await?;
        if dirs.is_empty() {
            return Err(GridError::container_not_found("No directory for namespace"));
        }

        let mut last: Option<GridError> = None;
        for dir in &dirs {
            match self.backend.reference_services(dir, url, srvtype).await {
                Ok(services) => {
                    self.low
                        .lock()
                        .unwrap()
                        .put(&key, services.clone(), self.now());
                    return Ok(services);
                }
                Err(e) if e.is_transport() => {
                    tracing::info!(dir = %dir, error = %e, "directory replica unreachable");
                    last = Some(e.prefixed("meta1: "));
                }
                Err(e) => return Err(e.prefixed("meta1: ")),
            }
        }
        Err(last.unwrap_or_else(|| GridError::network("No directory replied")))
    }

    /// Drops the cached binding of one `(reference, type)` pair.
    pub fn decache_service(&self, url: &HubUrl, srvtype: &str) {
        if let (Some(ns), Some(reference)) = (url.ns(), url.reference()) {
            self.low
                .lock()
                .unwrap()
                .remove(&low_key(ns, reference, srvtype));
        }
    }

    /// Drops every cached binding derived from the URL's reference,
    /// whatever the service type.
    pub fn decache_reference(&self, url: &HubUrl) {
        if let (Some(ns), Some(reference)) = (url.ns(), url.reference()) {
            let removed = self
                .low
                .lock()
                .unwrap()
                .remove_prefix(&low_key_prefix(ns, reference));
            if removed > 0 {
                tracing::debug!(ns, reference, removed, "reference decached");
            }
        }
    }

    /// Time-based eviction pass over both tiers at the current clock.
    /// Returns the total evicted count.
    pub fn expire(&self) -> u64 {
        let now = self.now();
        self.high.lock().unwrap().expire(now) + self.low.lock().unwrap().expire(now)
    }

    /// Size-bound pass over both tiers. Returns the total evicted count.
    pub fn purge(&self) -> u64 {
        let now = self.now();
        self.high.lock().unwrap().purge(now) + self.low.lock().unwrap().purge(now)
    }

    pub fn flush_high(&self) {
        self.high.lock().unwrap().flush();
    }

    pub fn flush_low(&self) {
        self.low.lock().unwrap().flush();
    }

    pub fn set_ttl_high(&self, ttl: u64) {
        self.high.lock().unwrap().set_ttl(ttl);
    }

    pub fn set_ttl_low(&self, ttl: u64) {
        self.low.lock().unwrap().set_ttl(ttl);
    }

    pub fn set_max_high(&self, max: u32) {
        self.high.lock().unwrap().set_max(max);
    }

    pub fn set_max_low(&self, max: u32) {
        self.low.lock().unwrap().set_max(max);
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            clock: self.now(),
            high: self.high.lock().unwrap().stats(),
            low: self.low.lock().unwrap().stats(),
        }
    }
}
