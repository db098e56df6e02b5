//! Chunk cache with fixed-window TTL refresh
//!
//! Maps a template key to its parsed chunk sequence. Entries count requests
//! and are re-fetched and re-parsed wholesale once they are older than the
//! expiration threshold; a hit inside the window returns the cached chunks
//! without touching the timestamp (the window is fixed, not sliding).
//! Entries are never evicted, only replaced.
//!
//! Fetch and parse failures never escape this layer: they degrade to a
//! single synthetic static chunk carrying the error text, so rendering can
//! proceed and show the problem in place. Failures are never stored: a
//! failed miss leaves the store empty and a failed refresh leaves the stale
//! entry untouched, so every subsequent call retries until the source is
//! readable again.

use crate::chunk::Chunk;
use crate::error::Result;
use crate::parser;
use crate::render::TemplateLoader;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a cached chunk sequence stays valid before a forced re-parse
pub const CACHE_EXPIRATION: Duration = Duration::from_millis(100_000);

/// Time source for TTL checks
///
/// Injected so expiry behavior is deterministically testable; the reported
/// duration is elapsed time since an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Monotonic wall clock anchored at construction
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// One cached template
struct CacheEntry {
    chunks: Arc<Vec<Chunk>>,
    /// When the chunks were last (re)parsed
    last_refresh: Duration,
    /// Lookups served for this key, refreshing or not
    requests: u64,
}

/// Cache of parsed chunk sequences, keyed by template source key
pub struct ChunkCache {
    enabled: bool,
    clock: Arc<dyn Clock>,
    entries: HashMap<String, CacheEntry>,
}

impl ChunkCache {
    /// Create a cache (disabled until [`set_enabled`](Self::set_enabled))
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: false,
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Lookups served for `key` so far, if the key has ever been cached
    pub fn request_count(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.requests)
    }

    /// Get the chunk sequence for `key`, fetching and parsing as needed.
    ///
    /// Never fails: unavailable source text and parse errors both yield a
    /// single static chunk embedding the key and the failure text. Failure
    /// results are served for the current call only, never cached: a failed
    /// miss stores nothing and a failed refresh keeps the stale entry (and
    /// its timestamp), so the next call retries the fetch. Callers that
    /// need hard parse failures should call [`parser::parse`] directly.
    pub fn get_chunks(&mut self, key: &str, loader: &dyn TemplateLoader) -> Arc<Vec<Chunk>> {
        if !self.enabled {
            // The store is neither read nor written when caching is off
            return match try_fetch_and_parse(key, loader) {
                Ok(chunks) => Arc::new(chunks),
                Err(err) => Arc::new(error_chunks(key, &err)),
            };
        }

        let now = self.clock.now();

        if let Some(entry) = self.entries.get_mut(key) {
            entry.requests += 1;
            let elapsed = now.saturating_sub(entry.last_refresh);
            if elapsed > CACHE_EXPIRATION {
                debug!("cache entry for '{key}' expired after {elapsed:?}, re-parsing");
                match try_fetch_and_parse(key, loader) {
                    Ok(chunks) => {
                        entry.chunks = Arc::new(chunks);
                        entry.last_refresh = now;
                    }
                    // Stale chunks and old timestamp stay in place so every
                    // call keeps retrying until the refresh succeeds
                    Err(err) => return Arc::new(error_chunks(key, &err)),
                }
            }
            return entry.chunks.clone();
        }

        debug!("cache miss for '{key}'");
        match try_fetch_and_parse(key, loader) {
            Ok(chunks) => {
                let chunks = Arc::new(chunks);
                self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        chunks: chunks.clone(),
                        last_refresh: now,
                        requests: 1,
                    },
                );
                chunks
            }
            // Nothing is stored; the next call is a fresh miss
            Err(err) => Arc::new(error_chunks(key, &err)),
        }
    }
}

fn try_fetch_and_parse(key: &str, loader: &dyn TemplateLoader) -> Result<Vec<Chunk>> {
    let text = loader.load(key)?;
    parser::parse(&text)
}

/// Degrade a fetch/parse failure to a single inline error chunk.
fn error_chunks(key: &str, err: &crate::Error) -> Vec<Chunk> {
    warn!("template '{key}' degraded to inline error: {err}");
    vec![Chunk::static_text(format!(
        "<div><h1>Error reading template ({key}): {err}</h1></div>"
    ))]
}
