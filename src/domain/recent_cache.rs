//! TTL-windowed view of recent trades, keyed by symbol.
//!
//! Each symbol owns one bucket. Writing to a bucket resets its expiry to
//! `now + ttl`; once that passes, the whole bucket is evicted and handed to the
//! [`EvictionObserver`] exactly once. Every access expires all stale buckets,
//! not just the one it touches, so buckets for symbols that are queried once
//! and never written do not pile up. A background sweeper thread can do the
//! same on a timer.
//!
//! All bucket mutation (append, expiry check, removal, observer call) happens
//! under one lock, so a write never races an eviction of the same bucket.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::domain::error::GbceError;
use crate::domain::trade::{normalize_symbol, Trade};
use crate::ports::clock_port::{Clock, SystemClock};
use crate::ports::ledger_port::{EvictionObserver, TradeLoader};

pub const DEFAULT_TTL: Duration = Duration::from_millis(2000);

struct Bucket {
    trades: Vec<Arc<Trade>>,
    written_at: Instant,
}

pub struct RecentTradeCache {
    ttl: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
    loader: Arc<dyn TradeLoader>,
    observer: Arc<dyn EvictionObserver>,
    clock: Arc<dyn Clock>,
}

impl RecentTradeCache {
    pub fn new(
        ttl: Duration,
        loader: Arc<dyn TradeLoader>,
        observer: Arc<dyn EvictionObserver>,
    ) -> Self {
        Self::with_clock(ttl, loader, observer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ttl: Duration,
        loader: Arc<dyn TradeLoader>,
        observer: Arc<dyn EvictionObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        RecentTradeCache {
            ttl,
            buckets: Mutex::new(HashMap::new()),
            loader,
            observer,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The symbol's live bucket. On a miss the bucket is loaded through the
    /// [`TradeLoader`] (empty if the symbol has no live trades) and cached.
    pub fn get(&self, symbol: &str) -> Result<Vec<Arc<Trade>>, GbceError> {
        let key = normalize_symbol(symbol);
        {
            let mut buckets = self.buckets.lock();
            let now = self.clock.now();
            self.expire_all(&mut buckets, now);
            if let Some(bucket) = buckets.get(&key) {
                debug!(symbol = %key, trades = bucket.trades.len(), "recent cache hit");
                return Ok(bucket.trades.clone());
            }
        }

        // Load without the cache lock held; the loader reads the ledger.
        let mut loaded = self
            .loader
            .load_recent(&key)
            .map_err(|e| GbceError::ExecutionFailure {
                reason: format!("loading recent trades for {key}: {e}"),
            })?;

        let mut buckets = self.buckets.lock();
        let now = self.clock.now();
        self.expire_all(&mut buckets, now);
        if let Some(bucket) = buckets.get(&key) {
            // A writer created the bucket while we were loading.
            return Ok(bucket.trades.clone());
        }
        // Anything evicted while we were loading is no longer recent.
        loaded.retain(|t| !t.is_aged_out());
        debug!(symbol = %key, trades = loaded.len(), "recent cache loaded");
        buckets.insert(
            key,
            Bucket {
                trades: loaded.clone(),
                written_at: now,
            },
        );
        Ok(loaded)
    }

    /// Appends `trade` to the symbol's bucket and resets its expiry.
    pub fn upsert(&self, symbol: &str, trade: Arc<Trade>) {
        let key = normalize_symbol(symbol);
        let mut buckets = self.buckets.lock();
        let now = self.clock.now();
        self.expire_all(&mut buckets, now);
        let bucket = buckets.entry(key).or_insert_with(|| Bucket {
            trades: Vec::new(),
            written_at: now,
        });
        bucket.trades.push(trade);
        bucket.written_at = now;
    }

    /// Every trade in every live bucket.
    pub fn snapshot_all(&self) -> Vec<Arc<Trade>> {
        let mut buckets = self.buckets.lock();
        let now = self.clock.now();
        self.expire_all(&mut buckets, now);
        buckets
            .values()
            .flat_map(|b| b.trades.iter().cloned())
            .collect()
    }

    /// Evicts every expired bucket. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        let mut buckets = self.buckets.lock();
        let now = self.clock.now();
        self.expire_all(&mut buckets, now)
    }

    /// Number of unexpired buckets.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.lock();
        let now = self.clock.now();
        buckets
            .values()
            .filter(|b| !self.is_expired(b, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a thread that sweeps every `interval`. The thread exits when the
    /// returned handle is dropped or the cache itself is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> io::Result<SweeperHandle> {
        let cache: Weak<RecentTradeCache> = Arc::downgrade(self);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("gbce-cache-sweeper".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let Some(cache) = cache.upgrade() else { break };
                        let evicted = cache.sweep();
                        if evicted > 0 {
                            debug!(evicted, "background sweep evicted buckets");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(SweeperHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn is_expired(&self, bucket: &Bucket, now: Instant) -> bool {
        now.saturating_duration_since(bucket.written_at) >= self.ttl
    }

    fn expire_all(&self, buckets: &mut HashMap<String, Bucket>, now: Instant) -> usize {
        let expired: Vec<String> = buckets
            .iter()
            .filter(|(_, b)| self.is_expired(b, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            if let Some(bucket) = buckets.remove(key) {
                self.notify(key, &bucket);
            }
        }
        expired.len()
    }

    fn notify(&self, key: &str, bucket: &Bucket) {
        debug!(symbol = key, trades = bucket.trades.len(), "evicting recent bucket");
        if let Err(e) = self.observer.on_evict(key, &bucket.trades) {
            warn!(symbol = key, error = %e, "eviction observer failed");
        }
    }
}

/// Stops the background sweeper on drop.
pub struct SweeperHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{NewTrade, Side};
    use crate::ports::clock_port::ManualClock;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_millis(2000);

    #[derive(Default)]
    struct Recorder {
        loads: AtomicUsize,
        evictions: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    impl TradeLoader for Recorder {
        fn load_recent(&self, _symbol: &str) -> Result<Vec<Arc<Trade>>, GbceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GbceError::internal("ledger unavailable"));
            }
            Ok(Vec::new())
        }
    }

    impl EvictionObserver for Recorder {
        fn on_evict(&self, symbol: &str, trades: &[Arc<Trade>]) -> Result<(), GbceError> {
            self.evictions.lock().push((symbol.to_string(), trades.len()));
            for t in trades {
                t.mark_aged_out();
            }
            if self.fail {
                return Err(GbceError::internal("observer refused"));
            }
            Ok(())
        }
    }

    fn trade(symbol: &str, price: rust_decimal::Decimal) -> Arc<Trade> {
        Arc::new(Trade::record(NewTrade::new(
            symbol,
            Utc::now(),
            1,
            Side::Buy,
            price,
        )))
    }

    fn cache_with(recorder: Arc<Recorder>) -> (RecentTradeCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache =
            RecentTradeCache::with_clock(TTL, recorder.clone(), recorder, clock.clone());
        (cache, clock)
    }

    #[test]
    fn upsert_then_get_returns_bucket_without_loading() {
        let recorder = Arc::new(Recorder::default());
        let (cache, _clock) = cache_with(recorder.clone());

        cache.upsert("TEA", trade("TEA", dec!(10)));
        cache.upsert("tea", trade("TEA", dec!(11)));

        let bucket = cache.get("Tea").unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[1].price(), dec!(11));
        assert_eq!(recorder.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn miss_loads_and_caches_empty_bucket() {
        let recorder = Arc::new(Recorder::default());
        let (cache, _clock) = cache_with(recorder.clone());

        assert!(cache.get("POP").unwrap().is_empty());
        assert!(cache.get("POP").unwrap().is_empty());
        assert_eq!(recorder.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn any_access_evicts_stale_buckets_of_other_symbols() {
        let recorder = Arc::new(Recorder::default());
        let (cache, clock) = cache_with(recorder.clone());
        for symbol in ["AAA", "BBB", "CCC"] {
            assert!(cache.get(symbol).unwrap().is_empty());
        }
        assert_eq!(cache.buckets.lock().len(), 3);

        clock.advance(TTL);
        assert!(cache.get("DDD").unwrap().is_empty());
        assert_eq!(cache.buckets.lock().len(), 1);

        clock.advance(TTL);
        cache.upsert("TEA", trade("TEA", dec!(1)));
        let buckets = cache.buckets.lock();
        assert_eq!(buckets.len(), 1);
        assert!(buckets.contains_key("TEA"));
    }

    #[test]
    fn loader_failure_is_execution_failure() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let (cache, _clock) = cache_with(recorder);
        assert!(matches!(
            cache.get("POP"),
            Err(GbceError::ExecutionFailure { .. })
        ));
    }

    #[test]
    fn bucket_expires_after_ttl_and_fires_once() {
        let recorder = Arc::new(Recorder::default());
        let (cache, clock) = cache_with(recorder.clone());
        let t = trade("ALE", dec!(23));
        cache.upsert("ALE", t.clone());

        clock.advance(TTL - Duration::from_millis(1));
        assert_eq!(cache.get("ALE").unwrap().len(), 1);

        clock.advance(Duration::from_millis(1));
        assert!(cache.get("ALE").unwrap().is_empty());
        assert!(t.is_aged_out());
        assert_eq!(cache.sweep(), 0);
        assert_eq!(
            recorder.evictions.lock().as_slice(),
            &[("ALE".to_string(), 1)]
        );
    }

    #[test]
    fn write_resets_whole_bucket_expiry() {
        let recorder = Arc::new(Recorder::default());
        let (cache, clock) = cache_with(recorder.clone());
        let first = trade("GIN", dec!(1));
        cache.upsert("GIN", first.clone());

        clock.advance(Duration::from_millis(1500));
        cache.upsert("GIN", trade("GIN", dec!(2)));
        clock.advance(Duration::from_millis(1500));

        // 3s after the first write, but only 1.5s after the last one.
        assert_eq!(cache.get("GIN").unwrap().len(), 2);
        assert!(!first.is_aged_out());
    }

    #[test]
    fn upsert_into_expired_bucket_evicts_old_trades_first() {
        let recorder = Arc::new(Recorder::default());
        let (cache, clock) = cache_with(recorder.clone());
        let old = trade("JOE", dec!(13));
        cache.upsert("JOE", old.clone());

        clock.advance(TTL * 2);
        let fresh = trade("JOE", dec!(14));
        cache.upsert("JOE", fresh.clone());

        let bucket = cache.get("JOE").unwrap();
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].id(), fresh.id());
        assert!(old.is_aged_out());
        assert!(!fresh.is_aged_out());
    }

    #[test]
    fn snapshot_all_sees_only_live_buckets() {
        let recorder = Arc::new(Recorder::default());
        let (cache, clock) = cache_with(recorder.clone());
        cache.upsert("TEA", trade("TEA", dec!(1)));
        clock.advance(Duration::from_millis(1500));
        cache.upsert("POP", trade("POP", dec!(2)));
        cache.upsert("POP", trade("POP", dec!(3)));
        clock.advance(Duration::from_millis(600));

        let all = cache.snapshot_all();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.symbol() == "POP"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn observer_failure_does_not_stop_the_sweep() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let (cache, clock) = cache_with(recorder.clone());
        cache.upsert("TEA", trade("TEA", dec!(1)));
        cache.upsert("POP", trade("POP", dec!(2)));
        clock.advance(TTL);

        assert_eq!(cache.sweep(), 2);
        assert_eq!(recorder.evictions.lock().len(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn background_sweeper_evicts_without_access() {
        let recorder = Arc::new(Recorder::default());
        let cache = Arc::new(RecentTradeCache::new(
            Duration::from_millis(20),
            recorder.clone(),
            recorder.clone(),
        ));
        let t = trade("TEA", dec!(5));
        cache.upsert("TEA", t.clone());

        let handle = cache.spawn_sweeper(Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !t.is_aged_out() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        drop(handle);

        assert!(t.is_aged_out());
        assert_eq!(recorder.evictions.lock().len(), 1);
    }
}
