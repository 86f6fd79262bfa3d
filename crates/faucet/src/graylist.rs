//! Graylist of recently topped-up addresses.
//!
//! An address that received a top-up stays graylisted for the configured TTL.
//! Storage is a bounded `moka` cache (LRU eviction, TTL purge); liveness is
//! also checked lazily against the injected [`Clock`] so expiry does not
//! depend on when the cache gets around to housekeeping.

use crate::config::GraylistConfig;
use crate::metrics;
use chrono::{DateTime, Utc};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::milliseconds(by.as_millis() as i64);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Outcome of [`Graylist::try_admit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The address was clear and is now graylisted from the given time.
    Admitted,
    /// The address already has a live entry; nothing was changed.
    Graylisted {
        since: DateTime<Utc>,
        remaining: Duration,
    },
}

pub struct Graylist {
    entries: Cache<String, DateTime<Utc>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Graylist {
    pub fn new(config: &GraylistConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_size)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            ttl: config.ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Last top-up time of `address`, if its entry is still live.
    pub fn is_graylisted(&self, address: &str) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        self.entries
            .get(address)
            .filter(|since| self.is_live(*since, now))
    }

    /// Records a top-up at `now`, restarting the cooldown.
    pub fn mark_topped_up(&self, address: &str, now: DateTime<Utc>) {
        self.entries.insert(address.to_string(), now);
        self.enforce_capacity();
    }

    /// Checks and records in one step. Concurrent calls for the same address
    /// are serialised by the cache, so exactly one of them is admitted.
    pub fn try_admit(&self, address: &str, now: DateTime<Utc>) -> Admission {
        let entry = self
            .entries
            .entry(address.to_string())
            .or_insert_with_if(|| now, |since| !self.is_live(*since, now));

        if entry.is_fresh() {
            self.enforce_capacity();
            Admission::Admitted
        } else {
            let since = entry.into_value();
            Admission::Graylisted {
                since,
                remaining: self.remaining(since, now),
            }
        }
    }

    /// Time left on an entry created at `since`, rounded up to whole seconds.
    pub fn remaining(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        let ttl = chrono::Duration::seconds(self.ttl.as_secs() as i64);
        let left_ms = ((since + ttl) - now).num_milliseconds().max(0);
        Duration::from_secs(((left_ms + 999) / 1000) as u64)
    }

    /// Drops expired entries and applies pending evictions.
    pub fn sweep(&self) {
        self.entries.run_pending_tasks();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.sweep();
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|(_, since)| self.is_live(*since, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodically runs [`Graylist::sweep`] until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let graylist = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let live = graylist.len();
                metrics::GRAYLIST_ENTRIES.set(live as f64);
                debug!("Graylist sweep done, {} entries", live);
            }
        })
    }

    // moka evicts over-capacity entries only during maintenance, and its
    // entry count lags behind unapplied writes, so every insert is applied
    // before the call returns.
    fn enforce_capacity(&self) {
        self.entries.run_pending_tasks();
    }

    fn is_live(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(since)
            .to_std()
            .map(|age| age < self.ttl)
            // entries stamped in the future are live
            .unwrap_or(true)
    }
}

/// Renders a cooldown as `3h 05m 09s`.
pub fn format_remaining(remaining: &Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
