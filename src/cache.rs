//! Time-bounded cache for loaded source tables.
//!
//! Only raw inputs are cached. Everything derived from them is recomputed on
//! every run, so a stale entry can at worst delay picking up edited files by
//! one TTL.

use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};
use log::debug;

#[derive(Debug)]
struct CacheEntry<T> {
    value: T,
    created: Instant,
    loaded_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct SourceCache<T> {
    ttl: Duration,
    entry: Option<CacheEntry<T>>,
    loads: usize,
}

impl<T> SourceCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: None,
            loads: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// True while an entry exists and is younger than the TTL. A zero TTL is
    /// never fresh.
    pub fn is_fresh(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|entry| entry.created.elapsed() < self.ttl)
    }

    /// Returns the cached value, calling `load` first when there is none or
    /// it has expired. A failed load keeps the previous entry.
    pub fn get_or_load<F>(&mut self, load: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.is_fresh() {
            let value = load()?;
            self.loads += 1;
            debug!("Source cache refreshed (load #{})", self.loads);
            self.entry = Some(CacheEntry {
                value,
                created: Instant::now(),
                loaded_at: Local::now(),
            });
        }
        self.entry
            .as_ref()
            .map(|entry| &entry.value)
            .ok_or_else(|| anyhow!("Source cache is empty after loading"))
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.entry.as_ref().map(|entry| entry.loaded_at)
    }

    /// Number of successful loads so far.
    pub fn loads(&self) -> usize {
        self.loads
    }
}
