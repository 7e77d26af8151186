//! Lock-free counters for per-option profiling
//!
//! A [`MetricsRegistry`] belongs to one engine instance and is handed to
//! it at construction time; nothing here is process-global.

use crate::{NidsError, NidsResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// High-performance counter for lock-free metrics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Evaluation counters for one detection-option keyword
#[derive(Debug, Default)]
pub struct OptionCounters {
    /// Times an option with this keyword was evaluated
    pub checks: AtomicCounter,
    /// Times the evaluation matched
    pub matches: AtomicCounter,
}

impl OptionCounters {
    /// Record one evaluation
    #[inline(always)]
    pub fn record(&self, matched: bool) {
        self.checks.inc();
        if matched {
            self.matches.inc();
        }
    }

    /// Get snapshot
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            checks: self.checks.get(),
            matches: self.matches.get(),
        }
    }
}

/// Counter snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Evaluations
    pub checks: u64,
    /// Matches
    pub matches: u64,
}

/// Per-engine metrics registry
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    options: DashMap<String, Arc<OptionCounters>>,
}

impl MetricsRegistry {
    /// Create new registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `keyword`, registering them on first use
    pub fn option_counters(&self, keyword: &str) -> NidsResult<Arc<OptionCounters>> {
        if keyword.is_empty() {
            return Err(NidsError::InvalidMetricKey(keyword.to_string()));
        }

        let counters = self
            .options
            .entry(keyword.to_string())
            .or_insert_with(|| {
                tracing::trace!(keyword, "registering option counters");
                Arc::new(OptionCounters::default())
            })
            .clone();

        Ok(counters)
    }

    /// Snapshot for `keyword`, if it was ever registered
    pub fn snapshot(&self, keyword: &str) -> Option<CounterSnapshot> {
        self.options.get(keyword).map(|c| c.snapshot())
    }

    /// Registered keywords
    pub fn keywords(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.options.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new(0);
        assert_eq!(counter.inc(), 0);
        assert_eq!(counter.inc(), 1);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_registry_shares_counters_per_keyword() {
        let registry = MetricsRegistry::new();
        let a = registry.option_counters("cvs").unwrap();
        let b = registry.option_counters("cvs").unwrap();

        a.record(true);
        b.record(false);

        assert_eq!(
            registry.snapshot("cvs"),
            Some(CounterSnapshot { checks: 2, matches: 1 })
        );
        assert_eq!(registry.keywords(), vec!["cvs".to_string()]);
    }

    #[test]
    fn test_registry_rejects_empty_keyword() {
        let registry = MetricsRegistry::new();
        assert!(registry.option_counters("").is_err());
        assert!(registry.snapshot("missing").is_none());
    }
}
