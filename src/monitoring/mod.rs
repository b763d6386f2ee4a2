//! # Monitoring Module
//!
//! Counters for the cluster queries issued by the reader. Failed queries are
//! downgraded to empty results, so these counters are the only place where
//! degraded-mode operation becomes visible.

pub mod exposition;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cluster::Query;

/// Per-query attempt and failure counters.
#[derive(Debug, Default)]
pub struct QueryStats {
    attempts: [AtomicU64; Query::ALL.len()],
    failures: [AtomicU64; Query::ALL.len()],
}

impl QueryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, query: Query) {
        self.attempts[query.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, query: Query) {
        self.failures[query.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self, query: Query) -> u64 {
        self.attempts[query.index()].load(Ordering::Relaxed)
    }

    pub fn failures(&self, query: Query) -> u64 {
        self.failures[query.index()].load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_tracked_per_query() {
        let stats = QueryStats::new();
        stats.record_attempt(Query::Nodes);
        stats.record_attempt(Query::Nodes);
        stats.record_failure(Query::Nodes);
        stats.record_attempt(Query::Pods);

        assert_eq!(stats.attempts(Query::Nodes), 2);
        assert_eq!(stats.failures(Query::Nodes), 1);
        assert_eq!(stats.attempts(Query::Pods), 1);
        assert_eq!(stats.failures(Query::Pods), 0);
    }
}
