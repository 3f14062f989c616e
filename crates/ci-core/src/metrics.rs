// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

//! A point-in-time counter/gauge registry.
//!
//! This is a gauge snapshot, not a metrics pipeline: no histograms, no
//! export format, no time series. Each binary's `/metrics` endpoint calls
//! [`Registry::snapshot`] and serializes the result directly; there is
//! nothing here for trend analysis over time.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone)]
pub struct Registry {
    counters: Arc<RwLock<HashMap<&'static str, Arc<AtomicI64>>>>,
    gauges: Arc<RwLock<HashMap<&'static str, Arc<AtomicI64>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a named counter by `delta`, creating it at zero if absent.
    pub fn incr(&self, name: &'static str, delta: i64) {
        let cell = self.cell(&self.counters, name);
        cell.fetch_add(delta, Ordering::Relaxed);
    }

    /// Set a named gauge to `value`, creating it if absent.
    pub fn set_gauge(&self, name: &'static str, value: i64) {
        let cell = self.cell(&self.gauges, name);
        cell.store(value, Ordering::Relaxed);
    }

    fn cell(
        &self,
        map: &Arc<RwLock<HashMap<&'static str, Arc<AtomicI64>>>>,
        name: &'static str,
    ) -> Arc<AtomicI64> {
        if let Some(existing) = map.read().get(name) {
            return existing.clone();
        }
        map.write().entry(name).or_insert_with(|| Arc::new(AtomicI64::new(0))).clone()
    }

    /// A point-in-time snapshot of every counter and gauge, suitable for
    /// serializing straight into a `/metrics` JSON response.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .iter()
            .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
            .collect();
        let gauges = self
            .gauges
            .read()
            .iter()
            .map(|(k, v)| (k.to_string(), v.load(Ordering::Relaxed)))
            .collect();
        MetricsSnapshot { counters, gauges }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, i64>,
    pub gauges: HashMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_clones() {
        let registry = Registry::new();
        let clone = registry.clone();

        registry.incr("jobs_submitted", 1);
        clone.incr("jobs_submitted", 2);

        assert_eq!(registry.snapshot().counters["jobs_submitted"], 3);
    }

    #[test]
    fn gauges_overwrite_rather_than_accumulate() {
        let registry = Registry::new();
        registry.set_gauge("pending_decisions", 5);
        registry.set_gauge("pending_decisions", 2);

        assert_eq!(registry.snapshot().gauges["pending_decisions"], 2);
    }

    #[test]
    fn unknown_metric_is_absent_not_zero() {
        let registry = Registry::new();
        assert!(!registry.snapshot().counters.contains_key("nope"));
    }
}
