//! Per-(provider, operation) reliability counters.
//!
//! The ledger is the only mutable shared resource in the core. It is an
//! explicit, injectable service rather than an ambient singleton: construct
//! one at startup, hand out `Arc<MetricsLedger>` clones, and reset it through
//! its own API. Counters are process-local and not persisted.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Counters for one (provider, operation) cell.
///
/// Monotonically non-decreasing until an explicit reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub total: u64,
    pub errors: u64,
    pub retries: u64,
}

/// Snapshot of the whole ledger: provider -> operation -> counters.
pub type LedgerSnapshot = HashMap<String, HashMap<String, OperationMetrics>>;

/// Process-wide reliability ledger.
///
/// Cells are created lazily on first record. All mutation happens under a
/// single write lock, so increments are safe on the multi-threaded runtime.
#[derive(Debug, Default)]
pub struct MetricsLedger {
    cells: RwLock<LedgerSnapshot>,
}

impl MetricsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call attempt for the given cell.
    pub fn record_attempt(&self, provider: &str, operation: &str) {
        self.bump(provider, operation, |m| m.total += 1);
    }

    /// Record one terminal (post-retry) failure for the given cell.
    pub fn record_error(&self, provider: &str, operation: &str) {
        self.bump(provider, operation, |m| m.errors += 1);
    }

    /// Record one retry wait for the given cell.
    pub fn record_retry(&self, provider: &str, operation: &str) {
        self.bump(provider, operation, |m| m.retries += 1);
    }

    fn bump(&self, provider: &str, operation: &str, apply: impl FnOnce(&mut OperationMetrics)) {
        let mut cells = self.cells.write();
        let cell = cells
            .entry(provider.to_string())
            .or_default()
            .entry(operation.to_string())
            .or_default();
        apply(cell);
    }

    /// Full ledger snapshot.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.cells.read().clone()
    }

    /// All cells for one provider, or `None` if it has never been recorded.
    pub fn provider(&self, provider: &str) -> Option<HashMap<String, OperationMetrics>> {
        self.cells.read().get(provider).cloned()
    }

    /// A single cell, or `None` if it has never been recorded.
    pub fn operation(&self, provider: &str, operation: &str) -> Option<OperationMetrics> {
        self.cells
            .read()
            .get(provider)
            .and_then(|ops| ops.get(operation))
            .copied()
    }

    /// Zero all counters for one provider, or for every provider when `None`.
    ///
    /// Cells survive a reset with zeroed counters so consumers keep seeing
    /// the known operations.
    pub fn reset(&self, provider: Option<&str>) {
        let mut cells = self.cells.write();
        match provider {
            Some(name) => {
                if let Some(ops) = cells.get_mut(name) {
                    for metrics in ops.values_mut() {
                        *metrics = OperationMetrics::default();
                    }
                }
            }
            None => {
                for ops in cells.values_mut() {
                    for metrics in ops.values_mut() {
                        *metrics = OperationMetrics::default();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate_per_cell() {
        let ledger = MetricsLedger::new();
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_error("jellyfin", "fetch_media");

        let cell = ledger.operation("jellyfin", "fetch_media").unwrap();
        assert_eq!(
            cell,
            OperationMetrics {
                total: 3,
                errors: 1,
                retries: 0
            }
        );
    }

    #[test]
    fn cells_are_independent_across_operations() {
        let ledger = MetricsLedger::new();
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_retry("jellyfin", "test_connection");

        assert_eq!(
            ledger.operation("jellyfin", "fetch_media").unwrap().total,
            1
        );
        assert_eq!(
            ledger
                .operation("jellyfin", "test_connection")
                .unwrap()
                .retries,
            1
        );
    }

    #[test]
    fn scoped_reset_leaves_other_providers_untouched() {
        let ledger = MetricsLedger::new();
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_attempt("radarr", "fetch_media");

        ledger.reset(Some("jellyfin"));

        assert_eq!(
            ledger.operation("jellyfin", "fetch_media").unwrap(),
            OperationMetrics::default()
        );
        assert_eq!(ledger.operation("radarr", "fetch_media").unwrap().total, 1);
    }

    #[test]
    fn unscoped_reset_zeroes_everything() {
        let ledger = MetricsLedger::new();
        ledger.record_attempt("jellyfin", "fetch_media");
        ledger.record_error("radarr", "test_connection");

        ledger.reset(None);

        for (_, ops) in ledger.snapshot() {
            for (_, cell) in ops {
                assert_eq!(cell, OperationMetrics::default());
            }
        }
    }

    #[test]
    fn unknown_provider_yields_none() {
        let ledger = MetricsLedger::new();
        assert!(ledger.provider("plex").is_none());
        assert!(ledger.operation("plex", "fetch_media").is_none());
    }
}
