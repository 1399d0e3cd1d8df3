use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lifetime counters of a refit tool. Safe to bump from parallel refits.
#[derive(Debug, Default)]
pub(crate) struct RefitCounters {
    pub refits: AtomicU64,
    pub good: AtomicU64,
    pub failed_outlier_removal: AtomicU64,
    pub failed_error_update: AtomicU64,
    pub failed_refit: AtomicU64,
    pub failed_extrapolation: AtomicU64,
    pub deweighted_hits: AtomicU64,
    pub removed_sector_hits: AtomicU64,
    pub chambers_not_cleaned: AtomicU64,
}

impl RefitCounters {
    pub fn bump(counter: &AtomicU64) {
        Self::add(counter, 1);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    fn counters(&self) -> [&AtomicU64; 9] {
        [
            &self.refits,
            &self.good,
            &self.failed_outlier_removal,
            &self.failed_error_update,
            &self.failed_refit,
            &self.failed_extrapolation,
            &self.deweighted_hits,
            &self.removed_sector_hits,
            &self.chambers_not_cleaned,
        ]
    }

    pub fn snapshot(&self) -> RefitStats {
        let [
            refits,
            good,
            failed_outlier_removal,
            failed_error_update,
            failed_refit,
            failed_extrapolation,
            deweighted_hits,
            removed_sector_hits,
            chambers_not_cleaned,
        ] = self.counters().map(|c| c.load(Ordering::Relaxed));
        RefitStats {
            n_refits: refits,
            n_good: good,
            n_failed_outlier_removal: failed_outlier_removal,
            n_failed_error_update: failed_error_update,
            n_failed_refit: failed_refit,
            n_failed_extrapolation: failed_extrapolation,
            n_deweighted_hits: deweighted_hits,
            n_removed_sector_hits: removed_sector_hits,
            n_chambers_not_cleaned: chambers_not_cleaned,
        }
    }

    pub fn reset(&self) {
        for c in self.counters() {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// Snapshot of the refit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefitStats {
    pub n_refits: u64,
    pub n_good: u64,
    pub n_failed_outlier_removal: u64,
    pub n_failed_error_update: u64,
    pub n_failed_refit: u64,
    pub n_failed_extrapolation: u64,
    /// MDT hits deweighted for lying outside the selected sector.
    pub n_deweighted_hits: u64,
    /// MDT hits turned into outliers for lying outside the selected sector.
    pub n_removed_sector_hits: u64,
    /// Chamber groups segment cleaning gave up on.
    pub n_chambers_not_cleaned: u64,
}

impl RefitStats {
    /// `count / n_refits`, zero before the first refit.
    pub fn fraction(&self, count: u64) -> f64 {
        if self.n_refits == 0 {
            0.0
        } else {
            count as f64 / self.n_refits as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_and_reset() {
        let counters = RefitCounters::default();
        RefitCounters::bump(&counters.refits);
        RefitCounters::bump(&counters.refits);
        RefitCounters::bump(&counters.good);
        RefitCounters::add(&counters.deweighted_hits, 3);
        let stats = counters.snapshot();
        assert_eq!(stats.n_refits, 2);
        assert_eq!(stats.n_good, 1);
        assert_eq!(stats.n_deweighted_hits, 3);
        assert_eq!(stats.fraction(stats.n_good), 0.5);
        counters.reset();
        assert_eq!(counters.snapshot(), RefitStats::default());
        assert_eq!(RefitStats::default().fraction(0), 0.0);
    }
}
