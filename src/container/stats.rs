use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub(crate) struct InnerStats {
    pub(crate) total_resolutions: AtomicU64,
    pub(crate) singleton_cache_hits: AtomicU64,
    pub(crate) singleton_cache_misses: AtomicU64,
    pub(crate) constructions: AtomicU64,
}

impl InnerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of container activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Every `make` call, including nested dependency resolutions
    pub total_resolutions: u64,
    /// Resolutions answered from the instance cache
    pub singleton_cache_hits: u64,
    /// Resolutions that had to run a strategy
    pub singleton_cache_misses: u64,
    /// Objects actually constructed
    pub constructions: u64,
    pub registered_bindings: usize,
    pub active_singletons: usize,
}

impl ContainerStats {
    pub(crate) fn snapshot(inner: &InnerStats, registered_bindings: usize, active_singletons: usize) -> Self {
        Self {
            total_resolutions: inner.total_resolutions.load(Ordering::Relaxed),
            singleton_cache_hits: inner.singleton_cache_hits.load(Ordering::Relaxed),
            singleton_cache_misses: inner.singleton_cache_misses.load(Ordering::Relaxed),
            constructions: inner.constructions.load(Ordering::Relaxed),
            registered_bindings,
            active_singletons,
        }
    }

    /// Cache hit ratio in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.singleton_cache_hits + self.singleton_cache_misses;
        if total == 0 {
            0.0
        } else {
            self.singleton_cache_hits as f64 / total as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} resolutions, {:.1}% cache hit rate, {} bindings, {} singletons",
            self.total_resolutions,
            self.hit_rate() * 100.0,
            self.registered_bindings,
            self.active_singletons
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_empty_stats() {
        assert_eq!(ContainerStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_and_summary() {
        let stats = ContainerStats {
            total_resolutions: 4,
            singleton_cache_hits: 3,
            singleton_cache_misses: 1,
            constructions: 1,
            registered_bindings: 2,
            active_singletons: 1,
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!(stats.summary().contains("75.0% cache hit rate"));
    }
}
