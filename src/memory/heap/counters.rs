/*!
 * Heap Counters
 * Usage accounting for the general allocator
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// Usage counters shared by every clone of a `GeneralAllocator`
///
/// `live` is maintained in every build. `usage` and `peak` are maintained
/// only when the owner tracks usage (debug builds or a configured budget).
#[derive(Debug, Default)]
pub(super) struct HeapCounters {
    live: AtomicU64,
    usage: AtomicU64,
    peak: AtomicU64,
}

impl HeapCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `bytes` against an optional budget.
    /// Returns false (and leaves usage untouched) when the budget would be exceeded.
    /// Check and increment happen in one atomic step.
    pub fn reserve(&self, bytes: u64, budget: Option<u64>) -> bool {
        let committed = self
            .usage
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let next = current.checked_add(bytes)?;
                budget.map_or(true, |limit| next <= limit).then_some(next)
            });

        match committed {
            Ok(previous) => {
                self.peak.fetch_max(previous + bytes, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    pub fn release(&self, bytes: u64) {
        self.usage.fetch_sub(bytes, Ordering::SeqCst);
    }

    #[inline]
    pub fn record_alloc(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_free(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn live(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn usage(&self) -> u64 {
        self.usage.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::SeqCst)
    }
}
