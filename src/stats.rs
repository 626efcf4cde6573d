//! Copy Statistics
//!
//! Atomic counters for fast-path outcomes and shadow maintenance, shared by
//! every hooked context of a shim.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the copy counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStatsSnapshot {
    pub fast_copies_applied: u64,
    pub fast_copies_busy: u64,
    pub fast_copies_declined: u64,
    pub gpu_fallbacks: u64,
    pub shadows_created: u64,
    pub shadow_creation_failures: u64,
    pub shadow_refreshes: u64,
}

/// Counters for fast-path decisions and shadow maintenance.
///
/// Cheap to update from any context thread.
#[derive(Debug, Default)]
pub struct CopyStats {
    fast_copies_applied: AtomicU64,
    fast_copies_busy: AtomicU64,
    fast_copies_declined: AtomicU64,
    gpu_fallbacks: AtomicU64,
    shadows_created: AtomicU64,
    shadow_creation_failures: AtomicU64,
    shadow_refreshes: AtomicU64,
}

impl CopyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_fast_copies_applied(&self) {
        self.fast_copies_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fast_copies_busy(&self) {
        self.fast_copies_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fast_copies_declined(&self) {
        self.fast_copies_declined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_gpu_fallbacks(&self) {
        self.gpu_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shadows_created(&self) {
        self.shadows_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shadow_creation_failures(&self) {
        self.shadow_creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_shadow_refreshes(&self) {
        self.shadow_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CopyStatsSnapshot {
        CopyStatsSnapshot {
            fast_copies_applied: self.fast_copies_applied.load(Ordering::Relaxed),
            fast_copies_busy: self.fast_copies_busy.load(Ordering::Relaxed),
            fast_copies_declined: self.fast_copies_declined.load(Ordering::Relaxed),
            gpu_fallbacks: self.gpu_fallbacks.load(Ordering::Relaxed),
            shadows_created: self.shadows_created.load(Ordering::Relaxed),
            shadow_creation_failures: self.shadow_creation_failures.load(Ordering::Relaxed),
            shadow_refreshes: self.shadow_refreshes.load(Ordering::Relaxed),
        }
    }
}
