use core::sync::atomic::{AtomicU64, Ordering};

use crate::scheduler;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// Timer ticks since boot.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

pub(crate) fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Yield until `duration` ticks have elapsed.
pub fn timer_sleep(duration: u64) {
    let deadline = ticks() + duration;
    while ticks() < deadline {
        scheduler::yield_now();
    }
}
