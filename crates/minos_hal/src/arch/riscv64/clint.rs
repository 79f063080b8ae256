//! CLINT timer registers.

use super::config::platform::virt::{CLINT_BASE, CLINT_MTIME_OFFSET, CLINT_MTIMECMP_OFFSET};

pub fn mtimecmp_ptr(hart_id: usize) -> *mut u64 {
    (CLINT_BASE + CLINT_MTIMECMP_OFFSET + 8 * hart_id) as *mut u64
}

pub fn mtime_ptr() -> *mut u64 {
    (CLINT_BASE + CLINT_MTIME_OFFSET) as *mut u64
}

/// Free-running timebase, usable from S-mode as well since the CLINT window
/// is mapped into the kernel address space.
pub fn read_mtime() -> u64 {
    unsafe { mtime_ptr().read_volatile() }
}
