#![no_std]

mod bitmap;
mod free_area;
mod zone;

use minos_mm::address::PAddr;
use minos_mm::paging::PageAlloc;
use minos_sync::Spin;
use zone::Zone;

/// Largest block order: `2^14` pages, 64 MiB.
pub const MAX_ORDER: u32 = 14;
pub const AREA_COUNT: usize = MAX_ORDER as usize + 1;

static BUDDY_ALLOCATOR: BuddyAllocator = BuddyAllocator::new();

pub struct BuddyAllocator {
    zone: Spin<Zone<AREA_COUNT>>,
}

impl BuddyAllocator {
    const fn new() -> Self {
        Self {
            zone: Spin::new(Zone::new()),
        }
    }

    /// Hand the physical range `[start, end)` to the allocator.
    ///
    /// The allocation bitmap is carved out of the start of the range; the
    /// remainder becomes allocatable. Must be called once, before any page
    /// is requested.
    pub fn init(start: PAddr, end: PAddr) {
        with_zone(|zone| zone.init(start, end));
    }

    pub fn free_page_count() -> usize {
        with_zone(|zone| zone.free_page_count())
    }

    pub fn free_block_count() -> usize {
        with_zone(|zone| zone.free_block_count())
    }
}

/// Run `f` under the zone lock with interrupts masked, so a preempted lock
/// holder can never strand a hart that spins on the zone with interrupts
/// off (the reclaim path in the scheduler does exactly that).
fn with_zone<R>(f: impl FnOnce(&mut Zone<AREA_COUNT>) -> R) -> R {
    #[cfg(target_arch = "riscv64")]
    let irq_state = minos_hal::trap::disable_irqs_save();

    let result = f(&mut BUDDY_ALLOCATOR.zone.lock());

    #[cfg(target_arch = "riscv64")]
    irq_state.restore();

    result
}

/// Copy handle to the global buddy allocator, used by everything that needs
/// physical pages.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalPageAlloc;

impl PageAlloc for GlobalPageAlloc {
    fn alloc_pages(&self, order: u32) -> Option<PAddr> {
        with_zone(|zone| zone.alloc_pages(order))
    }

    unsafe fn free_pages(&self, addr: PAddr, order: u32) {
        with_zone(|zone| zone.free_pages(addr, order));
    }
}
