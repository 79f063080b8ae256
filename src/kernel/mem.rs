//! Physical memory bring-up, the kernel address space, and the global heap.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{null_mut, NonNull};

use buddy_allocator::{BuddyAllocator, GlobalPageAlloc};
use minos_hal::config::mm::MEMORY_END;
use minos_hal::config::platform::virt::{
    CLINT_BASE, CLINT_SIZE, PLIC_BASE, PLIC_SIZE, UART0_BASE, UART0_SIZE,
};
use minos_hal::mm::activate_page_table;
use minos_hal::trap::disable_irqs_save;
use minos_mm::address::{PAddr, VAddr};
use minos_mm::page_table::{PageTable, PteFlags};
use minos_mm::paging::{IdentityAccess, PageAlloc, PAGE_SIZE};
use minos_runtime::kernel_process;
use minos_sync::Spin;
use slab_allocator::SlabAllocator;

extern "C" {
    fn __text_start();
    fn __text_end();
    fn __rodata_start();
    fn __rodata_end();
    fn __data_start();
    fn __kernel_end();
}

type KernelPageTable = PageTable<GlobalPageAlloc, IdentityAccess>;

static KERNEL_PAGE_TABLE: Spin<Option<KernelPageTable>> = Spin::new(None);

static KERNEL_SLAB: SlabAllocator<GlobalPageAlloc> = SlabAllocator::new_in(GlobalPageAlloc);

#[global_allocator]
static KERNEL_HEAP: KernelHeap = KernelHeap;

/// Give the page range after the kernel image to the buddy allocator, build
/// the identity-mapped kernel address space, and turn paging on.
pub fn init() {
    let heap_start = PAddr::from_val(__kernel_end as usize).ceil();
    BuddyAllocator::init(heap_start, PAddr::from_val(MEMORY_END));

    let mut table = PageTable::new(GlobalPageAlloc, IdentityAccess)
        .expect("out of memory building the kernel page table");

    // Kernel image, by section permission.
    identity_map(&mut table, __text_start as usize, __text_end as usize, PteFlags::rx());
    identity_map(
        &mut table,
        __rodata_start as usize,
        __rodata_end as usize,
        PteFlags::R,
    );
    identity_map(
        &mut table,
        __data_start as usize,
        __kernel_end as usize,
        PteFlags::rw(),
    );

    // The heap, bitmap included.
    identity_map(&mut table, heap_start.addr(), MEMORY_END, PteFlags::rw());

    // Device windows.
    identity_map(&mut table, UART0_BASE, UART0_BASE + UART0_SIZE, PteFlags::rw());
    identity_map(&mut table, CLINT_BASE, CLINT_BASE + CLINT_SIZE, PteFlags::rw());
    identity_map(&mut table, PLIC_BASE, PLIC_BASE + PLIC_SIZE, PteFlags::rw());

    kernel_process().set_root_table(table.root());
    activate_page_table(table.root());

    // Identity mapping holds: translate a known kernel address.
    let text = VAddr::from_val(__text_start as usize);
    assert_eq!(table.walk(text), Some(PAddr::from_val(text.addr())));

    *KERNEL_PAGE_TABLE.lock() = Some(table);
}

fn identity_map(table: &mut KernelPageTable, start: usize, end: usize, flags: PteFlags) {
    assert!(start <= end);
    if start == end {
        return;
    }

    table
        .map(
            VAddr::from_val(start),
            PAddr::from_val(start),
            end - start,
            flags,
        )
        .expect("out of memory mapping the kernel address space");
}

/// The kernel heap: bucketed slab blocks for ordinary allocations, whole
/// page runs for page-aligned ones. Interrupts are disabled across every
/// operation, so a preempted holder can never strand the bucket locks;
/// interrupt handlers themselves must not allocate.
pub struct KernelHeap;

// Past 32-byte alignment the slab's block placement stops guaranteeing the
// requested alignment; such layouts go straight to the page allocator.
const SLAB_ALIGN_LIMIT: usize = 32;

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let irq_state = disable_irqs_save();
        let ptr = if layout.align() > SLAB_ALIGN_LIMIT {
            alloc_aligned_pages(layout)
        } else {
            KERNEL_SLAB.alloc(layout.size(), layout.align())
        };
        irq_state.restore();

        ptr.map_or(null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };

        let irq_state = disable_irqs_save();
        if layout.align() > SLAB_ALIGN_LIMIT {
            GlobalPageAlloc.free_pages(PAddr::from_val(ptr.as_ptr() as usize), page_order(layout));
        } else {
            KERNEL_SLAB.dealloc(ptr);
        }
        irq_state.restore();
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > SLAB_ALIGN_LIMIT {
            // Page-aligned reallocation is rare; do it by the book.
            let new_layout = Layout::from_size_align(new_size, layout.align()).unwrap();
            let new = self.alloc(new_layout);
            if !new.is_null() {
                core::ptr::copy_nonoverlapping(ptr, new, layout.size().min(new_size));
                self.dealloc(ptr, layout);
            }
            return new;
        }

        let Some(ptr) = NonNull::new(ptr) else {
            return null_mut();
        };

        let irq_state = disable_irqs_save();
        // The old size comes from the block's home superblock, not the layout.
        let new = KERNEL_SLAB.realloc(ptr, new_size);
        irq_state.restore();

        new.map_or(null_mut(), NonNull::as_ptr)
    }
}

fn alloc_aligned_pages(layout: Layout) -> Option<NonNull<u8>> {
    if layout.align() > PAGE_SIZE {
        return None;
    }

    GlobalPageAlloc
        .alloc_pages(page_order(layout))
        .and_then(|pages| NonNull::new(pages.addr() as *mut u8))
}

fn page_order(layout: Layout) -> u32 {
    let pages = layout.size().max(layout.align()).div_ceil(PAGE_SIZE);
    pages.next_power_of_two().trailing_zeros()
}
