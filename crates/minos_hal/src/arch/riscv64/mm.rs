use minos_mm::address::{PAddr, PFN};
use riscv::asm::sfence_vma_all;
use riscv::register::satp;

/// Point `satp` at the root table and flush the TLB.
pub fn activate_page_table(root: PAddr) {
    unsafe {
        satp::set(satp::Mode::Sv39, 0, PFN::from(root).value());
    }
    sfence_vma_all();
}

pub fn flush_tlb() {
    sfence_vma_all();
}
