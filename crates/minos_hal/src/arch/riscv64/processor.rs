use core::arch::asm;

use riscv::register::sstatus::{self, FS};

/// Wait for the next interrupt.
#[inline]
pub fn halt() {
    riscv::asm::wfi();
}

/// Hart id, parked in `tp` by the boot path.
#[inline]
pub fn hart_id() -> usize {
    let id: usize;
    unsafe {
        asm!("mv {0}, tp", out(reg) id, options(nomem, nostack));
    }
    id
}

/// Turn on floating-point state so the trap path may save the f registers.
pub fn enable_fpu() {
    unsafe {
        sstatus::set_fs(FS::Initial);
    }
}

/// Full read/write memory barrier, for ordering MMIO against normal stores.
#[inline]
pub fn memory_barrier() {
    unsafe {
        asm!("fence rw, rw", options(nostack));
    }
}
