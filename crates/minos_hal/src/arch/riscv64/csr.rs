//! Raw accessors for the CSRs the `riscv` crate does not model conveniently:
//! whole-register delegation masks, PMP, the machine trap vector, and the
//! supervisor software-interrupt pending bit.

use core::arch::asm;

macro_rules! csr_write {
    ($(#[$attr:meta])* $name:ident, $csr:literal) => {
        $(#[$attr])*
        #[inline]
        pub(crate) unsafe fn $name(value: usize) {
            unsafe {
                asm!(concat!("csrw ", $csr, ", {0}"), in(reg) value, options(nostack));
            }
        }
    };
}

csr_write!(write_medeleg, "medeleg");
csr_write!(write_mideleg, "mideleg");
csr_write!(write_mtvec, "mtvec");
csr_write!(write_mcounteren, "mcounteren");
csr_write!(write_pmpaddr0, "pmpaddr0");
csr_write!(write_pmpcfg0, "pmpcfg0");
csr_write!(write_satp, "satp");

const SIP_SSIP: usize = 1 << 1;

/// Acknowledge a forwarded timer tick by clearing the supervisor software
/// interrupt pending bit.
#[inline]
pub(crate) fn clear_sip_ssoft() {
    unsafe {
        asm!("csrc sip, {0}", in(reg) SIP_SSIP, options(nostack));
    }
}
