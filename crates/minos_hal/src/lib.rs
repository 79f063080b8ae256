#![no_std]

#[cfg(target_arch = "riscv64")]
mod arch;
#[cfg(target_arch = "riscv64")]
mod spin_irq;

#[cfg(target_arch = "riscv64")]
pub use arch::riscv64::{boot, clint, config, context, mm, plic, processor, trap};
#[cfg(target_arch = "riscv64")]
pub use spin_irq::{SpinIrq, SpinIrqGuard};
