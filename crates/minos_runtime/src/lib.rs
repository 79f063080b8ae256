#![no_std]

#[cfg(target_arch = "riscv64")]
mod clock;
#[cfg(target_arch = "riscv64")]
mod mutex;
#[cfg(target_arch = "riscv64")]
mod process;
#[cfg(target_arch = "riscv64")]
pub mod scheduler;
#[cfg(target_arch = "riscv64")]
mod semaphore;
#[cfg(target_arch = "riscv64")]
pub mod thread;

#[cfg(target_arch = "riscv64")]
pub use clock::{ticks, timer_sleep};
#[cfg(target_arch = "riscv64")]
pub use mutex::{Mutex, MutexGuard};
#[cfg(target_arch = "riscv64")]
pub use process::{Process, kernel_process};
#[cfg(target_arch = "riscv64")]
pub use semaphore::Semaphore;
#[cfg(target_arch = "riscv64")]
pub use thread::{Thread, ThreadState, Tid, kthread_create};
