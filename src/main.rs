#![cfg_attr(target_arch = "riscv64", no_std)]
#![cfg_attr(target_arch = "riscv64", no_main)]

#[cfg(target_arch = "riscv64")]
extern crate alloc;

#[cfg(target_arch = "riscv64")]
mod driver;
#[cfg(target_arch = "riscv64")]
mod kernel;
#[cfg(target_arch = "riscv64")]
mod panic;

#[cfg(target_arch = "riscv64")]
mod kernel_init {
    use minos_hal::{boot, processor, trap};
    use minos_log::println_info;
    use minos_runtime::{kthread_create, scheduler, thread};

    use crate::driver::uart;
    use crate::kernel::{interrupt, mem, selftest};

    /// Supervisor-mode entry point, reached from the machine-mode bring-up
    /// with paging off and interrupts masked.
    #[no_mangle]
    extern "C" fn kernel_main() -> ! {
        // The trap path saves the f registers, so FP state first.
        processor::enable_fpu();

        uart::init();
        minos_log::set_console(uart::console());
        println_info!(
            "minos {} on qemu virt, hart {}",
            env!("CARGO_PKG_VERSION"),
            processor::hart_id()
        );

        mem::init();
        trap::setup_trap();
        interrupt::init();

        unsafe { scheduler::adopt_idle(boot::boot_stack_base()) };
        kthread_create("init", init_thread, 0).expect("failed to spawn the init thread");

        trap::enable_irqs();

        // The boot context is the idle thread from here on: never enqueued,
        // picked only when the ready queue is empty.
        loop {
            processor::halt();
        }
    }

    fn init_thread(_arg: usize) {
        println_info!(
            "init (tid {}): {} pages free after bring-up",
            thread::current_tid(),
            buddy_allocator::BuddyAllocator::free_page_count()
        );

        selftest::run();

        kthread_create("echo", uart::echo_thread, 0).expect("failed to spawn the echo thread");
        println_info!("boot complete, console echo is live");
    }
}

#[cfg(not(target_arch = "riscv64"))]
fn main() {
    // The kernel itself only targets riscv64; a host build exists so the
    // workspace's library crates can run their tests.
}
