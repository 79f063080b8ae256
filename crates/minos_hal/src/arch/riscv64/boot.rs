//! Machine-mode bring-up: entry point, PMP/delegation setup, and the CLINT
//! timer path that forwards ticks to S-mode as software interrupts.

use core::arch::{asm, global_asm, naked_asm};
use core::ptr::NonNull;

use riscv::register::{mepc, mhartid, mie, mscratch, mstatus, sie};

use super::clint;
use super::config::smp::MAX_HARTS;
use super::config::time::TIMER_INTERVAL;
use super::csr;

pub const BOOT_STACK_SIZE: usize = 4096 * 4;

#[repr(C, align(4096))]
struct BootStack([u8; BOOT_STACK_SIZE]);

static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_SIZE]);

/// Per-hart scratch block for the M-mode timer vector:
/// `[&mtimecmp, &mtime, interval, three register save slots]`.
#[repr(C, align(16))]
struct TimerScratch([usize; 6]);

static mut TIMER_SCRATCH: [TimerScratch; MAX_HARTS] = [const { TimerScratch([0; 6]) }; MAX_HARTS];

unsafe extern "C" {
    fn kernel_main() -> !;
    fn _timer_vector();
}

/// The power-on entry point, placed first in the image by the linker script.
///
/// Hart 0 sets up the boot stack, zeroes .bss and continues in Rust; every
/// other hart parks until multi-hart bring-up exists.
#[unsafe(naked)]
#[unsafe(no_mangle)]
#[unsafe(link_section = ".text.entry")]
unsafe extern "C" fn _start() -> ! {
    naked_asm!(
        "csrr  t0, mhartid",
        "bnez  t0, 2f",
        ".option push",
        ".option norelax",
        "la    gp, __global_pointer$",
        ".option pop",
        "la    sp, {boot_stack}",
        "li    t0, {stack_size}",
        "add   sp, sp, t0",
        "la    t0, __bss_start",
        "la    t1, __bss_end",
        "1:",
        "bgeu  t0, t1, 3f",
        "sd    zero, 0(t0)",
        "addi  t0, t0, 8",
        "j     1b",
        "3:",
        "call  {machine_start}",
        "2:",
        "wfi",
        "j     2b",
        boot_stack = sym BOOT_STACK,
        stack_size = const BOOT_STACK_SIZE,
        machine_start = sym machine_start,
    )
}

/// Machine-mode initialization, still on hart 0's boot stack.
///
/// Opens RAM to supervisor mode, delegates traps, arms the CLINT timer and
/// `mret`s into `kernel_main` at supervisor privilege with the hart id parked
/// in `tp`.
unsafe extern "C" fn machine_start() -> ! {
    let hart_id = mhartid::read();

    unsafe {
        // Let S-mode at the whole physical address space; without an open
        // PMP entry every S-mode access faults on the virt machine.
        csr::write_pmpaddr0(0x3f_ffff_ffff_ffff);
        csr::write_pmpcfg0(0xf);

        // Hand all exceptions and S-level interrupts down to S-mode. The
        // machine timer interrupt is not delegatable and stays with us.
        csr::write_medeleg(0xffff);
        csr::write_mideleg(0xffff);
        sie::set_ssoft();
        sie::set_stimer();
        sie::set_sext();

        // Counter access (cycle/time/instret) from S-mode.
        csr::write_mcounteren(0x7);

        setup_timer(hart_id);

        // Paging off until the kernel builds its tables.
        csr::write_satp(0);

        mstatus::set_mpp(mstatus::MPP::Supervisor);
        mepc::write(kernel_main as usize);

        asm!(
            "mv   tp, {hart}",
            "mret",
            hart = in(reg) hart_id,
            options(noreturn),
        );
    }
}

/// Program the first timer deadline and point `mtvec` at the M-mode vector.
unsafe fn setup_timer(hart_id: usize) {
    let mtimecmp = clint::mtimecmp_ptr(hart_id);
    let mtime = clint::mtime_ptr();

    unsafe {
        mtimecmp.write_volatile(mtime.read_volatile() + TIMER_INTERVAL);

        let scratch = &raw mut TIMER_SCRATCH[hart_id];
        (*scratch).0[0] = mtimecmp as usize;
        (*scratch).0[1] = mtime as usize;
        (*scratch).0[2] = TIMER_INTERVAL as usize;
        mscratch::write(scratch as usize);

        csr::write_mtvec(_timer_vector as usize);

        mstatus::set_mie();
        mie::set_mtimer();
    }
}

/// Base of the boot stack region; the scheduler adopts it as the idle
/// thread's stack page.
pub fn boot_stack_base() -> NonNull<u8> {
    NonNull::new((&raw mut BOOT_STACK).cast::<u8>()).unwrap()
}

// The machine timer vector. It reprograms the next deadline and forwards the
// tick to S-mode by raising a supervisor software interrupt, which S-mode can
// acknowledge on its own. Clobbered registers are parked in the mscratch
// block; t0 rides in mscratch itself across the handler.
global_asm!(
    "
    .section .text
    .balign 4
    .globl _timer_vector
_timer_vector:
    csrrw t0, mscratch, t0
    sd    t1, 24(t0)
    sd    t2, 32(t0)
    sd    t3, 40(t0)

    ld    t1, 0(t0)
    ld    t2, 8(t0)
    ld    t3, 16(t0)
    ld    t2, 0(t2)
    add   t2, t2, t3
    sd    t2, 0(t1)

    li    t1, 2
    csrs  sip, t1

    ld    t3, 40(t0)
    ld    t2, 32(t0)
    ld    t1, 24(t0)
    csrrw t0, mscratch, t0
    mret
    "
);
