//! S-mode trap dispatch and PLIC routing.

use minos_hal::config::platform::virt::{PLIC_BASE, UART0_IRQ};
use minos_hal::plic::PlicDriver;
use minos_hal::processor;
use minos_hal::trap::{self, Exception, Interrupt, Trap, TrapContext};
use minos_runtime::scheduler;

use crate::driver::uart;

static PLIC0: PlicDriver = PlicDriver::new(PLIC_BASE, 0);

/// Open the hart-0 S-mode PLIC context and route the UART through it.
pub fn init() {
    PLIC0.set_priority(UART0_IRQ, 1);
    PLIC0.enable_interrupt(UART0_IRQ);
    PLIC0.set_priority_threshold(0);
}

/// Entry from the trap vector, with the full register file saved on the
/// interrupted kernel stack.
#[no_mangle]
extern "C" fn s_trap_handler(context: &mut TrapContext) {
    match context.classify() {
        Trap::Interrupt(interrupt) => handle_interrupt(interrupt),
        Trap::Exception(exception) => handle_exception(exception, context),
    }
}

fn handle_interrupt(interrupt: Interrupt) {
    match interrupt {
        // The machine timer forwards each tick as a supervisor software
        // interrupt, which we can acknowledge ourselves.
        Interrupt::SupervisorSoft => {
            trap::clear_soft_interrupt();
            scheduler::timer_tick();
        }
        Interrupt::SupervisorTimer => scheduler::timer_tick(),
        Interrupt::SupervisorExternal => dispatch_external(),
        #[allow(unreachable_patterns)]
        other => panic!("unexpected interrupt {other:?}"),
    }
}

fn dispatch_external() {
    let irq = PLIC0.claim_interrupt();
    if irq == 0 {
        return;
    }

    match irq {
        UART0_IRQ => uart::handle_interrupt(),
        other => panic!("unexpected external interrupt {other}"),
    }

    PLIC0.complete_interrupt(irq);
}

fn handle_exception(exception: Exception, context: &TrapContext) -> ! {
    let cause = match exception {
        Exception::InstructionMisaligned => "instruction address misaligned",
        Exception::InstructionFault => "instruction access fault",
        Exception::IllegalInstruction => "illegal instruction",
        Exception::Breakpoint => "breakpoint",
        Exception::LoadMisaligned => "load address misaligned",
        Exception::LoadFault => "load access fault",
        Exception::StoreMisaligned => "store address misaligned",
        Exception::StoreFault => "store access fault",
        Exception::UserEnvCall => "environment call from U-mode",
        Exception::InstructionPageFault => "instruction page fault",
        Exception::LoadPageFault => "load page fault",
        Exception::StorePageFault => "store page fault",
        _ => "unhandled exception",
    };

    panic!(
        "{cause}: hart {} sepc={:#x} stval={:#x} scause={:#x}",
        processor::hart_id(),
        context.sepc,
        context.stval,
        context.scause,
    );
}
