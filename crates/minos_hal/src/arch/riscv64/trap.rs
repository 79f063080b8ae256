//! S-mode trap entry and the interrupt-state discipline.

use core::arch::global_asm;
use core::mem::offset_of;

use riscv::register::scause::Scause;
use riscv::register::sstatus::{self, Sstatus};
use riscv::register::stvec::{self, Stvec, TrapMode};
use riscv::{ExceptionNumber, InterruptNumber};

use super::csr;

pub use riscv::interrupt::{Exception, Interrupt, Trap};

/// General registers x1..x31, in register order.
#[repr(C)]
#[derive(Default, Clone, Copy)]
pub struct Registers {
    pub ra: u64,
    pub sp: u64,
    pub gp: u64,
    pub tp: u64,
    pub t0: u64,
    pub t1: u64,
    pub t2: u64,
    pub s0: u64,
    pub s1: u64,
    pub a0: u64,
    pub a1: u64,
    pub a2: u64,
    pub a3: u64,
    pub a4: u64,
    pub a5: u64,
    pub a6: u64,
    pub a7: u64,
    pub s2: u64,
    pub s3: u64,
    pub s4: u64,
    pub s5: u64,
    pub s6: u64,
    pub s7: u64,
    pub s8: u64,
    pub s9: u64,
    pub s10: u64,
    pub s11: u64,
    pub t3: u64,
    pub t4: u64,
    pub t5: u64,
    pub t6: u64,
}

/// CPU state pushed on the kernel stack when a trap enters S-mode.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct TrapContext {
    pub regs: Registers,
    pub fregs: [u64; 32],
    pub sstatus: usize,
    pub sepc: usize,
    pub stval: usize,
    pub scause: usize,
}

// The entry assembly below spells these offsets out by hand.
const _: () = {
    assert!(offset_of!(TrapContext, regs) == 0);
    assert!(offset_of!(Registers, ra) == 0);
    assert!(offset_of!(Registers, sp) == 8);
    assert!(offset_of!(Registers, t0) == 32);
    assert!(offset_of!(Registers, a0) == 72);
    assert!(offset_of!(Registers, t6) == 240);
    assert!(offset_of!(TrapContext, fregs) == 248);
    assert!(offset_of!(TrapContext, sstatus) == 504);
    assert!(offset_of!(TrapContext, sepc) == 512);
    assert!(offset_of!(TrapContext, stval) == 520);
    assert!(offset_of!(TrapContext, scause) == 528);
    assert!(size_of::<TrapContext>() == 544);
};

impl TrapContext {
    /// Decode `scause` into the typed trap cause.
    pub fn classify(&self) -> Trap<Interrupt, Exception> {
        match Scause::from_bits(self.scause).cause() {
            Trap::Interrupt(code) => {
                Trap::Interrupt(Interrupt::from_number(code).expect("unknown interrupt cause"))
            }
            Trap::Exception(code) => {
                Trap::Exception(Exception::from_number(code).expect("unknown exception cause"))
            }
        }
    }
}

/// Install the trap vector in direct mode.
pub fn setup_trap() {
    unsafe extern "C" {
        fn _s_trap_entry();
    }

    let mut stvec_val = Stvec::from_bits(0);
    stvec_val.set_address(_s_trap_entry as usize);
    stvec_val.set_trap_mode(TrapMode::Direct);

    unsafe {
        stvec::write(stvec_val);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqState(Sstatus);

impl IrqState {
    #[inline]
    pub fn save() -> Self {
        IrqState(sstatus::read())
    }

    #[inline]
    pub fn restore(self) {
        let Self(state) = self;
        unsafe {
            sstatus::write(state);
        }
    }
}

#[inline]
pub fn disable_irqs() {
    unsafe {
        sstatus::clear_sie();
    }
}

#[inline]
pub fn enable_irqs() {
    unsafe {
        sstatus::set_sie();
    }
}

#[inline]
pub fn disable_irqs_save() -> IrqState {
    let state = IrqState::save();
    disable_irqs();

    state
}

#[inline]
pub fn irqs_enabled() -> bool {
    sstatus::read().sie()
}

/// Acknowledge a forwarded machine-timer tick.
#[inline]
pub fn clear_soft_interrupt() {
    csr::clear_sip_ssoft();
}

// Trap entry: push a `TrapContext` on the interrupted kernel stack, save the
// 32 integer and 32 floating registers plus the trap CSRs, and hand it to the
// kernel's dispatcher. Offsets match the struct above (checked at compile
// time). `sstatus` is written back before the registers so `sret` sees the
// saved SPP/SPIE.
global_asm!(
    "
    .section .text
    .balign 4
    .globl _s_trap_entry
_s_trap_entry:
    addi  sp, sp, -544
    sd    ra, 0(sp)
    sd    gp, 16(sp)
    sd    tp, 24(sp)
    sd    t0, 32(sp)
    sd    t1, 40(sp)
    sd    t2, 48(sp)
    sd    s0, 56(sp)
    sd    s1, 64(sp)
    sd    a0, 72(sp)
    sd    a1, 80(sp)
    sd    a2, 88(sp)
    sd    a3, 96(sp)
    sd    a4, 104(sp)
    sd    a5, 112(sp)
    sd    a6, 120(sp)
    sd    a7, 128(sp)
    sd    s2, 136(sp)
    sd    s3, 144(sp)
    sd    s4, 152(sp)
    sd    s5, 160(sp)
    sd    s6, 168(sp)
    sd    s7, 176(sp)
    sd    s8, 184(sp)
    sd    s9, 192(sp)
    sd    s10, 200(sp)
    sd    s11, 208(sp)
    sd    t3, 216(sp)
    sd    t4, 224(sp)
    sd    t5, 232(sp)
    sd    t6, 240(sp)
    addi  t0, sp, 544
    sd    t0, 8(sp)

    fsd   f0, 248(sp)
    fsd   f1, 256(sp)
    fsd   f2, 264(sp)
    fsd   f3, 272(sp)
    fsd   f4, 280(sp)
    fsd   f5, 288(sp)
    fsd   f6, 296(sp)
    fsd   f7, 304(sp)
    fsd   f8, 312(sp)
    fsd   f9, 320(sp)
    fsd   f10, 328(sp)
    fsd   f11, 336(sp)
    fsd   f12, 344(sp)
    fsd   f13, 352(sp)
    fsd   f14, 360(sp)
    fsd   f15, 368(sp)
    fsd   f16, 376(sp)
    fsd   f17, 384(sp)
    fsd   f18, 392(sp)
    fsd   f19, 400(sp)
    fsd   f20, 408(sp)
    fsd   f21, 416(sp)
    fsd   f22, 424(sp)
    fsd   f23, 432(sp)
    fsd   f24, 440(sp)
    fsd   f25, 448(sp)
    fsd   f26, 456(sp)
    fsd   f27, 464(sp)
    fsd   f28, 472(sp)
    fsd   f29, 480(sp)
    fsd   f30, 488(sp)
    fsd   f31, 496(sp)

    csrr  t0, sstatus
    sd    t0, 504(sp)
    csrr  t0, sepc
    sd    t0, 512(sp)
    csrr  t0, stval
    sd    t0, 520(sp)
    csrr  t0, scause
    sd    t0, 528(sp)

    mv    a0, sp
    call  s_trap_handler

    ld    t0, 504(sp)
    csrw  sstatus, t0
    ld    t0, 512(sp)
    csrw  sepc, t0

    fld   f0, 248(sp)
    fld   f1, 256(sp)
    fld   f2, 264(sp)
    fld   f3, 272(sp)
    fld   f4, 280(sp)
    fld   f5, 288(sp)
    fld   f6, 296(sp)
    fld   f7, 304(sp)
    fld   f8, 312(sp)
    fld   f9, 320(sp)
    fld   f10, 328(sp)
    fld   f11, 336(sp)
    fld   f12, 344(sp)
    fld   f13, 352(sp)
    fld   f14, 360(sp)
    fld   f15, 368(sp)
    fld   f16, 376(sp)
    fld   f17, 384(sp)
    fld   f18, 392(sp)
    fld   f19, 400(sp)
    fld   f20, 408(sp)
    fld   f21, 416(sp)
    fld   f22, 424(sp)
    fld   f23, 432(sp)
    fld   f24, 440(sp)
    fld   f25, 448(sp)
    fld   f26, 456(sp)
    fld   f27, 464(sp)
    fld   f28, 472(sp)
    fld   f29, 480(sp)
    fld   f30, 488(sp)
    fld   f31, 496(sp)

    ld    ra, 0(sp)
    ld    gp, 16(sp)
    ld    tp, 24(sp)
    ld    t1, 40(sp)
    ld    t2, 48(sp)
    ld    s0, 56(sp)
    ld    s1, 64(sp)
    ld    a0, 72(sp)
    ld    a1, 80(sp)
    ld    a2, 88(sp)
    ld    a3, 96(sp)
    ld    a4, 104(sp)
    ld    a5, 112(sp)
    ld    a6, 120(sp)
    ld    a7, 128(sp)
    ld    s2, 136(sp)
    ld    s3, 144(sp)
    ld    s4, 152(sp)
    ld    s5, 160(sp)
    ld    s6, 168(sp)
    ld    s7, 176(sp)
    ld    s8, 184(sp)
    ld    s9, 192(sp)
    ld    s10, 200(sp)
    ld    s11, 208(sp)
    ld    t3, 216(sp)
    ld    t4, 224(sp)
    ld    t5, 232(sp)
    ld    t6, 240(sp)
    ld    t0, 32(sp)
    ld    sp, 8(sp)
    sret
    "
);
