//! NS16550A serial console with an interrupt-fed receive path.

use alloc::string::String;

use minos_hal::config::platform::virt::UART0_BASE;
use minos_hal::SpinIrq as _;
use minos_log::{println_info, ConsoleWrite};
use minos_runtime::Semaphore;
use minos_sync::Spin;

const RBR: usize = 0;
const THR: usize = 0;
const IER: usize = 1;
const FCR: usize = 2;
const LCR: usize = 3;
const LSR: usize = 5;

const LCR_EIGHT_BITS: u8 = 0b11;
const LCR_DLAB: u8 = 1 << 7;
const FCR_FIFO_ENABLE: u8 = 1;
const IER_RX_ENABLE: u8 = 1;
const LSR_DATA_READY: u8 = 1;
const LSR_THR_EMPTY: u8 = 1 << 5;

struct Uart {
    base: usize,
}

impl Uart {
    const fn new(base: usize) -> Self {
        Self { base }
    }

    fn write_reg(&self, offset: usize, value: u8) {
        unsafe { ((self.base + offset) as *mut u8).write_volatile(value) }
    }

    fn read_reg(&self, offset: usize) -> u8 {
        unsafe { ((self.base + offset) as *const u8).read_volatile() }
    }

    fn init(&self) {
        // 8 data bits, no parity, one stop bit.
        self.write_reg(LCR, LCR_EIGHT_BITS);

        // Program the divisor latch. QEMU ignores the actual rate; 592 is
        // the canonical 2400 baud divisor for the 22.729 MHz reference.
        let divisor: u16 = 592;
        self.write_reg(LCR, LCR_EIGHT_BITS | LCR_DLAB);
        self.write_reg(0, (divisor & 0xff) as u8);
        self.write_reg(1, (divisor >> 8) as u8);
        self.write_reg(LCR, LCR_EIGHT_BITS);

        self.write_reg(FCR, FCR_FIFO_ENABLE);
        self.write_reg(IER, IER_RX_ENABLE);
    }

    fn putc(&self, byte: u8) {
        while self.read_reg(LSR) & LSR_THR_EMPTY == 0 {}
        self.write_reg(THR, byte);
    }

    fn getc(&self) -> Option<u8> {
        if self.read_reg(LSR) & LSR_DATA_READY == 0 {
            None
        } else {
            Some(self.read_reg(RBR))
        }
    }
}

static UART0: Uart = Uart::new(UART0_BASE);

const RX_RING_SIZE: usize = 64;

struct RxRing {
    buf: [u8; RX_RING_SIZE],
    head: usize,
    tail: usize,
}

impl RxRing {
    const fn new() -> Self {
        Self {
            buf: [0; RX_RING_SIZE],
            head: 0,
            tail: 0,
        }
    }

    fn push(&mut self, byte: u8) -> bool {
        if self.tail.wrapping_sub(self.head) == RX_RING_SIZE {
            return false;
        }
        self.buf[self.tail % RX_RING_SIZE] = byte;
        self.tail = self.tail.wrapping_add(1);
        true
    }

    fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let byte = self.buf[self.head % RX_RING_SIZE];
        self.head = self.head.wrapping_add(1);
        Some(byte)
    }
}

static RX_RING: Spin<RxRing> = Spin::new(RxRing::new());
static RX_AVAILABLE: Semaphore = Semaphore::new(0);

pub fn init() {
    UART0.init();
}

pub struct UartConsole;

static CONSOLE: UartConsole = UartConsole;

pub fn console() -> &'static dyn ConsoleWrite {
    &CONSOLE
}

impl ConsoleWrite for UartConsole {
    fn write(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                UART0.putc(b'\r');
            }
            UART0.putc(byte);
        }
    }
}

/// Drain the receive FIFO. Runs in the PLIC handler with interrupts off;
/// each buffered byte is announced through the semaphore. Bytes arriving
/// into a full ring are dropped.
pub fn handle_interrupt() {
    while let Some(byte) = UART0.getc() {
        if RX_RING.lock().push(byte) {
            RX_AVAILABLE.up();
        }
    }
}

/// Block until console input arrives.
pub fn read_blocking() -> u8 {
    RX_AVAILABLE.down();
    RX_RING
        .lock_irq()
        .pop()
        .expect("rx ring empty after a successful down")
}

/// Echo console input, logging each completed line.
pub fn echo_thread(_arg: usize) {
    let mut line = String::new();

    loop {
        match read_blocking() {
            b'\r' | b'\n' => {
                UART0.putc(b'\r');
                UART0.putc(b'\n');
                if !line.is_empty() {
                    println_info!("console: {line}");
                    line.clear();
                }
            }
            byte if byte.is_ascii_graphic() || byte == b' ' => {
                UART0.putc(byte);
                line.push(byte as char);
            }
            _ => {}
        }
    }
}
