#![no_std]

use core::fmt::{self, Write};

use minos_sync::Spin;

pub trait ConsoleWrite: Send + Sync {
    fn write(&self, s: &str);
}

struct Console {
    console: Option<&'static dyn ConsoleWrite>,
}

static CONSOLE: Spin<Console> = Spin::new(Console::new());

impl Console {
    const fn new() -> Self {
        Self { console: None }
    }
}

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(console) = self.console {
            console.write(s);
        }
        Ok(())
    }
}

pub fn set_console(console: &'static dyn ConsoleWrite) {
    CONSOLE.lock().console.replace(console);
}

#[doc(hidden)]
pub fn do_print(args: fmt::Arguments) {
    #[cfg(target_arch = "riscv64")]
    {
        use minos_hal::SpinIrq as _;
        let _ = CONSOLE.lock_irq().write_fmt(args);
    }
    #[cfg(not(target_arch = "riscv64"))]
    {
        let _ = CONSOLE.lock().write_fmt(args);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::do_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::print!("{}\n", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_warn {
    ($($arg:tt)*) => {
        $crate::println!("[kernel: warn] {}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_debug {
    ($($arg:tt)*) => {
        $crate::println!("[kernel:debug] {}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_info {
    ($($arg:tt)*) => {
        $crate::println!("[kernel: info] {}", format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println_fatal {
    () => {
        $crate::println!("[kernel:fatal] ")
    };
    ($($arg:tt)*) => {
        $crate::println!("[kernel:fatal] {}", format_args!($($arg)*))
    };
}
