use core::panic::PanicInfo;

use minos_hal::{processor, trap};
use minos_log::print;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    trap::disable_irqs();

    match info.location() {
        Some(location) => print!(
            "\x1b[1;31m[PANIC]\x1b[0m {}:{}: {}\n",
            location.file(),
            location.line(),
            info.message()
        ),
        None => print!("\x1b[1;31m[PANIC]\x1b[0m {}\n", info.message()),
    }

    loop {
        processor::halt();
    }
}
