//! # Console Output
//!
//! Text output for diagnostics. The kernel has no screen driver at this
//! level, so the console is COM1 (0x3F8), driven through `uart_16550`.
//!
//! Output is written with interrupts disabled: a trap handler that prints
//! must never spin on the serial lock held by the code it interrupted.
//!
//! Host test builds write into a per-thread buffer instead, readable through
//! `take_captured()`.

use core::fmt;

#[cfg(not(test))]
use spin::{Lazy, Mutex};
#[cfg(not(test))]
use uart_16550::SerialPort;

#[cfg(not(test))]
const COM1: u16 = 0x3F8;

#[cfg(not(test))]
pub static SERIAL: Lazy<Mutex<SerialPort>> = Lazy::new(|| {
    let mut port = unsafe { SerialPort::new(COM1) };
    port.init();
    Mutex::new(port)
});

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! println {
    () => {
        $crate::print!("\n")
    };
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!("{}\n", format_args!($($arg)*)))
    };
}

#[doc(hidden)]
#[cfg(not(test))]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    crate::cpu::without_interrupts(|| {
        let _ = SERIAL.lock().write_fmt(args);
    });
}

#[cfg(test)]
std::thread_local! {
    static CAPTURED: core::cell::RefCell<std::string::String> =
        core::cell::RefCell::new(std::string::String::new());
}

#[doc(hidden)]
#[cfg(test)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    CAPTURED.with(|buf| {
        let _ = buf.borrow_mut().write_fmt(args);
    });
}

/// Drains everything printed on the current thread.
#[cfg(test)]
pub fn take_captured() -> std::string::String {
    CAPTURED.with(|buf| core::mem::take(&mut *buf.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn println_appends_newline() {
        take_captured();
        crate::println!("irq {} ready", 3);
        crate::print!("no newline");
        assert_eq!(take_captured(), "irq 3 ready\nno newline");
    }
}
