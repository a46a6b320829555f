//! CPU control: interrupt flag, idle and halt.
//!
//! Global interrupt enable/disable is the only lock primitive the interrupt
//! core relies on. Every read-modify-write of shared tables or controller
//! masks from normal context goes through [`without_interrupts`].
//!
//! Host test builds cannot execute `cli`/`sti`/`hlt` (they fault in user
//! mode), so they get inert versions with the same signatures.

#[cfg(not(test))]
use x86_64::instructions::{hlt, interrupts};

/// Runs `f` with maskable interrupts disabled, restoring the previous state.
#[cfg(not(test))]
#[inline]
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    interrupts::without_interrupts(f)
}

#[cfg(not(test))]
#[inline]
pub fn enable_interrupts() {
    interrupts::enable();
}

/// Suspends the CPU until the next interrupt of any kind.
#[cfg(not(test))]
#[inline]
pub fn idle() {
    hlt();
}

/// Unrecoverable stop: interrupts off, halt forever.
#[cfg(not(test))]
pub fn halt_forever() -> ! {
    interrupts::disable();
    loop {
        hlt();
    }
}

#[cfg(test)]
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(test)]
pub fn enable_interrupts() {}

#[cfg(test)]
pub fn idle() {
    std::thread::yield_now();
}

#[cfg(test)]
pub fn halt_forever() -> ! {
    panic!("cpu halted");
}
