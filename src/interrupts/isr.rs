//! # Exception / ISR dispatch
//!
//! Every trap of every vector ends up in [`IsrDispatcher::dispatch`]:
//!
//! | Vector     | Registered | Outcome                                        |
//! |------------|------------|------------------------------------------------|
//! | any        | yes        | handler runs once with the snapshot            |
//! | 32..=255   | no         | `Unhandled interrupt N!` logged, trap returns  |
//! | 0..=31     | no         | register dump, `KERNEL PANIC!`, halt           |
//!
//! Handlers are `&'static dyn InterruptHandler`. Plain functions and closures
//! of the form `Fn(&mut RegisterSnapshot)` implement the trait directly;
//! drivers that keep state implement it on their static instance.

use spin::Mutex;

use super::idt::{GateFlags, GateTable, GATE_COUNT};
use super::registers::{DumpLine, RegisterSnapshot};
use super::tss;
use crate::{cpu, log_crit, log_debug, log_err, println};

const MODULE: &str = "ISR";

/// First vector past the architectural exceptions.
pub const EXCEPTION_COUNT: usize = 32;

/// Software-interrupt vector kept disabled at boot.
pub const SYSCALL_VECTOR: u8 = 0x80;

pub static EXCEPTION_NAMES: [&str; EXCEPTION_COUNT] = [
    "Divide by zero error",
    "Debug",
    "Non-maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack-Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "",
    "x87 Floating-Point Exception",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
    "Virtualization Exception",
    "Control Protection Exception",
    "",
    "",
    "",
    "",
    "",
    "",
    "Hypervisor Injection Exception",
    "VMM Communication Exception",
    "Security Exception",
    "",
];

/// Name of an architectural exception, `""` for reserved slots and for
/// vectors past the exception range.
pub fn exception_name(vector: u8) -> &'static str {
    EXCEPTION_NAMES.get(vector as usize).copied().unwrap_or("")
}

/// Something that services a trap.
///
/// Runs in interrupt context with interrupts disabled: it must not block and
/// must not take a lock that normal code holds with interrupts enabled.
pub trait InterruptHandler: Sync {
    fn handle(&self, frame: &mut RegisterSnapshot);
}

impl<F> InterruptHandler for F
where
    F: Fn(&mut RegisterSnapshot) + Sync,
{
    fn handle(&self, frame: &mut RegisterSnapshot) {
        self(frame)
    }
}

pub type HandlerSlot = Option<&'static dyn InterruptHandler>;

pub struct IsrDispatcher {
    gates: GateTable,
    handlers: Mutex<[HandlerSlot; GATE_COUNT]>,
}

impl IsrDispatcher {
    pub const fn new() -> Self {
        Self {
            gates: GateTable::new(),
            handlers: Mutex::new([None; GATE_COUNT]),
        }
    }

    pub fn gates(&self) -> &GateTable {
        &self.gates
    }

    /// Points every gate at its trampoline, routes the non-nesting exceptions
    /// onto their IST stacks and switches every gate on, except the syscall
    /// vector.
    pub fn initialize(&self, trampoline: impl Fn(u8) -> u64, code_selector: u16) {
        for vector in 0..=u8::MAX {
            self.gates
                .set_gate(vector, trampoline(vector), code_selector, GateFlags::KERNEL_INTERRUPT);
            self.gates
                .set_stack_index(vector, tss::stack_index_for(vector));
        }

        for vector in 0..=u8::MAX {
            self.gates.enable_gate(vector);
        }
        self.gates.disable_gate(SYSCALL_VECTOR);

        log_debug!(MODULE, "Installed {} gates, vector {:#x} disabled", GATE_COUNT, SYSCALL_VECTOR);
    }

    /// Installs `handler` for `vector` and marks the gate present.
    /// A later registration replaces an earlier one.
    pub fn register_handler(&self, vector: u8, handler: &'static dyn InterruptHandler) {
        cpu::without_interrupts(|| self.handlers.lock()[vector as usize] = Some(handler));
        self.gates.enable_gate(vector);
    }

    pub fn handler(&self, vector: u8) -> HandlerSlot {
        cpu::without_interrupts(|| self.handlers.lock()[vector as usize])
    }

    pub fn dispatch(&self, frame: &mut RegisterSnapshot) {
        let vector = frame.vector();

        // Copied out so the handler runs without the table lock held.
        if let Some(handler) = self.handler(vector) {
            handler.handle(frame);
        } else if vector as usize >= EXCEPTION_COUNT {
            log_err!(MODULE, "Unhandled interrupt {}!", vector);
        } else {
            unhandled_exception(frame);
        }
    }
}

impl Default for IsrDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn unhandled_exception(frame: &RegisterSnapshot) -> ! {
    let vector = frame.vector();
    let name = exception_name(vector);

    println!("Unhandled exception {} {}", vector, name);
    for line in [DumpLine::General, DumpLine::Extended, DumpLine::Control] {
        println!("{}", frame.dump(line));
    }

    log_crit!(MODULE, "Unhandled exception {} {}", vector, name);
    for line in DumpLine::ALL {
        log_crit!(MODULE, "{}", frame.dump(line));
    }

    log_crit!(MODULE, "KERNEL PANIC!");
    println!("KERNEL PANIC!");

    panic!("KERNEL PANIC: unhandled exception {} {}", vector, name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::take_captured;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stub_address(vector: u8) -> u64 {
        0xFFFF_8000_0000_0000 + vector as u64 * 16
    }

    fn leak_counter() -> &'static AtomicUsize {
        Box::leak(Box::new(AtomicUsize::new(0)))
    }

    fn counting_handler(counter: &'static AtomicUsize) -> &'static dyn InterruptHandler {
        Box::leak(Box::new(move |_: &mut RegisterSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn exception_table_has_reserved_gaps() {
        assert_eq!(EXCEPTION_NAMES.len(), 32);
        assert_eq!(exception_name(0), "Divide by zero error");
        assert_eq!(exception_name(14), "Page Fault");
        assert_eq!(exception_name(15), "");
        assert_eq!(exception_name(21), "Control Protection Exception");
        assert_eq!(exception_name(31), "");
        assert_eq!(exception_name(200), "");
    }

    #[test]
    fn initialize_enables_everything_but_the_syscall_vector() {
        let isr = IsrDispatcher::new();
        isr.initialize(stub_address, 0x08);

        for vector in 0..=u8::MAX {
            let gate = isr.gates().gate(vector);
            assert_eq!(gate.handler_address(), stub_address(vector));
            assert_eq!(gate.selector(), 0x08);
            assert_eq!(gate.flags().ring(), 0);
            assert_eq!(gate.flags().present(), vector != SYSCALL_VECTOR);
        }
    }

    #[test]
    fn only_double_fault_nmi_and_machine_check_get_an_ist_stack() {
        let isr = IsrDispatcher::new();
        isr.initialize(stub_address, 0x08);

        assert_eq!(isr.gates().gate(2).stack_index(), tss::NMI_IST_INDEX as u8 + 1);
        assert_eq!(isr.gates().gate(8).stack_index(), tss::DOUBLE_FAULT_IST_INDEX as u8 + 1);
        assert_eq!(isr.gates().gate(18).stack_index(), tss::MACHINE_CHECK_IST_INDEX as u8 + 1);
        for vector in (0..=u8::MAX).filter(|v| ![2, 8, 18].contains(v)) {
            assert_eq!(isr.gates().gate(vector).stack_index(), 0, "vector {vector}");
        }
    }

    #[test]
    fn registering_enables_the_gate() {
        let isr = IsrDispatcher::new();
        isr.initialize(stub_address, 0x08);
        assert!(!isr.gates().is_present(SYSCALL_VECTOR));

        let count = leak_counter();
        isr.register_handler(SYSCALL_VECTOR, counting_handler(count));
        assert!(isr.gates().is_present(SYSCALL_VECTOR));

        isr.dispatch(&mut RegisterSnapshot::for_vector(SYSCALL_VECTOR));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registered_handler_runs_exactly_once_per_trap() {
        let isr = IsrDispatcher::new();
        let count = leak_counter();
        isr.register_handler(0x30, counting_handler(count));

        for _ in 0..3 {
            isr.dispatch(&mut RegisterSnapshot::for_vector(0x30));
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn registered_handler_suppresses_exception_panic() {
        fn breakpoint(frame: &mut RegisterSnapshot) {
            frame.rip += 1;
        }

        let isr = IsrDispatcher::new();
        isr.register_handler(3, &breakpoint);

        let mut frame = RegisterSnapshot::for_vector(3);
        frame.rip = 0x1000;
        isr.dispatch(&mut frame);
        assert_eq!(frame.rip, 0x1001);
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let isr = IsrDispatcher::new();
        let first = leak_counter();
        let second = leak_counter();
        isr.register_handler(0x40, counting_handler(first));
        isr.register_handler(0x40, counting_handler(second));

        isr.dispatch(&mut RegisterSnapshot::for_vector(0x40));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unhandled_interrupt_is_logged_and_survived() {
        let isr = IsrDispatcher::new();
        take_captured();
        isr.dispatch(&mut RegisterSnapshot::for_vector(0x50));
        assert!(take_captured().contains("[ERROR] ISR: Unhandled interrupt 80!"));
    }

    #[test]
    #[should_panic(expected = "KERNEL PANIC")]
    fn unhandled_exception_halts() {
        let isr = IsrDispatcher::new();
        let mut frame = RegisterSnapshot::for_vector(13);
        frame.error_code = 0x10;
        isr.dispatch(&mut frame);
    }

    #[test]
    fn unhandled_exception_dumps_registers_first() {
        let isr = IsrDispatcher::new();
        let mut frame = RegisterSnapshot::for_vector(0);
        frame.rip = 0xC0FFEE;
        take_captured();

        let result = panic::catch_unwind(AssertUnwindSafe(|| isr.dispatch(&mut frame)));
        assert!(result.is_err());

        let out = take_captured();
        assert!(out.contains("Unhandled exception 0 Divide by zero error\n"));
        assert!(out.contains("rip=0xc0ffee"));
        assert!(out.contains("[CRIT ] ISR:   interrupt=0x0  errorcode=0x0"));
        assert!(out.contains("[CRIT ] ISR: KERNEL PANIC!"));
        assert!(out.ends_with("KERNEL PANIC!\n"));
    }
}
