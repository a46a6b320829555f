//! # Interrupt subsystem
//!
//! | Piece        | Module       | Owns                                   |
//! |--------------|--------------|----------------------------------------|
//! | Segments     | `gdt`, `tss` | segment table, interrupt stack          |
//! | Gates        | `idt`        | 256 gate descriptors                    |
//! | Entry        | `trampoline` | per-vector stubs, snapshot construction |
//! | ISR dispatch | `isr`        | vector handler table, panic path        |
//! | IRQ layer    | `irq`, `pic` | line handler table, controller driver   |
//! | Timer        | `timer`      | PIT channel 0, tick counter             |
//!
//! All runtime state lives in one [`InterruptSubsystem`], [`INTERRUPTS`],
//! brought up by [`crate::kernel::init_kernel`] in a fixed order.

pub mod gdt;
pub mod idt;
pub mod irq;
pub mod isr;
pub mod pic;
pub mod registers;
pub mod timer;
pub mod trampoline;
pub mod tss;

use crate::io::{PortIo, HARDWARE_PORTS};
use irq::IrqLayer;
use isr::{InterruptHandler, IsrDispatcher};
use registers::RegisterSnapshot;
use timer::Pit;

pub struct InterruptSubsystem {
    pub isr: IsrDispatcher,
    pub irq: IrqLayer,
    pub pit: Pit,
}

impl InterruptSubsystem {
    pub const fn new(ports: &'static dyn PortIo) -> Self {
        Self {
            isr: IsrDispatcher::new(),
            irq: IrqLayer::new(),
            pit: Pit::new(ports),
        }
    }

    pub fn register_isr_handler(&self, vector: u8, handler: &'static dyn InterruptHandler) {
        self.isr.register_handler(vector, handler);
    }

    pub fn register_irq_handler(&self, irq: u8, handler: &'static dyn InterruptHandler) {
        self.irq.register_handler(irq, handler);
    }

    /// Entry point from the trap stubs.
    pub fn dispatch(&self, frame: &mut RegisterSnapshot) {
        self.isr.dispatch(frame);
    }
}

pub static INTERRUPTS: InterruptSubsystem = InterruptSubsystem::new(&HARDWARE_PORTS);
