//! IRQ layer: routes the sixteen legacy hardware lines.
//!
//! The layer sits between the ISR dispatcher and the interrupt controller.
//! It claims vectors `IRQ_VECTOR_BASE..IRQ_VECTOR_BASE + 16` on the
//! dispatcher, translates the vector back into a line number, runs the line's
//! handler and acknowledges the controller.

use spin::Mutex;

use super::isr::{InterruptHandler, IsrDispatcher};
use super::pic::{PicChip, PicDriver};
use super::registers::RegisterSnapshot;
use crate::{cpu, log_debug, log_info, log_warn};

const MODULE: &str = "PIC";

pub const IRQ_VECTOR_BASE: u8 = 0x20;
pub const IRQ_LINES: u8 = 16;

pub struct IrqLayer {
    driver: Mutex<Option<&'static dyn PicDriver>>,
    handlers: Mutex<[Option<&'static dyn InterruptHandler>; IRQ_LINES as usize]>,
}

impl IrqLayer {
    pub const fn new() -> Self {
        Self {
            driver: Mutex::new(None),
            handlers: Mutex::new([None; IRQ_LINES as usize]),
        }
    }

    /// Picks the controller, remaps it above the exceptions, claims the IRQ
    /// vectors and masks every line.
    ///
    /// The last candidate that probes successfully wins. With none the layer
    /// stays inert.
    pub fn initialize(&'static self, isr: &IsrDispatcher, candidates: &[&'static dyn PicDriver]) {
        let Some(driver) = candidates.iter().copied().filter(|pic| pic.probe()).last() else {
            log_warn!(MODULE, "No PIC found!");
            return;
        };

        log_info!(MODULE, "Found {} PIC.", driver.name());
        driver.initialize(IRQ_VECTOR_BASE, IRQ_VECTOR_BASE + 8, false);
        cpu::without_interrupts(|| *self.driver.lock() = Some(driver));

        for irq in 0..IRQ_LINES {
            isr.register_handler(Self::vector_for(irq), self);
        }

        driver.set_masks([0xFF, 0xFF]);
    }

    /// Installs `handler` for `irq` and unmasks the line. Lines past 15 are
    /// ignored.
    pub fn register_handler(&self, irq: u8, handler: &'static dyn InterruptHandler) {
        if irq >= IRQ_LINES {
            return;
        }
        log_debug!(MODULE, "Registering IRQ handler for IRQ {}", irq);

        cpu::without_interrupts(|| self.handlers.lock()[irq as usize] = Some(handler));

        if self.driver().is_none() {
            log_warn!(MODULE, "IRQ {} registered without a PIC, line stays masked", irq);
            return;
        }
        self.unmask_line(irq);
    }

    pub fn unmask_line(&self, irq: u8) {
        self.update_mask(irq, |mask, bit| mask & !bit);
    }

    pub fn mask_line(&self, irq: u8) {
        self.update_mask(irq, |mask, bit| mask | bit);
    }

    fn update_mask(&self, irq: u8, f: impl FnOnce(u8, u8) -> u8) {
        if irq >= IRQ_LINES {
            return;
        }
        let Some(driver) = self.driver() else {
            return;
        };

        let (chip, line) = PicChip::for_irq(irq);
        cpu::without_interrupts(|| {
            let mut masks = driver.masks();
            masks[chip as usize] = f(masks[chip as usize], 1 << line);
            driver.set_masks(masks);
        });
    }

    pub fn driver_name(&self) -> Option<&'static str> {
        self.driver().map(|driver| driver.name())
    }

    pub const fn vector_for(irq: u8) -> u8 {
        IRQ_VECTOR_BASE + irq
    }

    pub fn handler(&self, irq: u8) -> Option<&'static dyn InterruptHandler> {
        cpu::without_interrupts(|| self.handlers.lock().get(irq as usize).copied().flatten())
    }

    fn driver(&self) -> Option<&'static dyn PicDriver> {
        cpu::without_interrupts(|| *self.driver.lock())
    }
}

impl Default for IrqLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptHandler for IrqLayer {
    fn handle(&self, frame: &mut RegisterSnapshot) {
        let irq = frame.vector().wrapping_sub(IRQ_VECTOR_BASE);
        match self.handler(irq) {
            Some(handler) => handler.handle(frame),
            None => log_warn!(MODULE, "Unhandled IRQ {}...", irq),
        }

        if let Some(driver) = self.driver() {
            driver.send_end_of_interrupt(irq);
        }
    }
}
