//! Programmable Interval Timer (8253/8254), channel 0.
//!
//! Channel 0 is run as a square-wave generator on IRQ 0 and drives the
//! kernel's only clock: a tick counter bumped once per timer interrupt.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::irq::IrqLayer;
use super::isr::InterruptHandler;
use super::registers::RegisterSnapshot;
use crate::io::PortIo;
use crate::{cpu, log_info};

const MODULE: &str = "PIT";

pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_180;

pub const PIT_CHANNEL0_PORT: u16 = 0x40;
pub const PIT_COMMAND_PORT: u16 = 0x43;

const PIT_COMMAND_CHANNEL0: u8 = 0x00;
const PIT_COMMAND_LATCH: u8 = 0x00;
const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
const PIT_COMMAND_BINARY: u8 = 0x00;

pub const PIT_IRQ_LINE: u8 = 0;

/// Reload value for `hz`, truncated to the 16-bit counter. `hz == 0`
/// programs 0, which the chip treats as 65536.
pub fn divisor_for(hz: u32) -> u16 {
    PIT_BASE_FREQUENCY_HZ.checked_div(hz).unwrap_or(0) as u16
}

pub struct Pit {
    ports: &'static dyn PortIo,
    ticks: AtomicU64,
    frequency: AtomicU32,
}

impl Pit {
    pub const fn new(ports: &'static dyn PortIo) -> Self {
        Self {
            ports,
            ticks: AtomicU64::new(0),
            frequency: AtomicU32::new(0),
        }
    }

    /// Programs channel 0 for `hz` interrupts per second, resets the tick
    /// counter and hooks IRQ 0.
    pub fn initialize(&'static self, hz: u32, irq: &IrqLayer) {
        let divisor = divisor_for(hz);

        self.ports.outb(
            PIT_COMMAND_PORT,
            PIT_COMMAND_CHANNEL0 | PIT_COMMAND_ACCESS_LOHI | PIT_COMMAND_MODE_SQUARE | PIT_COMMAND_BINARY,
        );
        self.ports.outb(PIT_CHANNEL0_PORT, (divisor & 0xFF) as u8);
        self.ports.outb(PIT_CHANNEL0_PORT, (divisor >> 8) as u8);

        self.frequency.store(hz, Ordering::SeqCst);
        self.ticks.store(0, Ordering::SeqCst);

        irq.register_handler(PIT_IRQ_LINE, self);
        log_info!(MODULE, "Timer at {} Hz (divisor {})", hz, divisor);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn frequency(&self) -> u32 {
        self.frequency.load(Ordering::SeqCst)
    }

    /// Blocks until at least `ticks` timer interrupts have arrived since the
    /// call. The counter is not reset: the wait is measured against its value
    /// on entry, so `ticks()` keeps growing across waits. Interrupts must be
    /// enabled or this never returns.
    pub fn wait_ticks(&self, ticks: u64) {
        self.wait_ticks_with(ticks, cpu::idle);
    }

    fn wait_ticks_with(&self, ticks: u64, mut idle: impl FnMut()) {
        let start = self.ticks();
        while self.ticks().wrapping_sub(start) < ticks {
            idle();
        }
    }

    /// Ticks covering `ms` at the current rate, rounded up. Saturates
    /// instead of wrapping into a short wait.
    pub fn ticks_for_milliseconds(&self, ms: u64) -> u64 {
        ms.saturating_mul(self.frequency() as u64).div_ceil(1000)
    }

    pub fn ticks_for_seconds(&self, seconds: u64) -> u64 {
        self.ticks_for_milliseconds(seconds.saturating_mul(1000))
    }

    pub fn sleep_milliseconds(&self, ms: u64) {
        self.wait_ticks(self.ticks_for_milliseconds(ms));
    }

    pub fn sleep_seconds(&self, seconds: u64) {
        self.wait_ticks(self.ticks_for_seconds(seconds));
    }

    pub fn uptime_milliseconds(&self) -> u64 {
        match self.frequency() {
            0 => 0,
            hz => self.ticks().saturating_mul(1000) / hz as u64,
        }
    }

    /// Latches channel 0 and reads back its current count.
    pub fn read_count(&self) -> u16 {
        cpu::without_interrupts(|| {
            self.ports.outb(PIT_COMMAND_PORT, PIT_COMMAND_CHANNEL0 | PIT_COMMAND_LATCH);
            let low = self.ports.inb(PIT_CHANNEL0_PORT) as u16;
            let high = self.ports.inb(PIT_CHANNEL0_PORT) as u16;
            high << 8 | low
        })
    }

    /// Writes a new reload value for channel 0, low byte first.
    pub fn set_count(&self, count: u16) {
        cpu::without_interrupts(|| {
            self.ports.outb(PIT_CHANNEL0_PORT, (count & 0xFF) as u8);
            self.ports.outb(PIT_CHANNEL0_PORT, (count >> 8) as u8);
        });
    }
}

impl InterruptHandler for Pit {
    fn handle(&self, _frame: &mut RegisterSnapshot) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}
