//! # Port I/O
//!
//! The instruction set only guarantees byte and word access to I/O ports, so
//! doubleword transfers are two word transfers at the same port, low word
//! first. They are not atomic: a trap can land between the two halves, which
//! none of the devices driven here care about.
//!
//! Drivers take a `&dyn PortIo` so the same code runs against real hardware
//! ([`HardwarePorts`]) and against a recording double in tests.

use x86_64::instructions::port::Port;

/// Writes here are decoded by nothing; used purely as a short delay.
pub const UNUSED_PORT: u16 = 0x80;

pub trait PortIo: Sync {
    fn inb(&self, port: u16) -> u8;
    fn outb(&self, port: u16, value: u8);
    fn inw(&self, port: u16) -> u16;
    fn outw(&self, port: u16, value: u16);

    fn ind(&self, port: u16) -> u32 {
        let low = self.inw(port) as u32;
        let high = self.inw(port) as u32;
        low | (high << 16)
    }

    fn outd(&self, port: u16, value: u32) {
        self.outw(port, (value & 0xFFFF) as u16);
        self.outw(port, (value >> 16) as u16);
    }

    /// Settling delay for devices that need time between commands.
    fn io_wait(&self) {
        self.outb(UNUSED_PORT, 0);
    }
}

/// Real port access through `in`/`out`.
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    /// The caller must be running with I/O privilege (ring 0 in this kernel).
    /// Every driver handed this value can reach any port.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for HardwarePorts {
    #[inline]
    fn inb(&self, port: u16) -> u8 {
        unsafe { Port::<u8>::new(port).read() }
    }

    #[inline]
    fn outb(&self, port: u16, value: u8) {
        unsafe { Port::<u8>::new(port).write(value) }
    }

    #[inline]
    fn inw(&self, port: u16) -> u16 {
        unsafe { Port::<u16>::new(port).read() }
    }

    #[inline]
    fn outw(&self, port: u16, value: u16) {
        unsafe { Port::<u16>::new(port).write(value) }
    }
}

/// Port access for the running kernel.
pub static HARDWARE_PORTS: HardwarePorts = unsafe { HardwarePorts::new() };

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PortAccess, RecordingPorts};

    #[test]
    fn doubleword_write_is_two_words_low_first() {
        let ports = RecordingPorts::new();
        ports.outd(0x1F0, 0xDEAD_BEEF);
        assert_eq!(
            ports.writes(),
            vec![
                PortAccess::Word(0x1F0, 0xBEEF),
                PortAccess::Word(0x1F0, 0xDEAD),
            ]
        );
    }

    #[test]
    fn doubleword_read_combines_two_words() {
        let ports = RecordingPorts::new();
        ports.queue_word(0x1F0, 0x5678);
        ports.queue_word(0x1F0, 0x1234);
        assert_eq!(ports.ind(0x1F0), 0x1234_5678);
    }

    #[test]
    fn io_wait_touches_only_the_unused_port() {
        let ports = RecordingPorts::new();
        ports.io_wait();
        assert_eq!(ports.writes(), vec![PortAccess::Byte(UNUSED_PORT, 0)]);
    }
}
