//! # Interrupt Gate Table
//!
//! 256 long-mode gate descriptors indexed directly by vector.
//!
//! ```text
//!  127                 96 95                 64
//! ┌────────────────────┬────────────────────┐
//! │      reserved      │  offset[63:32]     │
//! └────────────────────┴────────────────────┘
//!  63        48 47   40 39  35 34 32 31   16 15        0
//! ┌────────────┬───────┬──────┬─────┬───────┬───────────┐
//! │offset[31:16]│ flags │  0   │ ist │selector│offset[15:0]│
//! └────────────┴───────┴──────┴─────┴───────┴───────────┘
//! ```
//!
//! A gate whose present bit is clear makes the CPU raise #NP instead of
//! calling the handler, so vectors are wired first ([`GateTable::set_gate`])
//! and switched on separately ([`GateTable::enable_gate`]).

use core::mem::size_of;

use spin::Mutex;
use x86_64::instructions::tables::{lidt, DescriptorTablePointer};
use x86_64::VirtAddr;

use crate::cpu;
use crate::log_info;

const MODULE: &str = "IDT";

pub const GATE_COUNT: usize = 256;

/// Type/attribute byte of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateFlags(pub u8);

impl GateFlags {
    pub const PRESENT: u8 = 0x80;
    pub const RING0: u8 = 0x00;
    pub const RING3: u8 = 0x60;
    pub const INTERRUPT_GATE: u8 = 0x0E;
    pub const TRAP_GATE: u8 = 0x0F;

    /// Ring-0 interrupt gate, not yet present.
    pub const KERNEL_INTERRUPT: GateFlags = GateFlags(Self::RING0 | Self::INTERRUPT_GATE);

    pub const fn present(self) -> bool {
        self.0 & Self::PRESENT != 0
    }

    pub const fn ring(self) -> u8 {
        (self.0 >> 5) & 0b11
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    flags: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl GateDescriptor {
    pub const MISSING: GateDescriptor = GateDescriptor {
        offset_low: 0,
        selector: 0,
        ist: 0,
        flags: 0,
        offset_mid: 0,
        offset_high: 0,
        reserved: 0,
    };

    pub fn handler_address(&self) -> u64 {
        self.offset_low as u64 | (self.offset_mid as u64) << 16 | (self.offset_high as u64) << 32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn flags(&self) -> GateFlags {
        GateFlags(self.flags)
    }

    /// TSS interrupt-stack slot, 1-based as the CPU reads it; 0 keeps the
    /// current stack.
    pub fn stack_index(&self) -> u8 {
        self.ist & 0b111
    }
}

pub struct GateTable {
    entries: Mutex<[GateDescriptor; GATE_COUNT]>,
}

impl GateTable {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new([GateDescriptor::MISSING; GATE_COUNT]),
        }
    }

    fn update<R>(&self, f: impl FnOnce(&mut [GateDescriptor; GATE_COUNT]) -> R) -> R {
        cpu::without_interrupts(|| f(&mut self.entries.lock()))
    }

    /// Writes a gate. The present bit is taken from `flags` as given.
    pub fn set_gate(&self, vector: u8, handler_address: u64, selector: u16, flags: GateFlags) {
        self.update(|gates| {
            let gate = &mut gates[vector as usize];
            gate.offset_low = handler_address as u16;
            gate.selector = selector;
            gate.flags = flags.0;
            gate.offset_mid = (handler_address >> 16) as u16;
            gate.offset_high = (handler_address >> 32) as u32;
            gate.reserved = 0;
        });
    }

    /// Routes `vector` onto TSS interrupt stack `index` (0-based), or back
    /// onto the interrupted stack with `None`.
    pub fn set_stack_index(&self, vector: u8, index: Option<u16>) {
        let ist = match index {
            Some(index) => {
                debug_assert!(index < 7, "TSS has seven interrupt stacks");
                index as u8 + 1
            }
            None => 0,
        };
        self.update(|gates| gates[vector as usize].ist = ist);
    }

    pub fn enable_gate(&self, vector: u8) {
        self.update(|gates| gates[vector as usize].flags |= GateFlags::PRESENT);
    }

    pub fn disable_gate(&self, vector: u8) {
        self.update(|gates| gates[vector as usize].flags &= !GateFlags::PRESENT);
    }

    pub fn gate(&self, vector: u8) -> GateDescriptor {
        self.update(|gates| gates[vector as usize])
    }

    pub fn is_present(&self, vector: u8) -> bool {
        self.gate(vector).flags().present()
    }

    /// Loads the table's base and limit into IDTR.
    pub fn load(&'static self) {
        let base = self.update(|gates| gates.as_ptr() as u64);
        let pointer = DescriptorTablePointer {
            limit: (GATE_COUNT * size_of::<GateDescriptor>() - 1) as u16,
            base: VirtAddr::new(base),
        };
        unsafe { lidt(&pointer) };
    }

    /// Logs every gate.
    pub fn dump(&self) {
        for vector in 0..GATE_COUNT {
            let gate = self.gate(vector as u8);
            let flags = gate.flags();
            if flags.present() {
                log_info!(
                    MODULE,
                    "Vec {:3}: base={:#018x} sel={:#06x} flags={:#04x}",
                    vector,
                    gate.handler_address(),
                    gate.selector(),
                    flags.0
                );
            } else {
                log_info!(MODULE, "Vec {:3}: NOT PRESENT", vector);
            }
        }
    }
}

impl Default for GateTable {
    fn default() -> Self {
        Self::new()
    }
}
