//! # Programmable Interrupt Controller
//!
//! The IRQ layer never talks to controller hardware directly; it goes through
//! a [`PicDriver`]. Today the only driver is the legacy dual 8259.
//!
//! ## PIC Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │     │   PIC 2     │
//! │  (Primary)  │◀────│ (Secondary) │
//! │ IRQ 0-7     │ IR2 │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! Out of reset IRQ 0-7 land on vectors 8-15, on top of CPU exceptions.
//! `initialize` moves them:
//! - PIC 1: vectors `primary_base ..= primary_base + 7`
//! - PIC 2: vectors `secondary_base ..= secondary_base + 7`

use pic8259::ChainedPics;
use spin::Mutex;

use crate::log_warn;

const MODULE: &str = "PIC";

/// Index into the `[primary, secondary]` mask pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicChip {
    Primary = 0,
    Secondary = 1,
}

impl PicChip {
    /// Chip that owns `irq` and the bit position of the line on it.
    pub fn for_irq(irq: u8) -> (PicChip, u8) {
        if irq < 8 {
            (PicChip::Primary, irq)
        } else {
            (PicChip::Secondary, irq - 8)
        }
    }
}

/// Interrupt controller capabilities the IRQ layer relies on.
pub trait PicDriver: Sync {
    fn name(&self) -> &'static str;

    /// Whether the controller is present and responds.
    fn probe(&self) -> bool;

    /// Remaps the lines onto `primary_base..` and `secondary_base..`.
    fn initialize(&self, primary_base: u8, secondary_base: u8, auto_eoi: bool);

    fn send_end_of_interrupt(&self, irq: u8);

    /// Mask registers, `[primary, secondary]`. A set bit masks the line.
    fn masks(&self) -> [u8; 2];

    fn set_masks(&self, masks: [u8; 2]);
}

const PROBE_PATTERN: [u8; 2] = [0x37, 0x13];

/// The dual 8259 found on every PC, driven through `pic8259`.
pub struct Legacy8259 {
    state: Mutex<Legacy8259State>,
}

struct Legacy8259State {
    pics: ChainedPics,
    bases: [u8; 2],
}

impl Legacy8259 {
    pub const fn new() -> Self {
        Self {
            // Offsets are replaced on `initialize`; until then only the mask
            // registers are touched.
            state: Mutex::new(Legacy8259State {
                pics: unsafe { ChainedPics::new(0x20, 0x28) },
                bases: [0x20, 0x28],
            }),
        }
    }
}

impl Default for Legacy8259 {
    fn default() -> Self {
        Self::new()
    }
}

impl PicDriver for Legacy8259 {
    fn name(&self) -> &'static str {
        "8259 PIC"
    }

    fn probe(&self) -> bool {
        let mut state = self.state.lock();
        unsafe {
            state.pics.write_masks(PROBE_PATTERN[0], PROBE_PATTERN[1]);
            state.pics.read_masks() == PROBE_PATTERN
        }
    }

    fn initialize(&self, primary_base: u8, secondary_base: u8, auto_eoi: bool) {
        if auto_eoi {
            log_warn!(MODULE, "auto-EOI is not supported by the 8259 driver, using explicit EOI");
        }

        let mut state = self.state.lock();
        state.pics = unsafe { ChainedPics::new(primary_base, secondary_base) };
        state.bases = [primary_base, secondary_base];
        unsafe { state.pics.initialize() };
    }

    fn send_end_of_interrupt(&self, irq: u8) {
        let mut state = self.state.lock();
        // ChainedPics keys EOI on the vector, not the line.
        let (chip, line) = PicChip::for_irq(irq);
        let vector = state.bases[chip as usize].wrapping_add(line);
        unsafe { state.pics.notify_end_of_interrupt(vector) };
    }

    fn masks(&self) -> [u8; 2] {
        unsafe { self.state.lock().pics.read_masks() }
    }

    fn set_masks(&self, masks: [u8; 2]) {
        unsafe { self.state.lock().pics.write_masks(masks[0], masks[1]) };
    }
}

pub static LEGACY_8259: Legacy8259 = Legacy8259::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_split_across_the_two_chips() {
        assert_eq!(PicChip::for_irq(0), (PicChip::Primary, 0));
        assert_eq!(PicChip::for_irq(7), (PicChip::Primary, 7));
        assert_eq!(PicChip::for_irq(8), (PicChip::Secondary, 0));
        assert_eq!(PicChip::for_irq(15), (PicChip::Secondary, 7));
    }
}
