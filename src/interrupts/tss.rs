//! Task State Segment
//!
//! Gives the exceptions that must survive a broken kernel stack their own
//! stacks. Without them a fault raised while the kernel stack is itself
//! broken (overflow, corrupt rsp) cannot be serviced and ends in a triple
//! fault.
//!
//! In long mode a gate that names an IST slot switches to that stack on
//! every trap, nested or not, so only vectors that cannot nest on themselves
//! get one: double fault, NMI and machine check, each on its own stack.
//! Everything else runs on the stack that was live when the trap arrived.
//! The ring-0 slot carries a separate stack for privilege changes.

use spin::Lazy;
use x86_64::instructions::tables::load_tss;
use x86_64::structures::tss::TaskStateSegment;
use x86_64::VirtAddr;

use crate::log_debug;

const MODULE: &str = "TSS";

pub const ISR_STACK_SIZE: usize = 16 * 1024;

/// IST slots (0-based).
pub const DOUBLE_FAULT_IST_INDEX: u16 = 0;
pub const NMI_IST_INDEX: u16 = 1;
pub const MACHINE_CHECK_IST_INDEX: u16 = 2;

const IST_STACKS: usize = 3;

const NMI_VECTOR: u8 = 2;
const DOUBLE_FAULT_VECTOR: u8 = 8;
const MACHINE_CHECK_VECTOR: u8 = 18;

/// IST slot a gate should switch to, `None` to stay on the current stack.
pub const fn stack_index_for(vector: u8) -> Option<u16> {
    match vector {
        DOUBLE_FAULT_VECTOR => Some(DOUBLE_FAULT_IST_INDEX),
        NMI_VECTOR => Some(NMI_IST_INDEX),
        MACHINE_CHECK_VECTOR => Some(MACHINE_CHECK_IST_INDEX),
        _ => None,
    }
}

#[repr(C, align(16))]
struct InterruptStack([u8; ISR_STACK_SIZE]);

/// One stack per IST slot, then the ring-0 stack.
static mut STACKS: [InterruptStack; IST_STACKS + 1] =
    [const { InterruptStack([0; ISR_STACK_SIZE]) }; IST_STACKS + 1];

pub static TSS: Lazy<TaskStateSegment> = Lazy::new(|| {
    let mut tss = TaskStateSegment::new();

    tss.privilege_stack_table[0] = interrupt_stack_top();
    for index in 0..IST_STACKS {
        tss.interrupt_stack_table[index] = stack_top(index);
    }

    tss
});

/// One past the highest byte of stack `slot` (stacks grow down).
fn stack_top(slot: usize) -> VirtAddr {
    let base = VirtAddr::from_ptr(&raw const STACKS);
    base + ((slot + 1) * ISR_STACK_SIZE) as u64
}

/// Top of the ring-0 stack.
pub fn interrupt_stack_top() -> VirtAddr {
    stack_top(IST_STACKS)
}

/// Top of the stack behind IST slot `index`.
pub fn ist_stack_top(index: u16) -> VirtAddr {
    debug_assert!((index as usize) < IST_STACKS);
    stack_top(index as usize)
}

/// Loads the TSS selector into the task register.
///
/// The segment table holding the TSS descriptor must already be loaded, and
/// this must happen before interrupts are enabled.
pub fn load() {
    let selector = super::gdt::selectors().tss;
    unsafe { load_tss(selector) };
    log_debug!(
        MODULE,
        "Loaded TSS {:#x}, ring-0 stack top {:#x}",
        selector.0,
        interrupt_stack_top().as_u64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_has_its_own_aligned_stack() {
        let rsp0 = TSS.privilege_stack_table[0];
        assert_eq!(rsp0, interrupt_stack_top());

        let mut tops = vec![rsp0.as_u64()];
        for index in [DOUBLE_FAULT_IST_INDEX, NMI_IST_INDEX, MACHINE_CHECK_IST_INDEX] {
            let top = TSS.interrupt_stack_table[index as usize];
            assert_eq!(top, ist_stack_top(index));
            tops.push(top.as_u64());
        }

        for top in &tops {
            assert_ne!(*top, 0);
            assert_eq!(top % 16, 0);
        }
        tops.sort_unstable();
        for pair in tops.windows(2) {
            assert!(pair[1] - pair[0] >= ISR_STACK_SIZE as u64);
        }
    }

    #[test]
    fn only_non_nesting_exceptions_switch_stacks() {
        assert_eq!(stack_index_for(2), Some(NMI_IST_INDEX));
        assert_eq!(stack_index_for(8), Some(DOUBLE_FAULT_IST_INDEX));
        assert_eq!(stack_index_for(18), Some(MACHINE_CHECK_IST_INDEX));

        let switching = (0..=u8::MAX).filter(|&v| stack_index_for(v).is_some()).count();
        assert_eq!(switching, 3);
    }
}
