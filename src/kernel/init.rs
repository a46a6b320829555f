//! Kernel initialization phases
//!
//! Brings the interrupt core up in the only order that works:
//!
//! 1. segment table and gate table loaded
//! 2. every gate pointed at its trap stub, then the TSS loaded
//! 3. interrupt controller probed, remapped and fully masked
//! 4. PIT programmed and hooked on IRQ 0
//! 5. interrupts enabled

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::{log_err, log_info, println};

const MODULE: &str = "INIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// A phase was asked to run a second time.
    AlreadyInitialized(&'static str),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::AlreadyInitialized(what) => write!(f, "{} already initialized", what),
        }
    }
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn claim_once(flag: &AtomicBool, what: &'static str) -> Result<(), InitError> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .map(|_| ())
        .map_err(|_| InitError::AlreadyInitialized(what))
}

/// Initialize the interrupt core and enable interrupts.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub fn init_kernel(config: &crate::config::KernelConfig) -> Result<(), InitError> {
    use crate::{cpu, logger};
    use crate::interrupts::{gdt, pic::LEGACY_8259, trampoline, tss, INTERRUPTS};

    claim_once(&INITIALIZED, "Interrupt System")?;
    logger::set_min_level(config.log_level);

    println!("Initializing interrupt core...");

    init_phase(1, "Descriptor Tables", || {
        gdt::init();
        INTERRUPTS.isr.gates().load();
        Ok(())
    })?;

    init_phase(2, "Exception Dispatch", || {
        INTERRUPTS.isr.initialize(trampoline::entry_address, gdt::selectors().code.0);
        tss::load();
        Ok(())
    })?;

    init_phase(3, "IRQ Layer", || {
        INTERRUPTS.irq.initialize(&INTERRUPTS.isr, &[&LEGACY_8259]);
        Ok(())
    })?;

    init_phase(4, "Timer", || {
        INTERRUPTS.pit.initialize(config.timer_frequency_hz, &INTERRUPTS.irq);
        Ok(())
    })?;

    init_phase(5, "Interrupts", || {
        cpu::enable_interrupts();
        Ok(())
    })?;

    println!("Interrupt core ready.");
    Ok(())
}

const PHASES: usize = 5;

fn init_phase(
    step: usize,
    name: &'static str,
    init_fn: impl FnOnce() -> Result<(), InitError>,
) -> Result<(), InitError> {
    println!("[{}/{}] Initializing {}...", step, PHASES, name);

    match init_fn() {
        Ok(()) => {
            log_info!(MODULE, "{} initialized", name);
            Ok(())
        }
        Err(e) => {
            log_err!(MODULE, "{} failed: {}", name, e);
            Err(e)
        }
    }
}

/// Whether [`init_kernel`] has run.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::take_captured;

    #[test]
    fn second_claim_is_rejected() {
        let flag = AtomicBool::new(false);
        assert_eq!(claim_once(&flag, "Timer"), Ok(()));
        assert_eq!(
            claim_once(&flag, "Timer"),
            Err(InitError::AlreadyInitialized("Timer"))
        );
    }

    #[test]
    fn failing_phase_is_reported_and_propagated() {
        take_captured();
        let result = init_phase(3, "IRQ Layer", || Err(InitError::AlreadyInitialized("PIC")));
        assert_eq!(result, Err(InitError::AlreadyInitialized("PIC")));

        let out = take_captured();
        assert!(out.starts_with("[3/5] Initializing IRQ Layer...\n"));
        assert!(out.contains("[ERROR] INIT: IRQ Layer failed: PIC already initialized"));
    }

    #[test]
    fn successful_phase_logs_completion() {
        take_captured();
        assert_eq!(init_phase(1, "Descriptor Tables", || Ok(())), Ok(()));
        assert!(take_captured().contains("[INFO ] INIT: Descriptor Tables initialized"));
    }
}
