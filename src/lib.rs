//! # Trap and Interrupt Core
//!
//! Everything that sits between the CPU's interrupt logic and the rest of the
//! kernel:
//!
//! - **Port I/O** (`io`): byte/word/doubleword port access and `io_wait`
//! - **Descriptor tables** (`interrupts::gdt`, `interrupts::idt`): segment
//!   table and the 256-gate interrupt table
//! - **TSS** (`interrupts::tss`): a dedicated stack for interrupt servicing
//! - **ISR dispatch** (`interrupts::isr`): per-vector handler table and the
//!   unhandled-exception panic path
//! - **IRQ layer** (`interrupts::irq`, `interrupts::pic`): legacy IRQ lines
//!   behind a pluggable controller driver
//! - **Timer** (`interrupts::timer`): PIT tick source and sleep primitives
//!
//! ## Usage
//!
//! ```ignore
//! use trapcore::{config::KernelConfig, interrupts, kernel};
//!
//! kernel::init_kernel(&KernelConfig::DEFAULT)?;
//! interrupts::INTERRUPTS.register_irq_handler(1, &keyboard_handler);
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod console;
pub mod cpu;
pub mod interrupts;
pub mod io;
pub mod kernel;
pub mod logger;

#[cfg(test)]
mod test_support;
