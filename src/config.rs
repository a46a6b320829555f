//! Boot-time configuration for the interrupt core.

use crate::logger::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Rate the PIT is programmed to. Sleep granularity is `1000 / hz` ms.
    pub timer_frequency_hz: u32,
    pub log_level: LogLevel,
}

impl KernelConfig {
    pub const DEFAULT: KernelConfig = KernelConfig {
        timer_frequency_hz: 500,
        log_level: LogLevel::Debug,
    };
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
