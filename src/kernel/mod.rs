/// Kernel initialization and bootstrap module
pub mod init;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use init::init_kernel;
pub use init::{is_initialized, InitError};
