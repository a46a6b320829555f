#![no_std]
#![no_main]

extern crate rlibc;

use bootloader_api::{entry_point, BootInfo};
use core::panic::PanicInfo;

use trapcore::config::KernelConfig;
use trapcore::interrupts::INTERRUPTS;
use trapcore::kernel::init_kernel;
use trapcore::{cpu, println};

entry_point!(kernel_main);

pub fn kernel_main(_boot_info: &'static mut BootInfo) -> ! {
    let config = KernelConfig::default();

    if let Err(e) = init_kernel(&config) {
        println!("Kernel initialization failed: {}", e);
        cpu::halt_forever();
    }

    loop {
        INTERRUPTS.pit.sleep_seconds(1);
        println!(
            "uptime {} ms ({} ticks)",
            INTERRUPTS.pit.uptime_milliseconds(),
            INTERRUPTS.pit.ticks()
        );
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    cpu::halt_forever();
}
