#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(vga_console::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use vga_console::format::{printf, Arg};
use vga_console::println;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();

    loop {}
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    vga_console::test_panic_handler(info)
}

#[test_case]
fn test_println() {
    println!("test_println output");
}

#[test_case]
fn test_printf_after_boot() {
    printf("boot cpus=%d mode=%s\n", &[Arg::Int(1), Arg::Str("text")])
        .expect("printf failed");
}
