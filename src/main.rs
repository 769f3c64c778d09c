#![no_std] // Do not link the Rust stdlib
#![no_main] // Disable all Rust-level entry points
#![feature(custom_test_frameworks)]
#![test_runner(vga_console::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;
use vga_console::format::{printf, Arg};
use vga_console::vga_buffer::{Color, WRITER};
use vga_console::{hlt_loop, println};

// Disable name mangling to ensure that Rust really
// outputs a function with the name _start, without
// the attribute the compiler would generate some
// random name.
#[no_mangle]
// Mark as `extern "C"` to tell the compiler that
// it should use the C calling convention for this
// function
pub extern "C" fn _start() -> ! {
    // This function is the entry point, since the
    // linker looks for a function named `_start`
    // by default.

    vga_console::init();

    WRITER.lock().set_color(Color::LightGreen, Color::Black);
    println!("vga-console {}", env!("CARGO_PKG_VERSION"));
    WRITER.lock().set_color(Color::LightGray, Color::Black);

    let banner = printf(
        "%ux%u text cells at %s, default attribute 0x%02X\n",
        &[
            Arg::Uint(80),
            Arg::Uint(25),
            Arg::Str("0xB8000"),
            Arg::Uint(0x07),
        ],
    );
    if let Err(err) = banner {
        println!("printf failed: {}", err);
    }

    #[cfg(test)]
    test_main();

    hlt_loop();
}

/// This function is called on panic.
#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    hlt_loop();
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    vga_console::test_panic_handler(info)
}
