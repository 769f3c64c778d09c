#![no_std]
#![no_main]

use core::panic::PanicInfo;
use vga_console::vga_buffer::{Color, ColorCode, BUFFER_HEIGHT, WRITER};
use vga_console::{exit_qemu, serial_print, serial_println, QemuExitCode};

#[no_mangle]
pub extern "C" fn _start() -> ! {
    should_fail();
    serial_println!("[test did not panic]");
    exit_qemu(QemuExitCode::Failed);
    loop {}
}

fn should_fail() {
    serial_print!("should_panic::should_fail...\t");
    let code = ColorCode::new(Color::White, Color::Black);
    // One row past the end of the grid; unwrapping the error must panic.
    WRITER
        .lock()
        .write_cell(BUFFER_HEIGHT, 0, b'!', code)
        .expect("cell write past the last row");
}

#[panic_handler]
fn panic(_info: &PanicInfo) -> ! {
    serial_println!("[ok]");
    exit_qemu(QemuExitCode::Success);
    loop {}
}
