use core::fmt;
use lazy_static::lazy_static;
use spin::Mutex;
use volatile::Volatile;

lazy_static! {
    /// Global interface to the writer
    pub static ref WRITER: Mutex<Writer> = Mutex::new(Writer {
        column_position: 0,
        color_code: ColorCode::new(Color::LightGray, Color::Black),
        buffer: unsafe { &mut *(0xb8000 as *mut Buffer) },
    });
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// Each enum variant is stored as a u8
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// Assure ColorCode has the exact same data layout as a u8
#[repr(transparent)]
/// The full attribute byte: background in the high nibble, foreground in the low
pub struct ColorCode(u8);

impl ColorCode {
    pub fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// Guarantees that the struct fields are laid out exactly like
// the two bytes of a VGA cell
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

pub const BUFFER_HEIGHT: usize = 25;
pub const BUFFER_WIDTH: usize = 80;

#[repr(transparent)]
struct Buffer {
    /// 2D array of ScreenChar's
    // Marked as volatile since we only write to the Buffer and
    // never read from it again. The compiler doesn't know that
    // we really access VGA buffer memory (instead of normal RAM)
    // and knows nothing about the side effect that some
    // characters appear on the screen. So it might decide that
    // these writes are unnecessary and can be omitted.
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// Error for cell addressing outside the 80x25 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgaError {
    OutOfBounds { row: usize, col: usize },
}

impl fmt::Display for VgaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VgaError::OutOfBounds { row, col } => write!(
                f,
                "cell ({}, {}) outside the {}x{} text grid",
                row, col, BUFFER_HEIGHT, BUFFER_WIDTH
            ),
        }
    }
}

pub struct Writer {
    column_position: usize,
    color_code: ColorCode,
    buffer: &'static mut Buffer,
}

// Implement Write for Writer so we can use Rust's formating
// macros
impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

impl Writer {
    fn check_bounds(&self, row: usize, col: usize) -> Result<(), VgaError> {
        if row >= BUFFER_HEIGHT || col >= BUFFER_WIDTH {
            return Err(VgaError::OutOfBounds { row, col });
        }
        Ok(())
    }

    /// Write a full cell, character and attribute, at the given position.
    pub fn write_cell(
        &mut self,
        row: usize,
        col: usize,
        byte: u8,
        color: ColorCode,
    ) -> Result<(), VgaError> {
        self.check_bounds(row, col)?;
        self.buffer.chars[row][col].write(ScreenChar {
            ascii_character: byte,
            color_code: color,
        });
        Ok(())
    }

    /// Read a cell back from the buffer.
    pub fn read_cell(&self, row: usize, col: usize) -> Result<ScreenChar, VgaError> {
        self.check_bounds(row, col)?;
        Ok(self.buffer.chars[row][col].read())
    }

    /// Write only the character byte of a cell; the attribute byte the cell
    /// already holds stays in place.
    pub fn write_glyph(&mut self, row: usize, col: usize, byte: u8) -> Result<(), VgaError> {
        self.check_bounds(row, col)?;
        let current = self.buffer.chars[row][col].read();
        self.buffer.chars[row][col].write(ScreenChar {
            ascii_character: byte,
            color_code: current.color_code,
        });
        Ok(())
    }

    /// Stamp the string's raw bytes into consecutive cells starting at the
    /// top-left corner, row-major, without touching any attribute byte.
    /// Returns the number of cells written. An input longer than the grid
    /// stops at the first out-of-range cell with an error instead of
    /// running past the buffer.
    pub fn overlay_str(&mut self, s: &str) -> Result<usize, VgaError> {
        for (i, byte) in s.bytes().enumerate() {
            self.write_glyph(i / BUFFER_WIDTH, i % BUFFER_WIDTH, byte)?;
        }
        Ok(s.len())
    }

    /// Set the color used by subsequent cursor-based writes.
    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.color_code = ColorCode::new(foreground, background);
    }

    /// Write a string to the VGA Buffer
    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            match byte {
                // Printable ASCII byte or newline
                0x20..=0x7e | b'\n' => self.write_byte(byte),
                // Not part of the printable ASCII range,
                // write a square character
                _ => self.write_byte(0xfe),
            }
        }
    }

    /// Write a single byte to the VGA Buffer
    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            byte => {
                // If we are at the end of the column...
                if self.column_position >= BUFFER_WIDTH {
                    // Add a new line
                    self.new_line();
                }

                // Cursor output goes to the last row; new_line scrolls
                // everything above it
                let row = BUFFER_HEIGHT - 1;
                let col = self.column_position;

                let color_code = self.color_code;
                self.buffer.chars[row][col].write(ScreenChar {
                    ascii_character: byte,
                    color_code,
                });
                self.column_position += 1;
            }
        }
    }

    /// Move every character one line up (the top line will be
    /// deleted) and start at the beginning of the last line
    /// again
    fn new_line(&mut self) {
        // Omit 0th row since its the row that is shifted off
        // screen.
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let character = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(character);
            }
        }

        // Clear last row
        self.clear_row(BUFFER_HEIGHT - 1);
        self.column_position = 0;
    }

    /// Clear the specified row with spaces
    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };

        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }

    /// Blank the whole grid and home the cursor.
    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column_position = 0;
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    // A handler printing from interrupt context would re-enter a held lock,
    // so the lock is only taken with interrupts masked.
    interrupts::without_interrupts(|| {
        WRITER.lock().write_fmt(args).unwrap();
    });
}

#[test_case]
fn test_println_simple() {
    println!("test_println_simple output");
}

#[test_case]
fn test_println_many() {
    for _ in 0..200 {
        println!("test_println_many output");
    }
}

#[test_case]
fn test_println_output() {
    use core::fmt::Write;
    use x86_64::instructions::interrupts;

    let s = "Some test string that fits on a single line";
    interrupts::without_interrupts(|| {
        let mut writer = WRITER.lock();
        writeln!(writer, "\n{}", s).expect("writeln failed");
        for (i, c) in s.chars().enumerate() {
            let screen_char = writer.buffer.chars[BUFFER_HEIGHT - 2][i].read();
            assert_eq!(char::from(screen_char.ascii_character), c);
        }
    });
}

#[test_case]
fn test_write_cell_roundtrip() {
    let code = ColorCode::new(Color::Yellow, Color::Blue);
    let mut writer = WRITER.lock();
    writer.write_cell(0, 0, b'A', code).expect("write_cell failed");
    let cell = writer.read_cell(0, 0).expect("read_cell failed");
    assert_eq!(cell.ascii_character, b'A');
    assert_eq!(cell.color_code, code);
}

#[test_case]
fn test_write_cell_out_of_bounds() {
    let code = ColorCode::new(Color::White, Color::Black);
    let mut writer = WRITER.lock();
    assert_eq!(
        writer.write_cell(BUFFER_HEIGHT, 0, b'!', code),
        Err(VgaError::OutOfBounds {
            row: BUFFER_HEIGHT,
            col: 0
        })
    );
    assert_eq!(
        writer.write_cell(0, BUFFER_WIDTH, b'!', code),
        Err(VgaError::OutOfBounds {
            row: 0,
            col: BUFFER_WIDTH
        })
    );
}

#[test_case]
fn test_overlay_preserves_attribute() {
    let code = ColorCode::new(Color::Pink, Color::DarkGray);
    let mut writer = WRITER.lock();
    writer.write_cell(0, 3, b'A', code).expect("write_cell failed");
    writer.write_glyph(0, 3, b'B').expect("write_glyph failed");
    let cell = writer.read_cell(0, 3).expect("read_cell failed");
    assert_eq!(cell.ascii_character, b'B');
    assert_eq!(cell.color_code, code);
}

#[test_case]
fn test_overlay_places_each_byte() {
    let mut writer = WRITER.lock();
    let written = writer.overlay_str("VGA!").expect("overlay_str failed");
    assert_eq!(written, 4);
    for (i, byte) in b"VGA!".iter().enumerate() {
        let cell = writer.read_cell(0, i).expect("cell in bounds");
        assert_eq!(cell.ascii_character, *byte);
    }
}

#[test_case]
fn test_overlay_wraps_to_next_row() {
    let bytes = [b'r'; BUFFER_WIDTH + 1];
    let s = core::str::from_utf8(&bytes).expect("ascii is valid utf8");
    let mut writer = WRITER.lock();
    writer.overlay_str(s).expect("overlay_str failed");
    let cell = writer.read_cell(1, 0).expect("cell in bounds");
    assert_eq!(cell.ascii_character, b'r');
}

#[test_case]
fn test_overlay_empty_writes_nothing() {
    let code = ColorCode::new(Color::White, Color::Black);
    let mut writer = WRITER.lock();
    writer.write_cell(0, 0, b'Z', code).expect("write_cell failed");
    assert_eq!(writer.overlay_str(""), Ok(0));
    let cell = writer.read_cell(0, 0).expect("read_cell failed");
    assert_eq!(cell.ascii_character, b'Z');
}

#[test_case]
fn test_overlay_rejects_overlong_input() {
    let bytes = [b'x'; BUFFER_WIDTH * BUFFER_HEIGHT + 1];
    let s = core::str::from_utf8(&bytes).expect("ascii is valid utf8");
    let mut writer = WRITER.lock();
    assert_eq!(
        writer.overlay_str(s),
        Err(VgaError::OutOfBounds {
            row: BUFFER_HEIGHT,
            col: 0
        })
    );
}
