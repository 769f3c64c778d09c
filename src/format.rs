//! C-style format strings.
//!
//! [`Segments`] splits a format string into literal runs, `%%` escapes and
//! typed conversion specifiers; [`format_into`] renders the stream together
//! with a typed argument slice into any [`core::fmt::Write`] sink. Nothing
//! allocates; literal segments borrow from the format string and numbers are
//! assembled in a stack buffer.
//!
//! Supported conversions: `%d`/`%i`, `%u`, `%x`, `%X`, `%c`, `%s`, each with
//! an optional `0` flag and minimum field width (`%08x`, `%5s`).

use core::fmt;

/// A typed argument for a conversion specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Int(i64),
    Uint(u64),
    Char(char),
    Str(&'a str),
}

/// What a conversion renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    /// `%d` / `%i`
    Decimal,
    /// `%u`
    Unsigned,
    /// `%x`
    Hex,
    /// `%X`
    UpperHex,
    /// `%c`
    Char,
    /// `%s`
    Str,
}

/// A parsed conversion specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spec {
    /// Pad numeric conversions with zeros instead of spaces.
    pub zero_pad: bool,
    /// Minimum field width; rendered values are right-aligned.
    pub width: usize,
    pub kind: SpecKind,
}

/// One piece of a parsed format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A run of ordinary characters, borrowed from the format string.
    Literal(&'a str),
    /// The `%%` escape.
    Percent,
    Conversion(Spec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The format string ended in the middle of a conversion.
    UnterminatedSpec,
    /// Unknown conversion character.
    BadSpec(char),
    /// More conversions than arguments.
    MissingArg,
    /// The argument's variant does not fit the conversion.
    TypeMismatch { expected: SpecKind },
    /// The underlying writer reported an error.
    Sink,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::UnterminatedSpec => {
                write!(f, "format string ends inside a conversion")
            }
            FormatError::BadSpec(c) => write!(f, "unknown conversion `%{}`", c),
            FormatError::MissingArg => write!(f, "more conversions than arguments"),
            FormatError::TypeMismatch { expected } => {
                write!(f, "argument does not fit a {:?} conversion", expected)
            }
            FormatError::Sink => write!(f, "output sink failed"),
        }
    }
}

impl From<fmt::Error> for FormatError {
    fn from(_: fmt::Error) -> FormatError {
        FormatError::Sink
    }
}

/// Pull parser over a format string.
///
/// Yields segments until the input is exhausted; after the first malformed
/// conversion the iterator reports the error once and fuses.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
    failed: bool,
}

impl<'a> Segments<'a> {
    pub fn new(fmt: &'a str) -> Segments<'a> {
        Segments {
            rest: fmt,
            failed: false,
        }
    }

    // Parses the conversion at the head of `rest`, which starts with '%'.
    fn conversion(&mut self) -> Result<Segment<'a>, FormatError> {
        let bytes = self.rest.as_bytes();
        let mut i = 1;

        let zero_pad = bytes.get(i) == Some(&b'0');
        if zero_pad {
            i += 1;
        }

        let mut width = 0usize;
        while let Some(digit @ b'0'..=b'9') = bytes.get(i).copied() {
            width = width
                .saturating_mul(10)
                .saturating_add((digit - b'0') as usize);
            i += 1;
        }

        let kind = match bytes.get(i).copied() {
            None => return Err(FormatError::UnterminatedSpec),
            Some(b'%') => {
                self.rest = &self.rest[i + 1..];
                return Ok(Segment::Percent);
            }
            Some(b'd') | Some(b'i') => SpecKind::Decimal,
            Some(b'u') => SpecKind::Unsigned,
            Some(b'x') => SpecKind::Hex,
            Some(b'X') => SpecKind::UpperHex,
            Some(b'c') => SpecKind::Char,
            Some(b's') => SpecKind::Str,
            Some(_) => {
                // Everything before `i` is ASCII, so `i` is a char boundary.
                let bad = self.rest[i..]
                    .chars()
                    .next()
                    .ok_or(FormatError::UnterminatedSpec)?;
                return Err(FormatError::BadSpec(bad));
            }
        };

        self.rest = &self.rest[i + 1..];
        Ok(Segment::Conversion(Spec {
            zero_pad,
            width,
            kind,
        }))
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Result<Segment<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }

        let item = if self.rest.starts_with('%') {
            self.conversion()
        } else {
            let literal = match self.rest.find('%') {
                Some(idx) => {
                    let (literal, rest) = self.rest.split_at(idx);
                    self.rest = rest;
                    literal
                }
                None => core::mem::take(&mut self.rest),
            };
            Ok(Segment::Literal(literal))
        };
        self.failed = item.is_err();
        Some(item)
    }
}

const DIGITS: &[u8; 16] = b"0123456789abcdef";
const DIGITS_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Render `fmt` with `args` into `out`.
///
/// Conversions consume arguments left to right; surplus arguments are
/// ignored.
pub fn format_into<W: fmt::Write>(
    out: &mut W,
    fmt: &str,
    args: &[Arg<'_>],
) -> Result<(), FormatError> {
    let mut args = args.iter();
    for segment in Segments::new(fmt) {
        match segment? {
            Segment::Literal(literal) => out.write_str(literal)?,
            Segment::Percent => out.write_char('%')?,
            Segment::Conversion(spec) => {
                let arg = args.next().ok_or(FormatError::MissingArg)?;
                render(out, spec, arg)?;
            }
        }
    }
    Ok(())
}

/// Render to the screen through the global writer.
pub fn printf(fmt: &str, args: &[Arg<'_>]) -> Result<(), FormatError> {
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        let mut writer = crate::vga_buffer::WRITER.lock();
        format_into(&mut *writer, fmt, args)
    })
}

fn render<W: fmt::Write>(out: &mut W, spec: Spec, arg: &Arg<'_>) -> Result<(), FormatError> {
    match (spec.kind, arg) {
        (SpecKind::Decimal, Arg::Int(value)) => {
            render_number(out, value.unsigned_abs(), 10, DIGITS, spec, *value < 0)
        }
        (SpecKind::Unsigned, Arg::Uint(value)) => {
            render_number(out, *value, 10, DIGITS, spec, false)
        }
        (SpecKind::Hex, Arg::Uint(value)) => render_number(out, *value, 16, DIGITS, spec, false),
        (SpecKind::UpperHex, Arg::Uint(value)) => {
            render_number(out, *value, 16, DIGITS_UPPER, spec, false)
        }
        (SpecKind::Char, Arg::Char(value)) => {
            pad(out, spec.width.saturating_sub(1))?;
            out.write_char(*value)?;
            Ok(())
        }
        (SpecKind::Str, Arg::Str(value)) => {
            pad(out, spec.width.saturating_sub(value.chars().count()))?;
            out.write_str(value)?;
            Ok(())
        }
        (kind, _) => Err(FormatError::TypeMismatch { expected: kind }),
    }
}

fn pad<W: fmt::Write>(out: &mut W, count: usize) -> Result<(), FormatError> {
    for _ in 0..count {
        out.write_char(' ')?;
    }
    Ok(())
}

fn render_number<W: fmt::Write>(
    out: &mut W,
    value: u64,
    base: u64,
    digits: &[u8; 16],
    spec: Spec,
    negative: bool,
) -> Result<(), FormatError> {
    // Digits are assembled back to front; u64::MAX in decimal needs 20.
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    let mut value = value;
    loop {
        pos -= 1;
        buf[pos] = digits[(value % base) as usize];
        value /= base;
        if value == 0 {
            break;
        }
    }

    let rendered = buf.len() - pos + usize::from(negative);
    let fill = spec.width.saturating_sub(rendered);
    if spec.zero_pad {
        // The sign goes in front of the zeros: -0042, not 00-42.
        if negative {
            out.write_char('-')?;
        }
        for _ in 0..fill {
            out.write_char('0')?;
        }
    } else {
        pad(out, fill)?;
        if negative {
            out.write_char('-')?;
        }
    }
    for &digit in &buf[pos..] {
        out.write_char(digit as char)?;
    }
    Ok(())
}

#[cfg(test)]
struct Sink {
    buf: [u8; 128],
    len: usize,
}

#[cfg(test)]
impl Sink {
    fn new() -> Sink {
        Sink {
            buf: [0; 128],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).expect("sink holds utf8")
    }
}

#[cfg(test)]
impl fmt::Write for Sink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[cfg(test)]
fn rendered(fmt: &str, args: &[Arg<'_>]) -> Result<Sink, FormatError> {
    let mut sink = Sink::new();
    format_into(&mut sink, fmt, args)?;
    Ok(sink)
}

#[test_case]
fn test_decimal_substitution() {
    let out = rendered("%d", &[Arg::Int(5)]).expect("render failed");
    assert_eq!(out.as_str(), "5");
}

#[test_case]
fn test_literal_runs_pass_through() {
    let out = rendered("hello, world\n", &[]).expect("render failed");
    assert_eq!(out.as_str(), "hello, world\n");
}

#[test_case]
fn test_empty_format() {
    let out = rendered("", &[]).expect("render failed");
    assert_eq!(out.as_str(), "");
}

#[test_case]
fn test_percent_escape() {
    let out = rendered("100%% done", &[]).expect("render failed");
    assert_eq!(out.as_str(), "100% done");
}

#[test_case]
fn test_mixed_conversions() {
    let out = rendered(
        "%s=%c 0x%x 0x%X %u",
        &[
            Arg::Str("key"),
            Arg::Char('v'),
            Arg::Uint(0xbeef),
            Arg::Uint(0xbeef),
            Arg::Uint(7),
        ],
    )
    .expect("render failed");
    assert_eq!(out.as_str(), "key=v 0xbeef 0xBEEF 7");
}

#[test_case]
fn test_width_and_zero_pad() {
    let out = rendered("%5d", &[Arg::Int(-42)]).expect("render failed");
    assert_eq!(out.as_str(), "  -42");
    let out = rendered("%05d", &[Arg::Int(-42)]).expect("render failed");
    assert_eq!(out.as_str(), "-0042");
    let out = rendered("%08x", &[Arg::Uint(0)]).expect("render failed");
    assert_eq!(out.as_str(), "00000000");
    let out = rendered("%5s", &[Arg::Str("ab")]).expect("render failed");
    assert_eq!(out.as_str(), "   ab");
}

#[test_case]
fn test_decimal_extremes() {
    let out = rendered("%d", &[Arg::Int(i64::MIN)]).expect("render failed");
    assert_eq!(out.as_str(), "-9223372036854775808");
    let out = rendered("%u", &[Arg::Uint(u64::MAX)]).expect("render failed");
    assert_eq!(out.as_str(), "18446744073709551615");
}

#[test_case]
fn test_surplus_arguments_ignored() {
    let out = rendered("%d", &[Arg::Int(1), Arg::Int(2)]).expect("render failed");
    assert_eq!(out.as_str(), "1");
}

#[test_case]
fn test_missing_argument() {
    assert_eq!(rendered("%d", &[]).err(), Some(FormatError::MissingArg));
}

#[test_case]
fn test_type_mismatch() {
    assert_eq!(
        rendered("%s", &[Arg::Int(3)]).err(),
        Some(FormatError::TypeMismatch {
            expected: SpecKind::Str
        })
    );
}

#[test_case]
fn test_unterminated_spec() {
    assert_eq!(rendered("%", &[]).err(), Some(FormatError::UnterminatedSpec));
    assert_eq!(
        rendered("total: %03", &[Arg::Int(9)]).err(),
        Some(FormatError::UnterminatedSpec)
    );
}

#[test_case]
fn test_unknown_conversion() {
    assert_eq!(rendered("%q", &[]).err(), Some(FormatError::BadSpec('q')));
}

#[test_case]
fn test_segments_borrow_literals() {
    let mut segments = Segments::new("a%db");
    assert_eq!(segments.next(), Some(Ok(Segment::Literal("a"))));
    assert_eq!(
        segments.next(),
        Some(Ok(Segment::Conversion(Spec {
            zero_pad: false,
            width: 0,
            kind: SpecKind::Decimal
        })))
    );
    assert_eq!(segments.next(), Some(Ok(Segment::Literal("b"))));
    assert_eq!(segments.next(), None);
}

#[test_case]
fn test_segments_fuse_after_error() {
    let mut segments = Segments::new("%q%d");
    assert_eq!(segments.next(), Some(Err(FormatError::BadSpec('q'))));
    assert_eq!(segments.next(), None);
}

#[test_case]
fn test_format_into_reaches_screen() {
    use crate::vga_buffer::{BUFFER_HEIGHT, WRITER};
    use x86_64::instructions::interrupts;

    interrupts::without_interrupts(|| {
        let mut writer = WRITER.lock();
        writer.write_string("\n");
        format_into(&mut *writer, "ok=%d\n", &[Arg::Int(1)]).expect("render failed");
        for (i, c) in "ok=1".chars().enumerate() {
            let cell = writer.read_cell(BUFFER_HEIGHT - 2, i).expect("cell in bounds");
            assert_eq!(char::from(cell.ascii_character), c);
        }
    });
}
