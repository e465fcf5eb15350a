//! ANSI escape sequences and key codes
//!
//! Fixed sequences are provided as string constants. Sequences taking
//! parameters are rendered by functions returning an owned [`Seq`] value,
//! which stores short sequences inline without allocating.
//!
//! Any of these may be passed to [`Terminal::stage`] or
//! [`Terminal::send_immediate`].
//!
//! [`Seq`]: type.Seq.html
//! [`Terminal::stage`]: ../terminal/struct.Terminal.html#method.stage
//! [`Terminal::send_immediate`]: ../terminal/struct.Terminal.html#method.send_immediate

use std::fmt::Write;

use smallstr::SmallString;

use crate::util::ctrl;

/// Inline capacity of a rendered sequence, in bytes
pub const SEQ_INLINE_LEN: usize = 32;

/// A rendered escape sequence
pub type Seq = SmallString<[u8; SEQ_INLINE_LEN]>;

/// Control Sequence Introducer
pub const CSI: &str = "\x1b[";

/// Resets all colors and styles
pub const RESET: &str = "\x1b[0m";
/// Clears the entire screen
pub const CLEAR: &str = "\x1b[2J";
/// Requests a cursor position report, `ESC [ row ; col R`
pub const CURSOR_REPORT: &str = "\x1b[6n";
/// Hides the cursor
pub const HIDE_CURSOR: &str = "\x1b[?25l";
/// Shows the cursor
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Ends bold and faint text
pub const RESET_BOLD: &str = "\x1b[22m";
/// Ends italic text
pub const RESET_ITALIC: &str = "\x1b[23m";
/// Ends underlined text
pub const RESET_UNDERLINE: &str = "\x1b[24m";
/// Ends blinking text
pub const RESET_BLINK: &str = "\x1b[25m";
/// Ends reversed text
pub const RESET_REVERSE: &str = "\x1b[27m";
/// Ends concealed text
pub const RESET_CONCEAL: &str = "\x1b[28m";
/// Ends crossed out text
pub const RESET_CROSSED_OUT: &str = "\x1b[29m";

/// Escape key
pub const KEY_ESC: u8 = 0x1b;
/// Backspace key, as delivered in raw mode
pub const KEY_BACKSPACE: u8 = 0x7f;
/// Tab key
pub const KEY_TAB: u8 = b'\t';
/// Enter key
pub const KEY_ENTER: u8 = b'\n';

/// Up arrow key sequence
pub const KEY_UP: &str = "\x1b[A";
/// Down arrow key sequence
pub const KEY_DOWN: &str = "\x1b[B";
/// Right arrow key sequence
pub const KEY_RIGHT: &str = "\x1b[C";
/// Left arrow key sequence
pub const KEY_LEFT: &str = "\x1b[D";
/// Insert key sequence
pub const KEY_INSERT: &str = "\x1b[2~";
/// Delete key sequence
pub const KEY_DELETE: &str = "\x1b[3~";
/// Home key sequence
pub const KEY_HOME: &str = "\x1b[H";
/// End key sequence
pub const KEY_END: &str = "\x1b[F";
/// Page Up key sequence
pub const KEY_PAGE_UP: &str = "\x1b[5~";
/// Page Down key sequence
pub const KEY_PAGE_DOWN: &str = "\x1b[6~";

/// Returns the byte read in raw mode when `key` is pressed with Ctrl.
///
/// Only meaningful for ASCII letters.
///
/// ```
/// # use termseq::sequence::ctrl_key;
/// assert_eq!(ctrl_key(b'c'), 0x03);
/// ```
#[inline]
pub fn ctrl_key(key: u8) -> u8 {
    ctrl(key as char) as u8
}

/// Returns the byte read in raw mode when `key` is pressed with Shift.
///
/// Only meaningful for ASCII letters.
#[inline]
pub fn shift_key(key: u8) -> u8 {
    key ^ 0x20
}

/// Represents one of the eight standard terminal colors
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Color {
    /// Black
    Black,
    /// Red
    Red,
    /// Green
    Green,
    /// Yellow
    Yellow,
    /// Blue
    Blue,
    /// Magenta
    Magenta,
    /// Cyan
    Cyan,
    /// White
    White,
}

impl Color {
    fn code(self) -> u8 {
        match self {
            Color::Black =>     0,
            Color::Red =>       1,
            Color::Green =>     2,
            Color::Yellow =>    3,
            Color::Blue =>      4,
            Color::Magenta =>   5,
            Color::Cyan =>      6,
            Color::White =>     7,
        }
    }
}

bitflags!{
    /// Represents a set of style attributes applied to text.
    ///
    /// Some styles may not be supported by all terminals.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Style: u16 {
        /// Bold
        const BOLD        = 1 << 0;
        /// Faint
        const FAINT       = 1 << 1;
        /// Italic
        const ITALIC      = 1 << 2;
        /// Underline
        const UNDERLINE   = 1 << 3;
        /// Slow blink
        const BLINK_SLOW  = 1 << 4;
        /// Fast blink
        const BLINK_FAST  = 1 << 5;
        /// Reverse; foreground and background color swapped
        const REVERSE     = 1 << 6;
        /// Concealed
        const CONCEAL     = 1 << 7;
        /// Crossed out
        const CROSSED_OUT = 1 << 8;
    }
}

macro_rules! render {
    ( $($arg:tt)* ) => { {
        let mut s = Seq::new();
        // Writing to a `SmallString` cannot fail
        let _ = write!(s, $($arg)*);
        s
    } }
}

/// Moves the cursor to the given 1-based row and column.
///
/// Terminals clamp out of range values to the last row or column.
pub fn move_to(row: u32, column: u32) -> Seq {
    render!("\x1b[{};{}H", row, column)
}

/// Moves the cursor up `n` rows.
pub fn move_up(n: u32) -> Seq {
    render!("\x1b[{}A", n)
}

/// Moves the cursor down `n` rows.
pub fn move_down(n: u32) -> Seq {
    render!("\x1b[{}B", n)
}

/// Moves the cursor right `n` columns.
pub fn move_forward(n: u32) -> Seq {
    render!("\x1b[{}C", n)
}

/// Moves the cursor left `n` columns.
pub fn move_backward(n: u32) -> Seq {
    render!("\x1b[{}D", n)
}

/// Moves the cursor to the start of the line `n` rows down.
pub fn next_line(n: u32) -> Seq {
    render!("\x1b[{}E", n)
}

/// Moves the cursor to the start of the line `n` rows up.
pub fn prev_line(n: u32) -> Seq {
    render!("\x1b[{}F", n)
}

/// Moves the cursor to the given 1-based column of the current row.
pub fn column(n: u32) -> Seq {
    render!("\x1b[{}G", n)
}

/// Scrolls the screen up `n` lines.
pub fn scroll_up(n: u32) -> Seq {
    render!("\x1b[{}S", n)
}

/// Scrolls the screen down `n` lines.
pub fn scroll_down(n: u32) -> Seq {
    render!("\x1b[{}T", n)
}

/// Erases part of the screen.
///
/// `0` erases to the end of the screen, `1` to the beginning,
/// `2` the entire screen and `3` the scrollback buffer.
pub fn erase_display(n: u32) -> Seq {
    render!("\x1b[{}J", n)
}

/// Erases part of the current line.
///
/// `0` erases to the end of the line, `1` to the beginning
/// and `2` the entire line.
pub fn erase_line(n: u32) -> Seq {
    render!("\x1b[{}K", n)
}

/// Sets the foreground color.
pub fn fg(color: Color) -> Seq {
    render!("\x1b[3{}m", color.code())
}

/// Sets the background color.
pub fn bg(color: Color) -> Seq {
    render!("\x1b[4{}m", color.code())
}

/// Sets the foreground to the bright variant of a color.
pub fn fg_bright(color: Color) -> Seq {
    render!("\x1b[9{}m", color.code())
}

/// Sets the background to the bright variant of a color.
pub fn bg_bright(color: Color) -> Seq {
    render!("\x1b[10{}m", color.code())
}

/// Sets the foreground to an entry of the 256 color palette.
pub fn fg_256(index: u8) -> Seq {
    render!("\x1b[38;5;{}m", index)
}

/// Sets the background to an entry of the 256 color palette.
pub fn bg_256(index: u8) -> Seq {
    render!("\x1b[48;5;{}m", index)
}

/// Sets a 24-bit foreground color.
pub fn fg_rgb(r: u8, g: u8, b: u8) -> Seq {
    render!("\x1b[38;2;{};{};{}m", r, g, b)
}

/// Sets a 24-bit background color.
pub fn bg_rgb(r: u8, g: u8, b: u8) -> Seq {
    render!("\x1b[48;2;{};{};{}m", r, g, b)
}

/// Enables each style in the set with a single sequence.
///
/// An empty set renders [`RESET`](constant.RESET.html).
pub fn style(style: Style) -> Seq {
    if style.is_empty() {
        return RESET.into();
    }

    let mut s = Seq::from(CSI);

    // Bit `n` corresponds to SGR parameter `n + 1`
    for (i, code) in (0..9).filter(|i| style.bits() & (1 << i) != 0).enumerate() {
        if i != 0 {
            s.push(';');
        }
        let _ = write!(s, "{}", code + 1);
    }

    s.push('m');
    s
}

/// Parses a cursor position report, `ESC [ row ; col R`.
///
/// Returns the 1-based `(row, column)` pair. Trailing data is ignored.
/// Returns `None` if the data is malformed, incomplete, contains a zero
/// or overflowing value.
///
/// ```
/// # use termseq::sequence::parse_cursor_report;
/// assert_eq!(parse_cursor_report(b"\x1b[24;80R"), Some((24, 80)));
/// assert_eq!(parse_cursor_report(b"\x1b[x;yQ"), None);
/// ```
pub fn parse_cursor_report(buf: &[u8]) -> Option<(u32, u32)> {
    let mut buf = buf.strip_prefix(CSI.as_bytes())?;

    let (row, end) = parse_integer(&mut buf)?;

    if end != b';' {
        return None;
    }

    let (column, end) = parse_integer(&mut buf)?;

    if end != b'R' || row == 0 || column == 0 {
        return None;
    }

    Some((row, column))
}

fn parse_integer(buf: &mut &[u8]) -> Option<(u32, u8)> {
    let mut n = 0u32;
    let mut digits = 0;
    let mut iter = buf.iter();

    while let Some(&b) = iter.next() {
        match b {
            b'0' ..= b'9' => {
                n = n.checked_mul(10)?
                    .checked_add((b - b'0') as u32)?;
                digits += 1;
            }
            _ if digits == 0 => return None,
            _ => {
                *buf = iter.as_slice();
                return Some((n, b));
            }
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cursor_movement() {
        assert_eq!(move_to(999, 999).as_str(), "\x1b[999;999H");
        assert_eq!(move_up(3).as_str(), "\x1b[3A");
        assert_eq!(move_backward(12).as_str(), "\x1b[12D");
        assert_eq!(column(1).as_str(), "\x1b[1G");
        assert_eq!(erase_line(2).as_str(), "\x1b[2K");
    }

    #[test]
    fn test_colors() {
        assert_eq!(fg(Color::Red).as_str(), "\x1b[31m");
        assert_eq!(bg(Color::White).as_str(), "\x1b[47m");
        assert_eq!(fg_bright(Color::Cyan).as_str(), "\x1b[96m");
        assert_eq!(bg_bright(Color::Black).as_str(), "\x1b[100m");
        assert_eq!(fg_256(208).as_str(), "\x1b[38;5;208m");
        assert_eq!(bg_rgb(255, 128, 0).as_str(), "\x1b[48;2;255;128;0m");
    }

    #[test]
    fn test_rendered_values_are_independent() {
        let a = move_to(1, 2);
        let b = move_to(3, 4);
        let c: Vec<Seq> = (0..20).map(move_down).collect();

        assert_eq!(a.as_str(), "\x1b[1;2H");
        assert_eq!(b.as_str(), "\x1b[3;4H");
        assert_eq!(c[0].as_str(), "\x1b[0B");
        assert_eq!(c[19].as_str(), "\x1b[19B");
        assert!(!a.spilled());
    }

    #[test]
    fn test_style() {
        assert_eq!(style(Style::empty()).as_str(), RESET);
        assert_eq!(style(Style::BOLD).as_str(), "\x1b[1m");
        assert_eq!(style(Style::BOLD | Style::ITALIC | Style::CROSSED_OUT).as_str(),
            "\x1b[1;3;9m");
        assert_eq!(style(Style::all()).as_str(), "\x1b[1;2;3;4;5;6;7;8;9m");
    }

    #[test]
    fn test_keys() {
        assert_eq!(ctrl_key(b'a'), 0x01);
        assert_eq!(ctrl_key(b'z'), 0x1a);
        assert_eq!(shift_key(b'q'), b'Q');
    }

    #[test]
    fn test_parse_cursor_report() {
        assert_eq!(parse_cursor_report(b"\x1b[24;80R"), Some((24, 80)));
        assert_eq!(parse_cursor_report(b"\x1b[1;1Rxyz"), Some((1, 1)));

        assert_eq!(parse_cursor_report(b"\x1b[x;yQ"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24;80"), None);
        assert_eq!(parse_cursor_report(b"\x1b[24R"), None);
        assert_eq!(parse_cursor_report(b"\x1b[;80R"), None);
        assert_eq!(parse_cursor_report(b"\x1b[0;80R"), None);
        assert_eq!(parse_cursor_report(b"24;80R"), None);
        assert_eq!(parse_cursor_report(b"\x1b[99999999999;1R"), None);
        assert_eq!(parse_cursor_report(b""), None);
    }
}
