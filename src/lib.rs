//! Buffered terminal output and raw keyboard input
//!
//! The [`Terminal`] type collects ANSI escape sequences and text in an
//! in-memory buffer and writes them to the terminal in a single call to
//! [`flush`]. It can also switch the terminal into raw mode, in which input
//! is read one byte at a time without echo, and ask the terminal for its
//! size using a cursor position report.
//!
//! Escape sequences and key codes are provided by the [`sequence`] module.
//!
//! ```no_run
//! # fn example() -> termseq::Result<()> {
//! use termseq::{Color, Terminal};
//! use termseq::sequence::{self, KEY_ESC};
//!
//! let mut term = Terminal::new()?;
//! let mut raw = term.raw_guard()?;
//!
//! raw.stage_all(&[sequence::CLEAR, sequence::move_to(1, 1).as_str()])?;
//! raw.stage(&sequence::fg(Color::Green))?;
//! raw.stage("press escape to quit")?;
//! raw.stage(sequence::RESET)?;
//! raw.flush()?;
//!
//! loop {
//!     if let Some(KEY_ESC) = raw.poll_key()? {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform support
//!
//! On Unix, terminal settings are changed with termios. On Windows, the
//! console mode is changed and virtual terminal processing is enabled for
//! output, so the same escape sequences apply.
//!
//! Raw mode is restored when the `Terminal` is dropped. Abnormal termination,
//! e.g. by a signal, does not run destructors; applications that must restore
//! the terminal in that case should install their own handler.
//!
//! [`Terminal`]: terminal/struct.Terminal.html
//! [`flush`]: terminal/struct.Terminal.html#method.flush
//! [`sequence`]: sequence/index.html

#![deny(missing_docs)]

#[macro_use] extern crate bitflags;

pub use crate::error::{Error, ModeOp, Result};
pub use crate::sequence::{Color, Seq, Style};
pub use crate::sys::SystemDevice;
pub use crate::terminal::{Config, Device, RawModeGuard, Size, Terminal};

pub mod error;
mod input;
mod output;
#[cfg(unix)]
mod priv_util;
pub mod sequence;
pub mod terminal;
pub mod util;

#[cfg(test)]
mod mock;

#[cfg(unix)]
#[path = "unix/mod.rs"]
mod sys;

#[cfg(windows)]
#[path = "windows/mod.rs"]
mod sys;

#[cfg(unix)]
pub use crate::sys::ext as unix;

#[cfg(test)]
mod test {
    use crate::sys::SystemDevice;
    use crate::terminal::Terminal;

    fn assert_has_traits<T: 'static + Send>() {}

    #[test]
    fn test_traits() {
        assert_has_traits::<SystemDevice>();
        assert_has_traits::<Terminal>();
    }
}
