//! Unix extension trait

use std::io;
use std::path::Path;

use crate::priv_util::Private;
use crate::sys::SystemDevice;
use crate::terminal::{Config, Terminal};

/// Implements opening a terminal device by path on Unix systems.
pub trait OpenTerminalExt: Private + Sized {
    /// Opens a terminal interface on the device at the given path.
    ///
    /// The device is used for both input and output,
    /// and is closed when the returned value is dropped.
    fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self>;
}

impl OpenTerminalExt for SystemDevice {
    fn from_path<P: AsRef<Path>>(path: P) -> io::Result<SystemDevice> {
        SystemDevice::open(path)
    }
}

impl OpenTerminalExt for Terminal {
    fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Terminal> {
        let dev = SystemDevice::open(path)?;
        Ok(Terminal::with_device(dev, Config::default()))
    }
}

#[cfg(test)]
mod test {
    use crate::terminal::Terminal;
    use super::OpenTerminalExt;

    #[test]
    fn test_missing_path() {
        assert!(Terminal::from_path("/nonexistent/termseq-tty").is_err());
    }

    #[test]
    fn test_open_non_terminal() {
        let mut term = Terminal::from_path("/dev/null").unwrap();

        term.stage("discarded").unwrap();
        term.flush().unwrap();

        // `/dev/null` has no terminal settings
        assert!(term.enter_raw().is_err());
        assert!(!term.is_raw());
    }
}
