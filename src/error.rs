//! Error types

use std::fmt;
use std::io;

/// Terminal configuration step that failed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModeOp {
    /// Reading the current terminal settings
    Capture,
    /// Applying raw mode settings
    Apply,
    /// Restoring the previously captured settings
    Restore,
}

impl fmt::Display for ModeOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ModeOp::Capture => "capture",
            ModeOp::Apply => "apply",
            ModeOp::Restore => "restore",
        })
    }
}

/// Represents an error from a terminal operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A buffer could not grow to the requested size.
    ///
    /// The buffer has been reset to an empty state.
    #[error("failed to allocate {requested} bytes for terminal buffer")]
    Allocation {
        /// Total number of bytes the buffer attempted to hold
        requested: usize,
    },
    /// The operating system refused to read or change terminal settings.
    #[error("failed to {op} terminal mode: {source}")]
    Mode {
        /// The step that failed
        op: ModeOp,
        /// Underlying operating system error
        #[source]
        source: io::Error,
    },
    /// An argument was outside its valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Error reading from or writing to the terminal device
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn mode(op: ModeOp, source: io::Error) -> Error {
        Error::Mode{op, source}
    }

    /// Returns whether this error resulted from a failed allocation.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Error::Allocation{..})
    }
}

/// Result of a terminal operation
pub type Result<T> = std::result::Result<T, Error>;
