//! Provides an interface to terminal devices

use std::io;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::{debug, trace, warn};

use crate::error::{Error, ModeOp, Result};
use crate::input::LineReader;
use crate::output::OutputBuffer;
use crate::sequence::{self, parse_cursor_report};
use crate::sys::SystemDevice;

/// Default value of [`Config::max_fragment_len`](struct.Config.html#structfield.max_fragment_len)
pub const DEFAULT_MAX_FRAGMENT_LEN: usize = 1024;
/// Default value of [`Config::max_line_iterations`](struct.Config.html#structfield.max_line_iterations)
pub const DEFAULT_MAX_LINE_ITERATIONS: usize = 1024;
/// Default value of [`Config::poll_timeout`](struct.Config.html#structfield.poll_timeout)
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
/// Default value of [`Config::reply_timeout`](struct.Config.html#structfield.reply_timeout)
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(100);

const REPLY_BUFFER_SIZE: usize = 32;

/// Configures the limits and timeouts of a [`Terminal`].
///
/// This struct implements the [`Default`] trait, providing default
/// values for all options.
///
/// To override only some options while using the remaining default values,
/// one may use the following construct:
///
/// ```no_run
/// # fn example() -> termseq::Result<()> {
/// use std::time::Duration;
/// use termseq::{Config, Terminal};
///
/// let term = Terminal::with_config(Config{
///     poll_timeout: Duration::from_millis(20),
///     .. Config::default()
/// })?;
/// # Ok(())
/// # }
/// ```
///
/// [`Default`]: https://doc.rust-lang.org/std/default/trait.Default.html
/// [`Terminal`]: struct.Terminal.html
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Maximum number of bytes appended by a single `stage` call.
    ///
    /// Longer fragments are truncated.
    ///
    /// The default is `1024`.
    pub max_fragment_len: usize,
    /// Maximum number of bytes discarded from an unfinished line
    /// before `read_line` begins reading a new line.
    ///
    /// The default is `1024`.
    pub max_line_iterations: usize,
    /// Time `poll_key` waits for input.
    ///
    /// The default is 100 milliseconds.
    pub poll_timeout: Duration,
    /// Time `query_size` waits for the terminal to report its cursor position.
    ///
    /// The default is 100 milliseconds.
    pub reply_timeout: Duration,
    /// Maximum total size of staged output, in bytes.
    ///
    /// Staging beyond this limit fails in the same manner as a failed
    /// allocation. The default is `None`, imposing no limit.
    pub buffer_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Config {
        Config{
            max_fragment_len: DEFAULT_MAX_FRAGMENT_LEN,
            max_line_iterations: DEFAULT_MAX_LINE_ITERATIONS,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            buffer_limit: None,
        }
    }
}

/// Represents the size of a terminal window
///
/// A valid size must not have zero lines or zero columns.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Size {
    /// Number of lines in the terminal
    pub lines: usize,
    /// Number of columns in the terminal
    pub columns: usize,
}

/// Low-level access to a terminal device
///
/// [`SystemDevice`] implements this trait using termios on Unix and the
/// console API on Windows. Other implementations may be supplied to
/// [`Terminal::with_device`], e.g. to test code without a real terminal.
///
/// [`SystemDevice`]: struct.SystemDevice.html
/// [`Terminal::with_device`]: struct.Terminal.html#method.with_device
pub trait Device {
    /// Snapshot of terminal settings
    type Mode: Copy;

    /// Reads the current terminal settings.
    fn current_mode(&self) -> io::Result<Self::Mode>;

    /// Returns settings derived from `original` which disable line buffering
    /// and echo, allowing single bytes to be read as they are typed.
    fn raw_mode(&self, original: &Self::Mode) -> Self::Mode;

    /// Applies the given terminal settings.
    fn set_mode(&mut self, mode: &Self::Mode) -> io::Result<()>;

    /// Waits up to `timeout` for a single byte of input.
    ///
    /// Returns `Ok(None)` if no input arrives or the input stream has ended.
    fn poll_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;

    /// Reads a single byte of input, blocking until one is available.
    ///
    /// Returns `Ok(None)` at the end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Waits up to `timeout` for input and performs a single read into `buf`.
    ///
    /// Returns the number of bytes read, which is `0` if the timeout elapsed.
    fn read_reply(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Writes data to the terminal without buffering,
    /// returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Returns the window size reported by the operating system.
    fn window_size(&self) -> io::Result<Size>;
}

/// Stages output for a terminal device and reads its input
///
/// A `Terminal` owns the output buffer, the input line buffer and the saved
/// terminal settings. It is intended to be used from one thread.
///
/// Sequences passed to [`stage`] accumulate in memory until [`flush`] sends
/// them to the device in a single write. [`send_immediate`] bypasses the
/// buffer.
///
/// If the terminal is in raw mode when the `Terminal` is dropped,
/// the original settings are restored.
///
/// [`stage`]: #method.stage
/// [`flush`]: #method.flush
/// [`send_immediate`]: #method.send_immediate
pub struct Terminal<D: Device = SystemDevice> {
    device: D,
    config: Config,
    output: OutputBuffer,
    input: LineReader,
    saved_mode: Option<D::Mode>,
}

impl Terminal {
    /// Opens a new interface to the terminal on `stdin` and `stdout`.
    pub fn new() -> Result<Terminal> {
        Terminal::with_config(Config::default())
    }

    /// Opens a new interface to the terminal on `stdin` and `stdout`
    /// using the given configuration.
    pub fn with_config(config: Config) -> Result<Terminal> {
        Ok(Terminal::with_device(SystemDevice::stdout()?, config))
    }

    /// Opens a new interface to the terminal on `stdin` and `stderr`.
    pub fn stderr() -> Result<Terminal> {
        Ok(Terminal::with_device(SystemDevice::stderr()?, Config::default()))
    }
}

impl<D: Device> Terminal<D> {
    /// Creates a `Terminal` operating on the given device.
    ///
    /// No buffers are allocated until first used.
    pub fn with_device(device: D, config: Config) -> Terminal<D> {
        Terminal{
            device,
            config,
            output: OutputBuffer::new(),
            input: LineReader::new(),
            saved_mode: None,
        }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the current configuration.
    ///
    /// Limits apply to subsequent operations; staged output is unaffected.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Returns a reference to the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Returns whether raw mode is active.
    pub fn is_raw(&self) -> bool {
        self.saved_mode.is_some()
    }
}

/// # Output
impl<D: Device> Terminal<D> {
    /// Appends a sequence to the output buffer.
    ///
    /// At most [`Config::max_fragment_len`] bytes of `seq` are appended.
    /// Nothing is written to the terminal until [`flush`] is called.
    ///
    /// If the buffer cannot grow, `Error::Allocation` is returned and all
    /// staged output is discarded.
    ///
    /// [`Config::max_fragment_len`]: struct.Config.html#structfield.max_fragment_len
    /// [`flush`]: #method.flush
    pub fn stage(&mut self, seq: &str) -> Result<()> {
        self.output.push(seq,
            self.config.max_fragment_len, self.config.buffer_limit)
    }

    /// Appends each sequence to the output buffer, in order.
    ///
    /// Stops at the first failure.
    pub fn stage_all<I, S>(&mut self, seqs: I) -> Result<()>
            where I: IntoIterator<Item=S>, S: AsRef<str> {
        for seq in seqs {
            self.stage(seq.as_ref())?;
        }
        Ok(())
    }

    /// Writes all staged output to the terminal.
    ///
    /// Output that was written is removed from the buffer, even if an error
    /// occurs partway. The buffer retains its capacity.
    pub fn flush(&mut self) -> Result<()> {
        if self.output.len() == 0 {
            return Ok(());
        }

        let (n, res) = write_data(&mut self.device, self.output.as_bytes());
        self.output.consume(n);

        trace!("flushed {} bytes to terminal", n);

        Ok(res?)
    }

    /// Writes a sequence to the terminal, bypassing the output buffer.
    ///
    /// Staged output is not flushed.
    pub fn send_immediate(&mut self, seq: &str) -> Result<()> {
        let (_, res) = write_data(&mut self.device, seq.as_bytes());
        Ok(res?)
    }

    /// Writes each sequence to the terminal, in order,
    /// bypassing the output buffer.
    ///
    /// Stops at the first failure.
    pub fn send_all_immediate<I, S>(&mut self, seqs: I) -> Result<()>
            where I: IntoIterator<Item=S>, S: AsRef<str> {
        for seq in seqs {
            self.send_immediate(seq.as_ref())?;
        }
        Ok(())
    }

    /// Returns the contents of the output buffer.
    pub fn staged(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Returns the number of bytes in the output buffer.
    pub fn staged_len(&self) -> usize {
        self.output.len()
    }

    /// Frees the output and input buffers, discarding staged output.
    ///
    /// Buffers are allocated again when next used.
    pub fn release_buffers(&mut self) {
        self.output.release();
        self.input.release();
    }
}

/// # Input
impl<D: Device> Terminal<D> {
    /// Reads a line of input, blocking until it is complete.
    ///
    /// At most `max_len` bytes are read, not counting the terminating `'\n'`,
    /// which is included in the result if it was read. If the line is longer,
    /// its remainder is discarded before the next line is read.
    /// At the end of input, the returned line may be empty.
    ///
    /// The result refers to an internal buffer, which is reused by
    /// subsequent calls.
    pub fn read_line(&mut self, max_len: usize) -> Result<&str> {
        self.input.read_line(&mut self.device,
            max_len, self.config.max_line_iterations)
    }

    /// Reads a single byte of input, waiting at most
    /// [`Config::poll_timeout`].
    ///
    /// Returns `Ok(None)` if no input arrives in time. Outside of raw mode,
    /// returns `Ok(None)` immediately without reading.
    ///
    /// Multi-byte key sequences, e.g. for arrow keys, are returned one byte
    /// at a time.
    ///
    /// [`Config::poll_timeout`]: struct.Config.html#structfield.poll_timeout
    pub fn poll_key(&mut self) -> Result<Option<u8>> {
        let timeout = self.config.poll_timeout;
        self.poll_key_timeout(timeout)
    }

    /// Reads a single byte of input, waiting at most `timeout`.
    ///
    /// Behaves as [`poll_key`](#method.poll_key) otherwise.
    pub fn poll_key_timeout(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if !self.is_raw() {
            return Ok(None);
        }

        Ok(self.device.poll_byte(timeout)?)
    }
}

/// # Raw mode
impl<D: Device> Terminal<D> {
    /// Saves the current terminal settings and enters raw mode.
    ///
    /// In raw mode, input is not echoed and becomes available
    /// byte-by-byte, without waiting for a newline.
    ///
    /// Calling this method while raw mode is active has no effect.
    ///
    /// If the settings cannot be read or changed, `Error::Mode` is returned
    /// and the terminal is left in its previous mode.
    pub fn enter_raw(&mut self) -> Result<()> {
        if self.is_raw() {
            debug!("raw mode is already active");
            return Ok(());
        }

        let original = self.device.current_mode()
            .map_err(|e| Error::mode(ModeOp::Capture, e))?;
        let raw = self.device.raw_mode(&original);

        if let Err(e) = self.device.set_mode(&raw) {
            // Settings may have been partially applied
            let _ = self.device.set_mode(&original);
            return Err(Error::mode(ModeOp::Apply, e));
        }

        self.saved_mode = Some(original);
        debug!("entered raw mode");

        Ok(())
    }

    /// Restores the settings saved by [`enter_raw`](#method.enter_raw).
    ///
    /// Calling this method while raw mode is not active has no effect.
    ///
    /// If the settings cannot be restored, `Error::Mode` is returned and
    /// raw mode remains active, so that the operation may be retried.
    pub fn exit_raw(&mut self) -> Result<()> {
        let saved = match self.saved_mode {
            Some(mode) => mode,
            None => return Ok(())
        };

        self.device.set_mode(&saved)
            .map_err(|e| Error::mode(ModeOp::Restore, e))?;

        self.saved_mode = None;
        debug!("exited raw mode");

        Ok(())
    }

    /// Enters raw mode, returning a guard which exits raw mode when dropped.
    ///
    /// If raw mode was already active, the guard leaves it active.
    ///
    /// ```no_run
    /// # fn example() -> termseq::Result<()> {
    /// use termseq::Terminal;
    ///
    /// let mut term = Terminal::new()?;
    /// let mut raw = term.raw_guard()?;
    ///
    /// if let Some(key) = raw.poll_key()? {
    ///     println!("read {:#04x}", key);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn raw_guard(&mut self) -> Result<RawModeGuard<D>> {
        let entered = !self.is_raw();
        self.enter_raw()?;

        Ok(RawModeGuard{term: self, entered})
    }
}

/// # Geometry
impl<D: Device> Terminal<D> {
    /// Determines the terminal size by asking the terminal where the cursor
    /// lands when moved beyond the last line and column.
    ///
    /// The cursor is left at the bottom right corner.
    ///
    /// Returns `Ok(None)` if raw mode is not active, or if the terminal does
    /// not reply with a well-formed cursor position report within
    /// [`Config::reply_timeout`].
    ///
    /// [`Config::reply_timeout`]: struct.Config.html#structfield.reply_timeout
    pub fn query_size(&mut self) -> Result<Option<Size>> {
        if !self.is_raw() {
            return Ok(None);
        }

        let far = sequence::move_to(999, 999);
        self.send_all_immediate(&[far.as_str(), sequence::CURSOR_REPORT])?;

        let mut buf = [0; REPLY_BUFFER_SIZE];
        let n = self.device.read_reply(&mut buf, self.config.reply_timeout)?;

        match parse_cursor_report(&buf[..n]) {
            Some((row, column)) => Ok(Some(Size{
                lines: row as usize,
                columns: column as usize,
            })),
            None => {
                debug!("unrecognized cursor position report: {:?}",
                    String::from_utf8_lossy(&buf[..n]));
                Ok(None)
            }
        }
    }

    /// Returns the window size reported by the operating system.
    ///
    /// Unlike [`query_size`](#method.query_size),
    /// this does not require raw mode.
    pub fn window_size(&self) -> Result<Size> {
        Ok(self.device.window_size()?)
    }
}

impl<D: Device> Drop for Terminal<D> {
    fn drop(&mut self) {
        if let Err(e) = self.exit_raw() {
            warn!("failed to restore terminal: {}", e);
        }
    }
}

/// Keeps a [`Terminal`] in raw mode until dropped
///
/// Created by [`Terminal::raw_guard`]. Dereferences to the `Terminal`.
///
/// [`Terminal`]: struct.Terminal.html
/// [`Terminal::raw_guard`]: struct.Terminal.html#method.raw_guard
pub struct RawModeGuard<'a, D: Device = SystemDevice> {
    term: &'a mut Terminal<D>,
    entered: bool,
}

impl<'a, D: Device> RawModeGuard<'a, D> {
    /// Exits raw mode, reporting any error.
    ///
    /// If the guard did not enter raw mode, it remains active.
    pub fn exit(mut self) -> Result<()> {
        if self.entered {
            // Not retried on drop
            self.entered = false;
            self.term.exit_raw()?;
        }
        Ok(())
    }
}

impl<'a, D: Device> Deref for RawModeGuard<'a, D> {
    type Target = Terminal<D>;

    fn deref(&self) -> &Terminal<D> {
        self.term
    }
}

impl<'a, D: Device> DerefMut for RawModeGuard<'a, D> {
    fn deref_mut(&mut self) -> &mut Terminal<D> {
        self.term
    }
}

impl<'a, D: Device> Drop for RawModeGuard<'a, D> {
    fn drop(&mut self) {
        if self.entered {
            if let Err(e) = self.term.exit_raw() {
                warn!("failed to restore terminal: {}", e);
            }
        }
    }
}

fn write_data<D: Device>(device: &mut D, buf: &[u8]) -> (usize, io::Result<()>) {
    let mut offset = 0;

    let r = loop {
        if offset == buf.len() {
            break Ok(());
        }

        match device.write(&buf[offset..]) {
            Ok(0) => break Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(n) => offset += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(e)
        }
    };

    (offset, r)
}
