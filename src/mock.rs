//! In-memory device used to test terminal operations

use std::cell::Cell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use crate::terminal::{Device, Size};

bitflags!{
    /// Terminal settings tracked by `MockDevice`
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct ModeFlags: u8 {
        /// Input is echoed
        const ECHO        = 1 << 0;
        /// Input is line buffered
        const CANONICAL   = 1 << 1;
        /// Control characters generate signals
        const SIGNALS     = 1 << 2;
        /// Reads return after a single byte
        const SINGLE_BYTE = 1 << 3;
    }
}

pub struct MockDevice {
    mode: Rc<Cell<ModeFlags>>,
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
    /// Number of read attempts
    pub reads: usize,
    /// Number of write calls
    pub writes: usize,
    /// Number of successful `set_mode` calls
    pub mode_sets: usize,
    /// Number of `set_mode` calls, including failures
    pub mode_attempts: usize,
    /// Maximum bytes accepted by a single write
    pub write_chunk: Option<usize>,
    /// Total bytes accepted before writes fail
    pub write_budget: Option<usize>,
    pub fail_capture: bool,
    pub fail_apply: bool,
    pub fail_restore: bool,
}

impl MockDevice {
    pub fn new() -> MockDevice {
        MockDevice::with_input(b"")
    }

    pub fn with_input(input: &[u8]) -> MockDevice {
        MockDevice{
            mode: Rc::new(Cell::new(
                ModeFlags::ECHO | ModeFlags::CANONICAL | ModeFlags::SIGNALS)),
            input: input.iter().copied().collect(),
            output: Vec::new(),
            reads: 0,
            writes: 0,
            mode_sets: 0,
            mode_attempts: 0,
            write_chunk: None,
            write_budget: None,
            fail_capture: false,
            fail_apply: false,
            fail_restore: false,
        }
    }

    pub fn mode(&self) -> ModeFlags {
        self.mode.get()
    }

    pub fn set_mode_flags(&self, mode: ModeFlags) {
        self.mode.set(mode);
    }

    /// Returns a handle observing the mode after the device is dropped.
    pub fn shared_mode(&self) -> Rc<Cell<ModeFlags>> {
        self.mode.clone()
    }
}

fn refused() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "refused by mock device")
}

impl Device for MockDevice {
    type Mode = ModeFlags;

    fn current_mode(&self) -> io::Result<ModeFlags> {
        if self.fail_capture {
            return Err(refused());
        }
        Ok(self.mode.get())
    }

    fn raw_mode(&self, original: &ModeFlags) -> ModeFlags {
        (*original - (ModeFlags::ECHO | ModeFlags::CANONICAL)) | ModeFlags::SINGLE_BYTE
    }

    fn set_mode(&mut self, mode: &ModeFlags) -> io::Result<()> {
        let is_raw = mode.contains(ModeFlags::SINGLE_BYTE);
        self.mode_attempts += 1;

        if (is_raw && self.fail_apply) || (!is_raw && self.fail_restore) {
            return Err(refused());
        }

        self.mode.set(*mode);
        self.mode_sets += 1;
        Ok(())
    }

    fn poll_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
        self.reads += 1;
        Ok(self.input.pop_front())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.reads += 1;
        Ok(self.input.pop_front())
    }

    fn read_reply(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        self.reads += 1;

        let n = buf.len().min(self.input.len());

        for (dst, src) in buf.iter_mut().zip(self.input.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;

        let mut n = buf.len();

        if let Some(chunk) = self.write_chunk {
            n = n.min(chunk);
        }

        if let Some(budget) = self.write_budget.as_mut() {
            if *budget == 0 {
                return Err(refused());
            }
            n = n.min(*budget);
            *budget -= n;
        }

        self.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn window_size(&self) -> io::Result<Size> {
        Ok(Size{lines: 25, columns: 80})
    }
}
