use crate::error::{Error, Result};
use crate::util::truncate_str;

/// Append-only staging area for escape sequences and text.
///
/// Storage is allocated on the first write and only grows until released.
pub(crate) struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> OutputBuffer {
        OutputBuffer{buf: Vec::new()}
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Appends at most `max_len` bytes of `s`.
    ///
    /// If the buffer cannot grow, or would grow beyond `limit`,
    /// its contents and storage are discarded.
    pub fn push(&mut self, s: &str, max_len: usize, limit: Option<usize>) -> Result<()> {
        let s = truncate_str(s, max_len);
        let requested = self.buf.len().saturating_add(s.len());

        let within_limit = limit.map_or(true, |limit| requested <= limit);

        if !within_limit || self.buf.try_reserve(s.len()).is_err() {
            self.release();
            return Err(Error::Allocation{requested});
        }

        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Removes the first `n` bytes, which have been written to the device.
    pub fn consume(&mut self, n: usize) {
        let _ = self.buf.drain(..n);
    }

    pub fn release(&mut self) {
        self.buf = Vec::new();
    }
}
