use crate::error::{Error, Result};
use crate::terminal::Device;
use crate::util::utf8_prefix;

/// Holds the most recently read line of input.
pub(crate) struct LineReader {
    line: Vec<u8>,
    // The previous read stopped before the end of a line
    stale: bool,
}

impl LineReader {
    pub fn new() -> LineReader {
        LineReader{
            line: Vec::new(),
            stale: false,
        }
    }

    pub fn read_line<D: Device>(&mut self, device: &mut D,
            max_len: usize, max_discard: usize) -> Result<&str> {
        if max_len == 0 {
            return Err(Error::InvalidArgument("maximum line length must be positive"));
        }

        if self.stale {
            discard_line(device, max_discard)?;
            self.stale = false;
        }

        self.line.clear();

        let requested = max_len.saturating_add(1);

        if self.line.try_reserve_exact(requested).is_err() {
            self.release();
            return Err(Error::Allocation{requested});
        }

        let mut complete = false;

        while self.line.len() < max_len {
            match device.read_byte()? {
                Some(b) => {
                    self.line.push(b);

                    if b == b'\n' {
                        complete = true;
                        break;
                    }
                }
                None => {
                    complete = true;
                    break;
                }
            }
        }

        self.stale = !complete;

        Ok(utf8_prefix(&self.line)?)
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.line.capacity()
    }

    pub fn release(&mut self) {
        self.line = Vec::new();
    }
}

fn discard_line<D: Device>(device: &mut D, max_bytes: usize) -> Result<()> {
    for _ in 0..max_bytes {
        match device.read_byte()? {
            Some(b'\n') | None => break,
            Some(_) => ()
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::mock::MockDevice;
    use super::LineReader;

    #[test]
    fn test_read_line() {
        let mut dev = MockDevice::with_input(b"hello\nworld\n");
        let mut r = LineReader::new();

        assert_eq!(r.read_line(&mut dev, 20, 1024).unwrap(), "hello\n");
        assert_eq!(r.read_line(&mut dev, 20, 1024).unwrap(), "world\n");
        assert_eq!(r.read_line(&mut dev, 20, 1024).unwrap(), "");
    }

    #[test]
    fn test_read_line_bound() {
        let mut dev = MockDevice::with_input(b"abcdefgh\nxyz\n");
        let mut r = LineReader::new();

        assert_eq!(r.read_line(&mut dev, 3, 1024).unwrap(), "abc");
        // Remainder of the first line is discarded
        assert_eq!(r.read_line(&mut dev, 3, 1024).unwrap(), "xyz");
        // The terminator of a line filling `max_len` is discarded with the remainder
        assert_eq!(r.read_line(&mut dev, 3, 1024).unwrap(), "");
    }

    #[test]
    fn test_exact_length_discards_terminator() {
        let mut dev = MockDevice::with_input(b"hello\nabc\n");
        let mut r = LineReader::new();

        assert_eq!(r.read_line(&mut dev, 5, 1024).unwrap(), "hello");
        assert_eq!(r.read_line(&mut dev, 5, 1024).unwrap(), "abc\n");
    }

    #[test]
    fn test_discard_bounded() {
        let mut dev = MockDevice::with_input(b"0123456789abc\nnext\n");
        let mut r = LineReader::new();

        assert_eq!(r.read_line(&mut dev, 2, 4).unwrap(), "01");
        // Only four stale bytes may be discarded
        assert_eq!(r.read_line(&mut dev, 2, 4).unwrap(), "67");
    }

    #[test]
    fn test_zero_length() {
        let mut dev = MockDevice::with_input(b"abc\n");
        let mut r = LineReader::new();

        assert!(r.read_line(&mut dev, 0, 1024).is_err());
    }

    #[test]
    fn test_allocation_failure() {
        let mut dev = MockDevice::with_input(b"hello\n");
        let mut r = LineReader::new();

        match r.read_line(&mut dev, usize::max_value(), 1024) {
            Err(Error::Allocation{requested}) => assert_eq!(requested, usize::max_value()),
            res => panic!("unexpected result: {:?}", res)
        }
        assert_eq!(r.capacity(), 0);
        assert_eq!(dev.reads, 0);

        assert_eq!(r.read_line(&mut dev, 20, 1024).unwrap(), "hello\n");
    }

    #[test]
    fn test_split_character() {
        // "é" is encoded as two bytes
        let mut dev = MockDevice::with_input("aé\n".as_bytes());
        let mut r = LineReader::new();

        assert_eq!(r.read_line(&mut dev, 2, 1024).unwrap(), "a");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut dev = MockDevice::with_input(b"a\xffb\n");
        let mut r = LineReader::new();

        assert!(r.read_line(&mut dev, 10, 1024).is_err());
    }

    #[test]
    fn test_buffer_reused() {
        let mut dev = MockDevice::with_input(b"one\ntwo\n");
        let mut r = LineReader::new();

        r.read_line(&mut dev, 64, 1024).unwrap();
        let cap = r.capacity();
        assert!(cap >= 65);

        r.read_line(&mut dev, 8, 1024).unwrap();
        assert_eq!(r.capacity(), cap);

        r.release();
        assert_eq!(r.capacity(), 0);
    }
}
