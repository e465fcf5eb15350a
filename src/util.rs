//! Miscellaneous utility functions

use std::io;
use std::str::{from_utf8, from_utf8_unchecked};

const CTRL_MASK: u8 = 0x1f;

/// Returns the control character corresponding to the given character.
///
/// # Examples
///
/// ```
/// # use termseq::util::ctrl;
/// // Ctrl-C
/// assert_eq!(ctrl('c'), '\x03');
/// ```
#[inline]
pub fn ctrl(ch: char) -> char {
    ((ch as u8) & CTRL_MASK) as char
}

/// Returns the longest prefix of `s` no longer than `max` bytes
/// which ends on a character boundary.
///
/// # Examples
///
/// ```
/// # use termseq::util::truncate_str;
/// assert_eq!(truncate_str("hello", 3), "hel");
/// // 'é' is two bytes long
/// assert_eq!(truncate_str("héllo", 2), "h");
/// ```
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }

    let mut end = max;

    while !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Returns the valid UTF-8 prefix of `buf`.
///
/// An incomplete character at the end of `buf` is excluded.
/// Invalid data anywhere else is an error.
pub(crate) fn utf8_prefix(buf: &[u8]) -> io::Result<&str> {
    match from_utf8(buf) {
        Ok(s) => Ok(s),
        Err(e) => {
            if e.error_len().is_some() {
                Err(io::Error::new(io::ErrorKind::InvalidData,
                    "read invalid utf-8 data from terminal"))
            } else {
                // The prefix was validated above
                Ok(unsafe { from_utf8_unchecked(&buf[..e.valid_up_to()]) })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ctrl, truncate_str, utf8_prefix};

    #[test]
    fn test_ctrl() {
        assert_eq!(ctrl('a'), '\x01');
        assert_eq!(ctrl('A'), '\x01');
        assert_eq!(ctrl('['), '\x1b');
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_str("", 4), "");
        assert_eq!(truncate_str("abc", 0), "");
        assert_eq!(truncate_str("abc", 3), "abc");
        assert_eq!(truncate_str("abcdef", 4), "abcd");
        assert_eq!(truncate_str("a\u{1F600}", 4), "a");
        assert_eq!(truncate_str("a\u{1F600}", 5), "a\u{1F600}");
    }

    #[test]
    fn test_utf8_prefix() {
        assert_eq!(utf8_prefix(b"abc").unwrap(), "abc");
        // First two bytes of a three-byte character
        assert_eq!(utf8_prefix(b"ab\xe2\x82").unwrap(), "ab");
        assert!(utf8_prefix(b"a\xffb").is_err());
    }
}
