use std::char;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io;
use std::mem::zeroed;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::time::{Duration, Instant};

use winapi::shared::winerror::WAIT_TIMEOUT;
use winapi::shared::minwindef::{FALSE, BOOL, DWORD};
use winapi::shared::ntdef::{VOID, HANDLE};
use winapi::um::consoleapi::{
    GetConsoleMode,
    ReadConsoleW,
    ReadConsoleInputW,
    WriteConsoleW,
    SetConsoleMode,
};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::processenv::GetStdHandle;
use winapi::um::synchapi::WaitForSingleObject;
use winapi::um::winbase::{
    INFINITE,
    STD_INPUT_HANDLE, STD_OUTPUT_HANDLE, STD_ERROR_HANDLE,
    WAIT_FAILED, WAIT_OBJECT_0,
};
use winapi::um::wincon::{
    GetConsoleScreenBufferInfo,
    CONSOLE_SCREEN_BUFFER_INFO,
    INPUT_RECORD,
    ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_EXTENDED_FLAGS,
    ENABLE_VIRTUAL_TERMINAL_INPUT,
    ENABLE_PROCESSED_OUTPUT, ENABLE_VIRTUAL_TERMINAL_PROCESSING,
    KEY_EVENT,
};

use log::warn;

use crate::terminal::{Device, Size};
use crate::util::utf8_prefix;

/// Terminal device on the Windows console
pub struct SystemDevice {
    in_handle: HANDLE,
    out_handle: HANDLE,
    old_out_mode: DWORD,
    input: InputQueue,
}

// Console text decoded to UTF-8, awaiting single-byte reads
struct InputQueue {
    pending: VecDeque<u8>,
    // High half of a surrogate pair awaiting its low half
    surrogate: Option<u16>,
}

impl InputQueue {
    fn new() -> InputQueue {
        InputQueue{
            pending: VecDeque::new(),
            surrogate: None,
        }
    }

    fn pop(&mut self) -> Option<u8> {
        self.pending.pop_front()
    }

    fn push_unit(&mut self, unit: u16) {
        let units = match self.surrogate.take() {
            Some(high) => vec![high, unit],
            None if is_high_surrogate(unit) => {
                self.surrogate = Some(unit);
                return;
            }
            None => vec![unit],
        };

        for ch in char::decode_utf16(units) {
            let ch = ch.unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut buf = [0; 4];
            self.pending.extend(ch.encode_utf8(&mut buf).bytes());
        }
    }

    // Queues text read in line input mode, where lines end with "\r\n".
    fn push_line(&mut self, units: &[u16]) {
        for &unit in units {
            if unit == b'\n' as u16 && self.pending.back() == Some(&b'\r') {
                self.pending.pop_back();
            }
            self.push_unit(unit);
        }
    }
}

unsafe impl Send for SystemDevice {}

impl SystemDevice {
    fn new(out: DWORD) -> io::Result<SystemDevice> {
        let in_handle = result_handle(
            unsafe { GetStdHandle(STD_INPUT_HANDLE) })?;
        let out_handle = result_handle(
            unsafe { GetStdHandle(out) })?;

        let old_out_mode = unsafe { prepare_output(out_handle)? };

        Ok(SystemDevice{
            in_handle,
            out_handle,
            old_out_mode,
            input: InputQueue::new(),
        })
    }

    /// Opens the console on the standard input and standard output handles.
    pub fn stdout() -> io::Result<SystemDevice> {
        SystemDevice::new(STD_OUTPUT_HANDLE)
    }

    /// Opens the console on the standard input and standard error handles.
    pub fn stderr() -> io::Result<SystemDevice> {
        SystemDevice::new(STD_ERROR_HANDLE)
    }

    fn wait_input(&self, timeout: DWORD) -> io::Result<bool> {
        let res = unsafe { WaitForSingleObject(self.in_handle, timeout) };

        match res {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            WAIT_FAILED | _ => Err(io::Error::last_os_error())
        }
    }

    // Reads one input record, queueing the text of a key press.
    fn read_record(&mut self) -> io::Result<()> {
        let mut event: [INPUT_RECORD; 1] = unsafe { zeroed() };
        let mut n = 0;

        result_bool(unsafe { ReadConsoleInputW(
            self.in_handle,
            event.as_mut_ptr(),
            1,
            &mut n) })?;

        if n != 0 {
            if let Some(unit) = key_press_unit(&event[0]) {
                self.input.push_unit(unit);
            }
        }

        Ok(())
    }

    // Reads a line with the console's own editing and echo.
    fn read_cooked(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u16; 256];

        loop {
            if let Some(b) = self.input.pop() {
                return Ok(Some(b));
            }

            let mut n_read = 0;

            result_bool(unsafe { ReadConsoleW(
                self.in_handle,
                buf.as_mut_ptr() as *mut VOID,
                to_dword(buf.len()),
                &mut n_read,
                ptr::null_mut()) })?;

            if n_read == 0 {
                return Ok(None);
            }

            self.input.push_line(&buf[..n_read as usize]);
        }
    }

    fn next_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(b) = self.input.pop() {
                return Ok(Some(b));
            }

            let wait = match deadline {
                Some(deadline) => as_millis(
                    deadline.saturating_duration_since(Instant::now())),
                None => INFINITE,
            };

            if !self.wait_input(wait)? {
                return Ok(None);
            }

            self.read_record()?;
        }
    }
}

impl Device for SystemDevice {
    type Mode = DWORD;

    fn current_mode(&self) -> io::Result<DWORD> {
        unsafe { console_mode(self.in_handle) }
    }

    fn raw_mode(&self, original: &DWORD) -> DWORD {
        let mut in_mode = *original;

        // Necessary to modify certain flags
        in_mode |= ENABLE_EXTENDED_FLAGS;

        // Disable echoing input to console
        in_mode &= !ENABLE_ECHO_INPUT;
        // Disable waiting for newline before input can be read
        in_mode &= !ENABLE_LINE_INPUT;

        // Deliver special keys as escape sequences
        in_mode |= ENABLE_VIRTUAL_TERMINAL_INPUT;

        in_mode
    }

    fn set_mode(&mut self, mode: &DWORD) -> io::Result<()> {
        unsafe { set_console_mode(self.in_handle, *mode | ENABLE_EXTENDED_FLAGS) }
    }

    fn poll_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        self.next_byte(Some(timeout))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mode = unsafe { console_mode(self.in_handle)? };

        if mode & ENABLE_LINE_INPUT != 0 {
            self.read_cooked()
        } else {
            self.next_byte(None)
        }
    }

    fn read_reply(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut n = 0;

        while n < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());

            match self.next_byte(Some(remaining))? {
                Some(b) => {
                    buf[n] = b;
                    n += 1;

                    if b == b'R' {
                        break;
                    }
                }
                None => break
            }
        }

        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The console accepts UTF-16; an incomplete trailing character
        // is left for the next call.
        let valid = utf8_prefix(buf)?;

        if valid.is_empty() && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData,
                "incomplete UTF-8 character in output"));
        }

        let wide = OsStr::new(valid).encode_wide().collect::<Vec<_>>();
        let mut n = 0;

        while wide.len() > n {
            let mut n_dw = 0;
            let len = to_dword(wide.len() - n);

            result_bool(unsafe { WriteConsoleW(
                self.out_handle,
                wide[n..].as_ptr() as *const VOID,
                len,
                &mut n_dw,
                ptr::null_mut()) })?;

            n += n_dw as usize;
        }

        Ok(valid.len())
    }

    fn window_size(&self) -> io::Result<Size> {
        unsafe { console_size(self.out_handle) }
    }
}

impl Drop for SystemDevice {
    fn drop(&mut self) {
        if let Err(e) = unsafe { set_console_mode(self.out_handle, self.old_out_mode) } {
            warn!("failed to restore console output mode: {}", e);
        }
    }
}

fn as_millis(timeout: Duration) -> DWORD {
    let ms = timeout.as_millis();

    // `INFINITE` is reserved
    if ms >= INFINITE as u128 {
        INFINITE - 1
    } else {
        ms as DWORD
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xd800..0xdc00).contains(&unit)
}

fn key_press_unit(event: &INPUT_RECORD) -> Option<u16> {
    if event.EventType != KEY_EVENT {
        return None;
    }

    let key = unsafe { event.Event.KeyEvent() };

    if key.bKeyDown == FALSE {
        return None;
    }

    match unsafe { *key.uChar.UnicodeChar() } {
        0 => None,
        unit => Some(unit)
    }
}

unsafe fn console_info(handle: HANDLE) -> io::Result<CONSOLE_SCREEN_BUFFER_INFO> {
    let mut info = zeroed();

    result_bool(GetConsoleScreenBufferInfo(handle, &mut info))?;

    Ok(info)
}

unsafe fn console_mode(handle: HANDLE) -> io::Result<DWORD> {
    let mut mode = 0;

    result_bool(GetConsoleMode(handle, &mut mode))?;

    Ok(mode)
}

unsafe fn console_size(handle: HANDLE) -> io::Result<Size> {
    let info = console_info(handle)?;
    let win = info.srWindow;

    Ok(Size{
        lines: (win.Bottom - win.Top + 1) as usize,
        columns: (win.Right - win.Left + 1) as usize,
    })
}

unsafe fn set_console_mode(handle: HANDLE, mode: DWORD) -> io::Result<()> {
    result_bool(SetConsoleMode(handle, mode))
}

unsafe fn prepare_output(handle: HANDLE) -> io::Result<DWORD> {
    let old_out_mode = console_mode(handle)?;

    let mut out_mode = old_out_mode;

    out_mode |= ENABLE_PROCESSED_OUTPUT;

    // Enable interpreting escape sequences in output
    out_mode |= ENABLE_VIRTUAL_TERMINAL_PROCESSING;

    set_console_mode(handle, out_mode)?;

    Ok(old_out_mode)
}

fn to_dword(n: usize) -> DWORD {
    if n > DWORD::max_value() as usize {
        DWORD::max_value()
    } else {
        n as DWORD
    }
}

fn result_bool(b: BOOL) -> io::Result<()> {
    if b == FALSE {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn result_handle(ptr: HANDLE) -> io::Result<HANDLE> {
    if ptr == INVALID_HANDLE_VALUE {
        Err(io::Error::last_os_error())
    } else {
        Ok(ptr)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{as_millis, is_high_surrogate, InputQueue, INFINITE};

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn drain(queue: &mut InputQueue) -> Vec<u8> {
        let mut v = Vec::new();
        while let Some(b) = queue.pop() {
            v.push(b);
        }
        v
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(as_millis(Duration::from_millis(100)), 100);
        assert_eq!(as_millis(Duration::from_secs(u64::max_value())), INFINITE - 1);
    }

    #[test]
    fn test_surrogate() {
        assert!(is_high_surrogate(0xd83d));
        assert!(!is_high_surrogate(0xde00));
        assert!(!is_high_surrogate(b'a' as u16));
    }

    #[test]
    fn test_line_input_terminator() {
        let mut queue = InputQueue::new();

        queue.push_line(&wide("hi\r\n"));
        assert_eq!(drain(&mut queue), b"hi\n");

        // Terminator split across reads
        queue.push_line(&wide("ok\r"));
        queue.push_line(&wide("\n"));
        assert_eq!(drain(&mut queue), b"ok\n");

        // A lone carriage return is kept
        queue.push_line(&wide("a\rb"));
        assert_eq!(drain(&mut queue), b"a\rb");
    }

    #[test]
    fn test_key_units() {
        let mut queue = InputQueue::new();

        for unit in wide("é\u{1F600}") {
            queue.push_unit(unit);
        }
        assert_eq!(drain(&mut queue), "é\u{1F600}".as_bytes());

        // Key presses are not translated
        queue.push_unit(b'\r' as u16);
        assert_eq!(drain(&mut queue), b"\r");
    }
}
