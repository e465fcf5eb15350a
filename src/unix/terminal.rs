use std::fs::File;
use std::io;
use std::mem::zeroed;
use std::os::unix::io::{FromRawFd, IntoRawFd, RawFd};
use std::path::Path;
use std::time::{Duration, Instant};

use libc::{
    ioctl,
    c_int, termios, winsize,
    STDIN_FILENO, STDOUT_FILENO, STDERR_FILENO, TIOCGWINSZ,
};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::termios::{
    tcgetattr, tcsetattr,
    SetArg, LocalFlags, Termios,
};
use nix::unistd::{read, write};

use crate::terminal::{Device, Size};

/// Terminal device on a Unix file descriptor
pub struct SystemDevice {
    in_fd: RawFd,
    out_fd: RawFd,
    owned_fd: bool,
}

impl SystemDevice {
    pub(crate) fn from_raw_fds(in_fd: RawFd, out_fd: RawFd, owned_fd: bool) -> SystemDevice {
        SystemDevice{in_fd, out_fd, owned_fd}
    }

    pub(crate) fn open<P: AsRef<Path>>(path: P) -> io::Result<SystemDevice> {
        let fd = open_rw(path)?;
        Ok(SystemDevice::from_raw_fds(fd, fd, true))
    }

    /// Opens the terminal on `stdin` and `stdout`.
    pub fn stdout() -> io::Result<SystemDevice> {
        Ok(SystemDevice::from_raw_fds(STDIN_FILENO, STDOUT_FILENO, false))
    }

    /// Opens the terminal on `stdin` and `stderr`.
    pub fn stderr() -> io::Result<SystemDevice> {
        Ok(SystemDevice::from_raw_fds(STDIN_FILENO, STDERR_FILENO, false))
    }

    fn wait_input(&self, timeout: Duration) -> io::Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut fds = [PollFd::new(self.in_fd, PollFlags::POLLIN)];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());

            match poll(&mut fds, to_millis(remaining)) {
                Ok(n) => break Ok(n != 0),
                Err(Errno::EINTR) => continue,
                Err(e) => break Err(nix_to_io(e))
            }
        }
    }

    fn read_input(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match read(self.in_fd, buf) {
                Ok(n) => break Ok(n),
                Err(Errno::EINTR) => continue,
                Err(e) => break Err(nix_to_io(e))
            }
        }
    }

    fn read_one(&self) -> io::Result<Option<u8>> {
        let mut buf = [0; 1];

        match self.read_input(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0]))
        }
    }
}

impl Device for SystemDevice {
    type Mode = termios;

    fn current_mode(&self) -> io::Result<termios> {
        let tio = tcgetattr(self.in_fd).map_err(nix_to_io)?;
        Ok(tio.into())
    }

    fn raw_mode(&self, original: &termios) -> termios {
        use nix::sys::termios::SpecialCharacterIndices::*;

        let mut tio = Termios::from(*original);

        tio.local_flags.remove(
            // Disable canonical mode;
            // this gives us input without waiting for newline or EOF.
            // Disable ECHO, preventing input from being written to output.
            LocalFlags::ICANON | LocalFlags::ECHO
        );

        // Block until at least one byte is ready
        tio.control_chars[VMIN as usize] = 1;
        // No inter-byte timer
        tio.control_chars[VTIME as usize] = 0;

        tio.into()
    }

    fn set_mode(&mut self, mode: &termios) -> io::Result<()> {
        tcsetattr(self.in_fd, SetArg::TCSANOW, &Termios::from(*mode))
            .map_err(nix_to_io)
    }

    fn poll_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        if !self.wait_input(timeout)? {
            return Ok(None);
        }

        // A hangup also wakes `poll`; the read then reports end of input.
        match self.read_one() {
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            r => r
        }
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.read_one()
    }

    fn read_reply(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if !self.wait_input(timeout)? {
            return Ok(0);
        }

        self.read_input(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        write(self.out_fd, buf).map_err(nix_to_io)
    }

    fn window_size(&self) -> io::Result<Size> {
        get_winsize(self.out_fd)
    }
}

impl Drop for SystemDevice {
    fn drop(&mut self) {
        if self.owned_fd {
            unsafe {
                close_fd(self.in_fd);

                if self.out_fd != self.in_fd {
                    close_fd(self.out_fd);
                }
            }
        }
    }
}

unsafe fn close_fd(fd: RawFd) {
    drop(File::from_raw_fd(fd));
}

fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<RawFd> {
    use std::fs::OpenOptions;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)?;

    Ok(file.into_raw_fd())
}

fn get_winsize(fd: c_int) -> io::Result<Size> {
    let mut winsz: winsize = unsafe { zeroed() };

    // `TIOCGWINSZ.into()` is a workaround to a bug in the libc crate:
    //  https://github.com/rust-lang/libc/pull/704
    let res = unsafe { ioctl(fd, TIOCGWINSZ.into(), &mut winsz) };

    if res == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(Size{
            lines: winsz.ws_row as usize,
            columns: winsz.ws_col as usize,
        })
    }
}

fn nix_to_io(e: nix::Error) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}

fn to_millis(d: Duration) -> c_int {
    let ms = d.as_millis();

    if ms > c_int::max_value() as u128 {
        c_int::max_value()
    } else {
        ms as c_int
    }
}
