//! Unix PTY implementation
//!
//! Implements PTY creation and child process management using POSIX APIs.

use std::ffi::CString;
use std::os::fd::BorrowedFd;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::fcntl::{fcntl, open, FcntlArg, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::sys::signal::{kill, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, read, setsid, ForkResult, Pid};

use super::{PtyError, PtyResult, WindowSize};

/// A pseudoterminal with a spawned child process
pub struct Pty {
    /// The PTY master file descriptor
    master: PtyMaster,
    /// The child process ID
    child_pid: Pid,
    /// Whether the child is still running
    child_alive: bool,
}

impl Pty {
    /// Spawn `argv[0]` with the remaining arguments in a new PTY
    ///
    /// The child gets `TERM=xterm-256color` and a controlling terminal of
    /// the given size. The master side is non-blocking.
    pub fn spawn(argv: &[String], size: WindowSize) -> PtyResult<Self> {
        let program = argv.first().ok_or(PtyError::EmptyCommand)?;

        // Convert before forking so the child never has to report it
        let argv_c = argv
            .iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| PtyError::NulInArgument(arg.clone())))
            .collect::<PtyResult<Vec<CString>>>()?;

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;
        grantpt(&master).map_err(PtyError::GrantPty)?;
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // SAFETY: ptsname is not thread-safe, but we're calling it immediately
        // after unlockpt and before any other thread could interfere
        let slave_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;

        set_window_size(master.as_raw_fd(), size)?;

        // SAFETY: the child never returns into the caller; it execs or exits
        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Child => {
                drop(master);
                let err = exec_child(&slave_name, &argv_c);
                eprintln!("tftmux: failed to start {}: {}", program, err);
                // SAFETY: leaving the forked child without running the parent's destructors
                unsafe { libc::_exit(127) }
            },
            ForkResult::Parent { child } => {
                let flags = fcntl(master.as_raw_fd(), FcntlArg::F_GETFL)
                    .map_err(PtyError::SetNonBlocking)?;
                let flags = OFlag::from_bits_truncate(flags);
                fcntl(
                    master.as_raw_fd(),
                    FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK),
                )
                .map_err(PtyError::SetNonBlocking)?;

                Ok(Pty {
                    master,
                    child_pid: child,
                    child_alive: true,
                })
            },
        }
    }

    /// Get the child process ID
    pub fn child_pid(&self) -> Pid {
        self.child_pid
    }

    /// Check if the child process is still running
    pub fn is_alive(&mut self) -> bool {
        if !self.child_alive {
            return false;
        }

        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => true,
            Ok(_) | Err(_) => {
                self.child_alive = false;
                false
            },
        }
    }

    /// Wait for the child process to exit and return its exit code
    pub fn wait(&mut self) -> PtyResult<i32> {
        if !self.child_alive {
            return Ok(0);
        }

        match waitpid(self.child_pid, None).map_err(PtyError::Wait)? {
            WaitStatus::Exited(_, code) => {
                self.child_alive = false;
                Ok(code)
            },
            WaitStatus::Signaled(_, signal, _) => {
                self.child_alive = false;
                Err(PtyError::ChildSignaled(signal as i32))
            },
            _ => Ok(0),
        }
    }

    /// Read from the PTY master (non-blocking)
    ///
    /// Returns `Ok(None)` if no data is available yet and `Ok(Some(0))` at
    /// end of stream. Linux reports a closed slave as EIO, which is also
    /// mapped to end of stream.
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<Option<usize>> {
        match read(self.master.as_raw_fd(), buf) {
            Ok(n) => Ok(Some(n)),
            // EAGAIN and EWOULDBLOCK are the same value on Linux
            Err(nix::errno::Errno::EAGAIN) => Ok(None),
            Err(nix::errno::Errno::EIO) => Ok(Some(0)),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    /// Poll for data available to read
    ///
    /// Returns true if data is available or the other side hung up, false if
    /// the timeout expired.
    pub fn poll_read(&self, timeout_ms: i32) -> PtyResult<bool> {
        // SAFETY: The master fd is valid for the lifetime of this Pty
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(self.master.as_raw_fd()) };
        let mut fds = [PollFd::new(&borrowed_fd, PollFlags::POLLIN)];
        let n = poll(&mut fds, timeout_ms).map_err(PtyError::Poll)?;
        Ok(n > 0
            && fds[0]
                .revents()
                .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)))
    }

    /// Current window size of the PTY
    pub fn window_size(&self) -> PtyResult<WindowSize> {
        get_window_size(self.master.as_raw_fd())
    }

    /// Send a signal to the child process
    pub fn signal(&self, signal: Signal) -> PtyResult<()> {
        kill(self.child_pid, signal).map_err(PtyError::Signal)
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        // Try to reap the child process
        if self.child_alive {
            let _ = waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG));
        }
    }
}

/// Runs in the forked child: attach the slave as controlling terminal and
/// exec. Only returns on failure.
fn exec_child(slave_name: &str, argv: &[CString]) -> PtyError {
    let result = (|| -> PtyResult<std::convert::Infallible> {
        setsid().map_err(PtyError::Setsid)?;

        // Open slave - this becomes the controlling terminal
        let slave_fd =
            open(slave_name, OFlag::O_RDWR, Mode::empty()).map_err(PtyError::OpenSlave)?;

        // SAFETY: TIOCSCTTY is a valid ioctl for setting controlling terminal
        unsafe {
            libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0);
        }

        dup2(slave_fd, STDIN_FILENO).map_err(PtyError::Dup2)?;
        dup2(slave_fd, STDOUT_FILENO).map_err(PtyError::Dup2)?;
        dup2(slave_fd, STDERR_FILENO).map_err(PtyError::Dup2)?;
        if slave_fd > STDERR_FILENO {
            let _ = close(slave_fd);
        }

        std::env::set_var("TERM", "xterm-256color");

        execvp(&argv[0], argv).map_err(|source| PtyError::Exec {
            program: argv[0].to_string_lossy().into_owned(),
            source,
        })
    })();

    match result {
        Err(e) => e,
        Ok(never) => match never {},
    }
}

fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    // SAFETY: TIOCSWINSZ reads a winsize from the pointer
    if unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) } < 0 {
        return Err(PtyError::SetWinsize(nix::errno::Errno::last()));
    }
    Ok(())
}

fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    // SAFETY: winsize is plain old data
    let mut winsize: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: TIOCGWINSZ writes a winsize through the pointer
    if unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut winsize) } < 0 {
        return Err(PtyError::GetWinsize(nix::errno::Errno::last()));
    }
    Ok(WindowSize::new(winsize.ws_col, winsize.ws_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_window_size() {
        let size = WindowSize::new(60, 30);
        assert_eq!(size.cols, 60);
        assert_eq!(size.rows, 30);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            Pty::spawn(&[], WindowSize::new(60, 30)),
            Err(PtyError::EmptyCommand)
        ));
    }

    #[test]
    fn test_spawn_uses_requested_size() {
        let mut pty = Pty::spawn(&argv(&["/bin/sleep", "1"]), WindowSize::new(60, 30))
            .expect("Failed to spawn PTY");

        let size = pty.window_size().expect("Failed to get size");
        assert_eq!(size.cols, 60);
        assert_eq!(size.rows, 30);

        let _ = pty.signal(Signal::SIGKILL);
        let _ = pty.wait();
    }

    #[test]
    fn test_pty_spawn_reaches_end_of_stream() {
        let mut pty = Pty::spawn(&argv(&["/bin/echo", "hello"]), WindowSize::new(80, 24))
            .expect("Failed to spawn PTY");

        let mut output = Vec::new();
        let mut buf = [0u8; 1024];
        for _ in 0..50 {
            if !pty.poll_read(100).expect("Failed to poll") {
                continue;
            }
            match pty.read(&mut buf).expect("Failed to read") {
                Some(0) => break,
                Some(n) => output.extend_from_slice(&buf[..n]),
                None => {}
            }
        }

        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("hello"), "Unexpected output: {}", text);

        let _ = pty.wait();
        assert!(!pty.is_alive());
    }
}
