//! PTY-backed session feed
//!
//! Spawns the multiplexer client in a PTY and pumps its output through the
//! [`Decoder`] into the shared screen on a dedicated thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

use crate::pty::{Pty, PtyResult, WindowSize};

use super::{Decoder, SharedScreen};

const POLL_TIMEOUT_MS: i32 = 100;
const READ_BUFFER_SIZE: usize = 4096;
const REAP_ATTEMPTS: u32 = 20;

/// The command run inside the PTY
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCommand {
    pub argv: Vec<String>,
}

impl SessionCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Attach to the named tmux session, creating it if needed
    pub fn tmux(session: &str) -> Self {
        Self::new(
            ["tmux", "-2", "new-session", "-A", "-s", session]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// Handle on the running feed thread
pub struct FeedHandle {
    thread: JoinHandle<()>,
    child_pid: i32,
}

impl FeedHandle {
    pub fn child_pid(&self) -> i32 {
        self.child_pid
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!("Feed thread panicked");
        }
    }
}

/// Spawn `command` in a PTY sized to the screen and start feeding its
/// output into `screen`.
///
/// The thread ends when the child closes its side of the PTY, a read fails,
/// or `shutdown` is raised; in every case the screen is closed so the
/// renderer can stop.
pub fn spawn_pty_feed(
    command: &SessionCommand,
    screen: Arc<SharedScreen>,
    shutdown: Arc<AtomicBool>,
) -> PtyResult<FeedHandle> {
    let size = WindowSize::new(clamp_u16(screen.cols()), clamp_u16(screen.rows()));
    let pty = Pty::spawn(&command.argv, size)?;
    let child_pid = pty.child_pid().as_raw();
    tracing::info!("Spawned {:?} (pid {}) at {}x{}", command.argv, child_pid, size.cols, size.rows);

    let thread = thread::Builder::new()
        .name("feed".to_string())
        .spawn(move || {
            pump(pty, &screen, &shutdown);
            screen.close();
        })?;

    Ok(FeedHandle { thread, child_pid })
}

fn pump(mut pty: Pty, screen: &SharedScreen, shutdown: &AtomicBool) {
    let mut decoder = Decoder::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        if shutdown.load(Ordering::Acquire) {
            tracing::info!("Shutdown requested, detaching from session");
            if let Err(e) = pty.signal(Signal::SIGHUP) {
                tracing::debug!("Failed to hang up session: {}", e);
            }
            break;
        }

        match pty.poll_read(POLL_TIMEOUT_MS) {
            Ok(true) => {}
            Ok(false) => {
                if !pty.is_alive() {
                    break;
                }
                continue;
            },
            Err(e) => {
                tracing::error!("Poll error: {}", e);
                break;
            },
        }

        match pty.read(&mut buf) {
            Ok(Some(0)) => {
                tracing::info!("Session output closed");
                break;
            },
            Ok(Some(n)) => decoder.feed(&buf[..n], screen),
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Read error: {}", e);
                break;
            },
        }
    }

    reap(&mut pty);
}

fn reap(pty: &mut Pty) {
    for _ in 0..REAP_ATTEMPTS {
        if !pty.is_alive() {
            tracing::info!("Session process exited");
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    tracing::warn!("Session process did not exit, killing it");
    let _ = pty.signal(Signal::SIGKILL);
    match pty.wait() {
        Ok(code) => tracing::info!("Session process exited with code {}", code),
        Err(e) => tracing::warn!("Session process: {}", e),
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
