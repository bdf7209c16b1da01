//! Signal-driven buttons and shutdown
//!
//! Button helpers (a GPIO daemon, a udev rule, `kill` from a shell) deliver
//! presses as signals: SIGUSR1 selects the next window, SIGUSR2 the previous
//! one. SIGINT and SIGTERM request a clean shutdown.

use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::{Handle, Signals};

use super::{ControlCommand, ControlError};

/// Translates button signals into control commands on a background thread
pub struct SignalButtons {
    handle: Handle,
    thread: JoinHandle<()>,
}

impl SignalButtons {
    pub fn spawn(sender: Sender<ControlCommand>) -> Result<Self, ControlError> {
        let mut signals = Signals::new([SIGUSR1, SIGUSR2])?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("buttons".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    let command = match signal {
                        SIGUSR1 => ControlCommand::NextWindow,
                        SIGUSR2 => ControlCommand::PreviousWindow,
                        _ => continue,
                    };
                    tracing::debug!("Button signal {} -> {:?}", signal, command);
                    if sender.send(command).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { handle, thread })
    }

    /// Stop listening and wait for the thread
    pub fn stop(self) {
        self.handle.close();
        if self.thread.join().is_err() {
            tracing::error!("Button thread panicked");
        }
    }
}

/// Raise `flag` on SIGINT or SIGTERM
pub fn register_shutdown(flag: &Arc<AtomicBool>) -> Result<(), ControlError> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(flag))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_signals_become_window_commands() {
        let (sender, receiver) = mpsc::channel();
        let buttons = SignalButtons::spawn(sender).unwrap();

        signal_hook::low_level::raise(SIGUSR1).unwrap();
        let command = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(command, ControlCommand::NextWindow);

        signal_hook::low_level::raise(SIGUSR2).unwrap();
        let command = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(command, ControlCommand::PreviousWindow);

        buttons.stop();
    }
}
