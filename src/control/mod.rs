//! Control input
//!
//! Button presses become [`ControlCommand`] messages on a channel. A
//! dispatcher thread turns each message into a multiplexer command. Nothing
//! here touches the screen; the effect comes back through the session feed.

mod signals;

use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

pub use signals::{register_shutdown, SignalButtons};

/// Control errors
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
    #[error("Empty control command")]
    EmptyCommand,
    #[error("Control IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An action requested by a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    NextWindow,
    PreviousWindow,
    /// Arbitrary command line, run as is
    Custom(Vec<String>),
}

impl ControlCommand {
    /// The command line that carries out this action on `session`
    pub fn argv(&self, session: &str) -> Vec<String> {
        let select = |direction: &str| {
            vec![
                "tmux".to_string(),
                "select-window".to_string(),
                "-t".to_string(),
                format!("{}:{}", session, direction),
            ]
        };
        match self {
            ControlCommand::NextWindow => select("+"),
            ControlCommand::PreviousWindow => select("-"),
            ControlCommand::Custom(argv) => argv.clone(),
        }
    }
}

/// Runs control command lines
pub trait CommandRunner: Send + 'static {
    fn run(&mut self, argv: &[String]) -> Result<(), ControlError>;
}

/// Runs commands as child processes and waits for them
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, argv: &[String]) -> Result<(), ControlError> {
        let (program, args) = argv.split_first().ok_or(ControlError::EmptyCommand)?;
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| ControlError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ControlError::Failed {
                program: program.clone(),
                status,
            });
        }
        Ok(())
    }
}

/// Start the dispatcher thread. It runs until every sender is dropped.
pub fn spawn_dispatcher<R: CommandRunner>(
    session: String,
    runner: R,
) -> Result<(Sender<ControlCommand>, JoinHandle<()>), ControlError> {
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new()
        .name("control".to_string())
        .spawn(move || dispatch(&session, runner, receiver))?;
    Ok((sender, thread))
}

fn dispatch<R: CommandRunner>(session: &str, mut runner: R, receiver: Receiver<ControlCommand>) {
    for command in receiver {
        let argv = command.argv(session);
        tracing::debug!("Control {:?}: {:?}", command, argv);
        if let Err(e) = runner.run(&argv) {
            tracing::warn!("Control command {:?} failed: {}", command, e);
        }
    }
    tracing::debug!("Control channel closed");
}
