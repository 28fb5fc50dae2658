//! Seam for running external Pacemaker tools.

use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("cannot run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error talking to '{command}': {source}")]
    Communicate {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no command given")]
    EmptyCommand,
}

/// What a finished command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `-1` when the process was killed by a signal.
    pub retval: i32,
}

/// Runs a command to completion. `args[0]` is the program.
///
/// A non-zero exit code is not an error: many Pacemaker tools encode their
/// answer in it.
pub trait CommandRunner {
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the process cannot be started or its
    /// pipes fail.
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput, RunnerError>;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<CommandOutput, RunnerError> {
        let (program, rest) = args.split_first().ok_or(RunnerError::EmptyCommand)?;
        let command = (*program).to_owned();
        tracing::debug!(command = %args.join(" "), "running");

        let mut child = Command::new(program)
            .args(rest)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Stdin is written from its own thread while the output pipes drain.
        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_owned();
                Some(std::thread::spawn(move || pipe.write_all(input.as_bytes())))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|source| RunnerError::Communicate {
                command: command.clone(),
                source,
            })?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The child may exit without reading all of its input.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(source)) => return Err(RunnerError::Communicate { command, source }),
                Err(_) => {
                    return Err(RunnerError::Communicate {
                        command,
                        source: std::io::Error::other("stdin writer panicked"),
                    })
                }
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            retval: output.status.code().unwrap_or(-1),
        })
    }
}
