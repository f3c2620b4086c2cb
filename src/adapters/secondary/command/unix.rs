/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Unix command execution adapter

use crate::domain::{CommandError, SourceError};
use crate::ports::{CommandExecutor, CommandOutput, LineSource, SystemCommand};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;

/// Unix-based command executor built on `tokio::process`
pub struct UnixCommandExecutor {
    /// Default timeout for commands run to completion
    default_timeout: Duration,
}

impl UnixCommandExecutor {
    /// Create a new Unix command executor
    ///
    /// # Arguments
    /// * `default_timeout` - Timeout used when a command does not set its own
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Create a Unix command executor with default settings
    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(30))
    }

    fn build(command: &SystemCommand) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        cmd.stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl CommandExecutor for UnixCommandExecutor {
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError> {
        let command_timeout = command.timeout.unwrap_or(self.default_timeout);

        let mut cmd = Self::build(command);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        log::debug!("Executing: {}", command.display());

        match timeout(command_timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let success = output.status.success();
                let exit_code = output.status.code();

                if !success {
                    log::debug!(
                        "'{}' failed with exit code {:?}: {}",
                        command.display(),
                        exit_code,
                        stderr.trim()
                    );
                }

                Ok(CommandOutput {
                    stdout,
                    stderr,
                    exit_code,
                    success,
                })
            }
            Ok(Err(source)) => Err(CommandError::ExecutionFailed {
                command: command.program.clone(),
                source,
            }),
            Err(_) => Err(CommandError::Timeout {
                command: command.program.clone(),
                timeout_secs: command_timeout.as_secs(),
            }),
        }
    }

    async fn spawn_lines(
        &self,
        command: &SystemCommand,
    ) -> Result<Box<dyn LineSource>, SourceError> {
        let mut cmd = Self::build(command);
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());

        log::debug!("Spawning: {}", command.display());

        let mut child = cmd.spawn().map_err(|source| SourceError::Spawn {
            command: command.program.clone(),
            source,
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SourceError::Spawn {
            command: command.program.clone(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout not captured"),
        })?;

        Ok(Box::new(ProcessLineSource {
            name: command.display(),
            child,
            reader: BufReader::new(stdout),
        }))
    }
}

/// Line source over a running child's standard output
pub struct ProcessLineSource {
    name: String,
    child: Child,
    reader: BufReader<ChildStdout>,
}

#[async_trait]
impl LineSource for ProcessLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|source| SourceError::Read {
                origin: self.name.clone(),
                source,
            })?;
        Ok(if read == 0 { None } else { Some(line) })
    }

    async fn finish(&mut self) -> Result<(), SourceError> {
        match self.child.wait().await {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("'{}' exited with {}", self.name, status),
            Err(e) => log::warn!("failed to wait for '{}': {}", self.name, e),
        }
        Ok(())
    }
}
