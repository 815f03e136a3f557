// Container engine operations over a `Runner`.

pub mod commands;

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::process::{CancelToken, CommandSpec, ExecResult, Runner};

pub use commands::BASE_IMAGE_ARG;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}: {stderr}")]
    Failed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The `.State` object reported by `container inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    pub status: String,
    #[serde(default)]
    pub running: bool,
}

/// Thin typed layer over the engine CLI.
pub struct ContainerEngine<'a> {
    runner: &'a dyn Runner,
    program: String,
}

impl<'a> ContainerEngine<'a> {
    pub fn new(runner: &'a dyn Runner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Verify that the engine daemon is reachable.
    pub fn ensure_available(&self) -> Result<(), EngineError> {
        self.checked(&commands::version_command(&self.program))
            .map(|_| ())
    }

    /// Structured existence query: `None` when no container has this name.
    pub fn container_state(&self, name: &str) -> Result<Option<ContainerState>, EngineError> {
        let cmd = commands::inspect_command(&self.program, name);
        let out = self.runner.output(&cmd).map_err(|source| EngineError::Io {
            command: cmd.display(),
            source,
        })?;
        if !out.success() {
            debug!(container = name, stderr = %out.stderr.trim(), "container absent");
            return Ok(None);
        }
        let state = serde_json::from_str(out.stdout.trim()).map_err(|source| {
            EngineError::Parse {
                command: cmd.display(),
                source,
            }
        })?;
        Ok(Some(state))
    }

    pub fn is_running(&self, name: &str) -> Result<bool, EngineError> {
        Ok(self
            .container_state(name)?
            .is_some_and(|s| s.running || s.status == "running"))
    }

    pub fn stop(&self, name: &str) -> Result<(), EngineError> {
        self.checked(&commands::stop_command(&self.program, name))
            .map(|_| ())
    }

    pub fn remove(&self, name: &str) -> Result<(), EngineError> {
        self.checked(&commands::remove_command(&self.program, name))
            .map(|_| ())
    }

    /// Clear any leftover container named `name` so a fresh one can be
    /// created under it. Stop and removal failures are expected when the
    /// leftover is already stopped or gone, and are ignored.
    ///
    /// Returns whether a leftover was found.
    pub fn bootstrap(&self, name: &str) -> Result<bool, EngineError> {
        let Some(state) = self.container_state(name)? else {
            return Ok(false);
        };
        info!(container = name, status = %state.status, "removing leftover container");
        if let Err(e) = self.stop(name) {
            debug!(container = name, error = %e, "stop ignored");
        }
        if let Err(e) = self.remove(name) {
            debug!(container = name, error = %e, "remove ignored");
        }
        Ok(true)
    }

    /// Create and start a detached container; returns its id.
    pub fn run_detached(
        &self,
        cfg: &crate::config::TempContainerConfig,
        image: &str,
    ) -> Result<String, EngineError> {
        let out = self.checked(&commands::run_detached_command(&self.program, cfg, image))?;
        Ok(out.trim().to_string())
    }

    /// Build `tag` from `context_dir`, streaming the build log.
    pub fn build(
        &self,
        tag: &str,
        context_dir: &Path,
        base_image: &str,
        cancel: &CancelToken,
    ) -> Result<ExecResult, EngineError> {
        let cmd = commands::build_command(&self.program, tag, context_dir, base_image);
        self.runner
            .stream(&cmd, cancel)
            .map_err(|source| EngineError::Io {
                command: cmd.display(),
                source,
            })
    }

    /// Run `cmd` and return stdout, mapping nonzero exit to [`EngineError::Failed`].
    fn checked(&self, cmd: &CommandSpec) -> Result<String, EngineError> {
        let out = self.runner.output(cmd).map_err(|source| EngineError::Io {
            command: cmd.display(),
            source,
        })?;
        if !out.success() {
            return Err(EngineError::Failed {
                command: cmd.display(),
                status: out.status_code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_docker_state() {
        let state: ContainerState = serde_json::from_str(
            r#"{"Status":"running","Running":true,"Paused":false,"Pid":4242,"ExitCode":0}"#,
        )
        .unwrap();
        assert_eq!(state.status, "running");
        assert!(state.running);
    }

    #[test]
    fn parses_exited_state() {
        let state: ContainerState =
            serde_json::from_str(r#"{"Status":"exited","Running":false,"ExitCode":1}"#).unwrap();
        assert!(!state.running);
    }

    #[test]
    fn running_defaults_to_false_when_absent() {
        let state: ContainerState = serde_json::from_str(r#"{"Status":"created"}"#).unwrap();
        assert!(!state.running);
    }
}
