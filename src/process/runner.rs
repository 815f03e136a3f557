use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use super::run;
use super::types::{CancelToken, CommandOutput, CommandSpec, ExecResult};

/// Handle on a process left running in the background.
pub trait BackgroundJob {
    fn pid(&self) -> u32;

    /// `Ok(Some(code))` once the process has exited, `Ok(None)` while alive.
    /// Processes killed by a signal report `-1`.
    fn try_status(&mut self) -> io::Result<Option<i32>>;
}

impl BackgroundJob for Child {
    fn pid(&self) -> u32 {
        self.id()
    }

    fn try_status(&mut self) -> io::Result<Option<i32>> {
        Ok(self.try_wait()?.map(|s| s.code().unwrap_or(-1)))
    }
}

/// Everything the flows need from the host to drive external tools.
pub trait Runner {
    /// Run to completion and capture output.
    fn output(&self, cmd: &CommandSpec) -> io::Result<CommandOutput>;

    /// Run to completion, forwarding output to the log, honouring `cancel`.
    fn stream(&self, cmd: &CommandSpec, cancel: &CancelToken) -> io::Result<ExecResult>;

    /// Start without waiting. The caller owns the returned job.
    fn spawn(&self, cmd: &CommandSpec) -> io::Result<Box<dyn BackgroundJob>>;

    /// Find `program` on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn output(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
        debug!(command = %cmd.display(), "run");
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).stdin(Stdio::null());
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        let output = command.output()?;
        let status_code = output
            .status
            .code()
            .unwrap_or(if output.status.success() { 0 } else { 1 });
        Ok(CommandOutput {
            status_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn stream(&self, cmd: &CommandSpec, cancel: &CancelToken) -> io::Result<ExecResult> {
        debug!(command = %cmd.display(), "stream");
        run::stream(cmd, cancel)
    }

    fn spawn(&self, cmd: &CommandSpec) -> io::Result<Box<dyn BackgroundJob>> {
        debug!(command = %cmd.display(), "spawn");
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args).stdin(Stdio::null());
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        Ok(Box::new(command.spawn()?))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
