// Process execution: captured runs, streamed runs, background jobs, signals.

pub mod run;
pub mod runner;
pub mod signals;
pub mod types;

pub use runner::{BackgroundJob, Runner, SystemRunner};
pub use types::{CancelToken, CommandOutput, CommandSpec, ExecResult, OutputLine};
