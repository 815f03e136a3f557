use std::time::Duration;

use thiserror::Error;

use crate::step::Step;

/// Everything that can stop a flow. No variant is retried; the remedy is
/// always to fix the cause and re-run.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("`{tool}` not found on PATH. {hint}")]
    MissingTool { tool: String, hint: String },

    #[error("{step} failed: {detail}")]
    StepFailed { step: Step, detail: String },

    #[error("resolver returned no image for `{name}`")]
    EmptyResolution { name: String },

    #[error(
        "container `{name}` is not running after start; inspect it with `{engine} logs {name}`"
    )]
    NotRunning { name: String, engine: String },

    #[error("{url} did not become ready within {}s", .waited.as_secs())]
    ReadinessTimeout { url: String, waited: Duration },

    #[error("interrupted during {step}")]
    Interrupted { step: Step },

    #[error("{step}: {source}")]
    Io {
        step: Step,
        #[source]
        source: std::io::Error,
    },
}

impl FlowError {
    pub fn step_failed(step: Step, detail: impl Into<String>) -> Self {
        Self::StepFailed {
            step,
            detail: detail.into(),
        }
    }

    pub fn io(step: Step) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { step, source }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlowError::Interrupted { .. } => 130,
            _ => 1,
        }
    }
}

pub type Result<T, E = FlowError> = std::result::Result<T, E>;
