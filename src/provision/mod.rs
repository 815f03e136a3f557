// Provisioning flow: toolkit, temporary container, derived image.

pub mod orchestrator;
mod types;

pub use orchestrator::run_provision;
pub use types::{ProvisionInput, ProvisionReport, StepRecord};
