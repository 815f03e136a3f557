use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::step::Step;

/// Input to the provisioning flow.
pub struct ProvisionInput {
    pub config: Config,
    /// Base for the toolkit checkout and build directory.
    pub work_dir: PathBuf,
}

/// One finished step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: Step,
    pub elapsed: Duration,
    pub skipped: bool,
}

/// What a successful run did.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    /// `false` when an existing checkout was reused.
    pub cloned: bool,
    /// Whether a leftover temporary container had to be removed first.
    pub replaced_container: bool,
    pub base_image: String,
    pub container_id: String,
    pub image_tag: String,
    pub steps: Vec<StepRecord>,
}

impl ProvisionReport {
    /// Human-readable summary, one line per step.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for record in &self.steps {
            let status = if record.skipped { "skipped" } else { "ok" };
            out.push_str(&format!(
                "  {:<28} {:>7} {:>8.1}s\n",
                record.step.as_str(),
                status,
                record.elapsed.as_secs_f64()
            ));
        }
        out.push_str(&format!("Base image:    {}\n", self.base_image));
        out.push_str(&format!("Derived image: {}\n", self.image_tag));
        out
    }
}
