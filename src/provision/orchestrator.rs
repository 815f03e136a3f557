use std::time::{Duration, Instant};

use tracing::info;

use crate::build_description::BuildDescription;
use crate::cleanup::CleanupGuard;
use crate::engine::ContainerEngine;
use crate::error::{FlowError, Result};
use crate::process::{CancelToken, CommandSpec, ExecResult, Runner, run};
use crate::resolver;
use crate::step::Step;

use super::types::{ProvisionInput, ProvisionReport, StepRecord};

/// Run the provisioning flow to completion or first failure.
///
/// The temporary container and build directory are released before this
/// returns, whatever the outcome.
pub fn run_provision(
    input: &ProvisionInput,
    runner: &dyn Runner,
    cancel: &CancelToken,
) -> Result<ProvisionReport> {
    let cfg = &input.config;
    let engine = ContainerEngine::new(runner, cfg.engine.as_str());
    let name = cfg.temp_container.name.as_str();
    let build_dir = input.work_dir.join(&cfg.image.build_dir);

    // Registered before the first step: leftovers from an earlier run are
    // released even when this one fails early.
    let mut guard = CleanupGuard::new(&engine);
    guard.track_container(name);
    guard.track_build_dir(&build_dir);
    let mut steps = Steps::new(cancel);
    let mut report = ProvisionReport {
        image_tag: cfg.image.tag.clone(),
        ..ProvisionReport::default()
    };

    // ── Prerequisites ────────────────────────────────────────────────
    steps.run(Step::Prerequisites, || {
        require(runner, "git", "Install it with `sudo apt install git`.")?;
        require(
            runner,
            &cfg.engine,
            "Install a container engine, e.g. `sudo apt install docker.io`.",
        )?;
        engine
            .ensure_available()
            .map_err(|e| FlowError::step_failed(Step::Prerequisites, e.to_string()))
    })?;

    // ── Toolkit ──────────────────────────────────────────────────────
    let checkout = input.work_dir.join(&cfg.toolkit.dir);
    if checkout.exists() {
        info!(dir = %checkout.display(), "toolkit checkout present, skipping clone");
        steps.skip(Step::CloneToolkit);
    } else {
        steps.run(Step::CloneToolkit, || {
            let cmd = CommandSpec::new("git")
                .args(["clone", cfg.toolkit.repo.as_str()])
                .arg(checkout.display().to_string())
                .current_dir(&input.work_dir);
            stream(runner, &cmd, cancel, Step::CloneToolkit)
        })?;
        report.cloned = true;
    }

    steps.run(Step::InstallToolkit, || {
        let installer = checkout.join(&cfg.toolkit.installer);
        if !installer.is_file() {
            return Err(FlowError::step_failed(
                Step::InstallToolkit,
                format!("installer {} not found", installer.display()),
            ));
        }
        let cmd = CommandSpec::new("bash")
            .arg(installer.display().to_string())
            .current_dir(&checkout);
        stream(runner, &cmd, cancel, Step::InstallToolkit)
    })?;

    // ── Base image ───────────────────────────────────────────────────
    report.base_image = steps.run(Step::ResolveBaseImage, || {
        resolver::resolve(runner, &cfg.resolver, &cfg.image.base, Step::ResolveBaseImage)
    })?;

    // ── Temporary container ──────────────────────────────────────────
    let started = steps.run(Step::StartContainer, || {
        let replaced = engine
            .bootstrap(name)
            .map_err(|e| FlowError::step_failed(Step::StartContainer, e.to_string()))?;
        let id = engine
            .run_detached(&cfg.temp_container, &report.base_image)
            .map_err(|e| FlowError::step_failed(Step::StartContainer, e.to_string()))?;
        Ok((replaced, id))
    })?;
    (report.replaced_container, report.container_id) = started;

    steps.run(Step::VerifyRunning, || {
        if !run::pause(Duration::from_secs(cfg.temp_container.settle_secs), cancel) {
            return Err(FlowError::Interrupted {
                step: Step::VerifyRunning,
            });
        }
        let running = engine
            .is_running(name)
            .map_err(|e| FlowError::step_failed(Step::VerifyRunning, e.to_string()))?;
        if !running {
            return Err(FlowError::NotRunning {
                name: name.to_string(),
                engine: cfg.engine.clone(),
            });
        }
        Ok(())
    })?;

    // ── Derived image ────────────────────────────────────────────────
    steps.run(Step::GenerateBuildDescription, || {
        let path = BuildDescription::from_config(&cfg.image)
            .write_to(&build_dir)
            .map_err(FlowError::io(Step::GenerateBuildDescription))?;
        info!(path = %path.display(), "wrote build description");
        Ok(())
    })?;

    steps.run(Step::BuildImage, || {
        let result = engine
            .build(&cfg.image.tag, &build_dir, &report.base_image, cancel)
            .map_err(|e| FlowError::step_failed(Step::BuildImage, e.to_string()))?;
        check(&result, Step::BuildImage)
    })?;

    report.steps = steps.finish();
    info!(image = %report.image_tag, "provisioning complete");
    Ok(report)
}

/// Sequences steps: refuses to start one once cancelled, times each, and
/// reports failures that raced a cancellation as interruptions.
struct Steps<'a> {
    cancel: &'a CancelToken,
    records: Vec<StepRecord>,
}

impl<'a> Steps<'a> {
    fn new(cancel: &'a CancelToken) -> Self {
        Self {
            cancel,
            records: Vec::new(),
        }
    }

    fn run<T>(&mut self, step: Step, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.cancel.is_cancelled() {
            return Err(FlowError::Interrupted { step });
        }
        info!(%step, "starting");
        let start = Instant::now();
        let value = f().map_err(|e| {
            if self.cancel.is_cancelled() {
                FlowError::Interrupted { step }
            } else {
                e
            }
        })?;
        let elapsed = start.elapsed();
        info!(%step, elapsed_ms = elapsed.as_millis() as u64, "done");
        self.records.push(StepRecord {
            step,
            elapsed,
            skipped: false,
        });
        Ok(value)
    }

    fn skip(&mut self, step: Step) {
        self.records.push(StepRecord {
            step,
            elapsed: Duration::ZERO,
            skipped: true,
        });
    }

    fn finish(self) -> Vec<StepRecord> {
        self.records
    }
}

fn require(runner: &dyn Runner, tool: &str, hint: &str) -> Result<()> {
    if runner.locate(tool).is_none() {
        return Err(FlowError::MissingTool {
            tool: tool.to_string(),
            hint: hint.to_string(),
        });
    }
    Ok(())
}

fn stream(runner: &dyn Runner, cmd: &CommandSpec, cancel: &CancelToken, step: Step) -> Result<()> {
    let result = runner.stream(cmd, cancel).map_err(FlowError::io(step))?;
    check(&result, step)
}

fn check(result: &ExecResult, step: Step) -> Result<()> {
    if result.cancelled {
        return Err(FlowError::Interrupted { step });
    }
    if !result.success {
        let status = result
            .exit_code
            .map_or_else(|| "killed by signal".to_string(), |c| format!("exit status {c}"));
        return Err(FlowError::step_failed(step, status));
    }
    Ok(())
}
