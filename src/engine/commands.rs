use std::path::Path;

use crate::config::{LaunchConfig, TempContainerConfig};
use crate::process::CommandSpec;

/// Build-arg carrying the resolved base image into the build description.
pub const BASE_IMAGE_ARG: &str = "BASE_IMAGE";

/// `<engine> version`: fails when the daemon is unreachable.
pub fn version_command(engine: &str) -> CommandSpec {
    CommandSpec::new(engine).args(["version", "--format", "{{.Server.Version}}"])
}

/// `<engine> container inspect`: the container's state object as JSON.
pub fn inspect_command(engine: &str, name: &str) -> CommandSpec {
    CommandSpec::new(engine).args(["container", "inspect", "--format", "{{json .State}}", name])
}

pub fn stop_command(engine: &str, name: &str) -> CommandSpec {
    CommandSpec::new(engine).args(["stop", name])
}

pub fn remove_command(engine: &str, name: &str) -> CommandSpec {
    CommandSpec::new(engine).args(["rm", "-f", name])
}

/// Start the temporary container detached under its fixed name.
pub fn run_detached_command(engine: &str, cfg: &TempContainerConfig, image: &str) -> CommandSpec {
    let mut cmd = CommandSpec::new(engine).args(["run", "-d", "--name", cfg.name.as_str()]);
    if let Some(runtime) = &cfg.runtime {
        cmd = cmd.args(["--runtime", runtime.as_str()]);
    }
    cmd.arg(image).args(cfg.command.iter().cloned())
}

/// Build the derived image from `context_dir`, injecting the base reference.
pub fn build_command(engine: &str, tag: &str, context_dir: &Path, base_image: &str) -> CommandSpec {
    CommandSpec::new(engine).args([
        "build".to_string(),
        "--build-arg".to_string(),
        format!("{BASE_IMAGE_ARG}={base_image}"),
        "-t".to_string(),
        tag.to_string(),
        context_dir.display().to_string(),
    ])
}

/// Run the application image in the foreground of a background job.
pub fn app_run_command(engine: &str, cfg: &LaunchConfig, image: &str) -> CommandSpec {
    CommandSpec::new(engine)
        .arg("run")
        .args(cfg.run_args.iter().cloned())
        .arg(image)
        .args(cfg.command.iter().cloned())
}
