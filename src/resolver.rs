//! Logical image name → fully qualified, tag-resolved reference.
//!
//! The resolver is an external helper (installed with the toolkit) that picks
//! the image tag matching the device's L4T release, so no flow hardcodes a
//! version tag.

use tracing::info;

use crate::error::{FlowError, Result};
use crate::process::{CommandSpec, Runner};
use crate::step::Step;

/// Resolve `name` with `resolver` (a command line, possibly with leading
/// arguments). Fails when the resolver is missing, exits nonzero, or prints
/// nothing.
pub fn resolve(runner: &dyn Runner, resolver: &str, name: &str, step: Step) -> Result<String> {
    let cmd = resolver_command(resolver, name)
        .map_err(|e| FlowError::step_failed(step, format!("invalid resolver `{resolver}`: {e}")))?;

    if runner.locate(&cmd.program).is_none() {
        return Err(FlowError::MissingTool {
            tool: cmd.program,
            hint: "It is installed by the container toolkit; run `jetkit provision` first."
                .into(),
        });
    }

    let out = runner.output(&cmd).map_err(FlowError::io(step))?;
    if !out.success() {
        return Err(FlowError::step_failed(
            step,
            format!(
                "`{}` exited with status {}: {}",
                cmd.display(),
                out.status_code,
                out.stderr.trim()
            ),
        ));
    }

    match parse_reference(&out.stdout) {
        Some(reference) => {
            info!(name, reference, "resolved image");
            Ok(reference.to_string())
        }
        None => Err(FlowError::EmptyResolution { name: name.into() }),
    }
}

/// Split the configured resolver into program and leading arguments, then
/// append the logical name.
pub fn resolver_command(
    resolver: &str,
    name: &str,
) -> std::result::Result<CommandSpec, shell_words::ParseError> {
    let mut words = shell_words::split(resolver)?.into_iter();
    let program = words.next().unwrap_or_default();
    Ok(CommandSpec::new(program).args(words).arg(name))
}

/// The reference is the last non-blank line; resolvers log progress before it.
pub fn parse_reference(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rfind(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference_takes_last_line() {
        let out = "-- L4T_VERSION=36.2.0\n-- Finding compatible container image\ndustynv/l4t-ml:r36.2.0\n\n";
        assert_eq!(parse_reference(out), Some("dustynv/l4t-ml:r36.2.0"));
    }

    #[test]
    fn parse_reference_empty_output() {
        assert_eq!(parse_reference(""), None);
        assert_eq!(parse_reference("  \n\t\n"), None);
    }

    #[test]
    fn resolver_command_keeps_leading_args() {
        let cmd = resolver_command("jetson-containers autotag", "l4t-ml").unwrap();
        assert_eq!(cmd.program, "jetson-containers");
        assert_eq!(cmd.args, vec!["autotag", "l4t-ml"]);
    }

    #[test]
    fn resolver_command_rejects_unbalanced_quotes() {
        assert!(resolver_command("autotag 'oops", "l4t-ml").is_err());
    }
}
