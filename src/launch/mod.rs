// Launch flow: start the app in the background, wait for it, open a browser.
//
// No cleanup guard and no signal handling here: the app is meant to outlive
// this process, and teardown is left to the operator.

pub mod readiness;

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::engine::commands::app_run_command;
use crate::error::{FlowError, Result};
use crate::process::{BackgroundJob, CommandSpec, Runner};
use crate::resolver;
use crate::step::Step;

/// A running app and the browser pointed at it.
pub struct LaunchSession {
    pub image: String,
    pub url: String,
    pub app: Box<dyn BackgroundJob>,
    pub browser_pid: u32,
}

impl fmt::Debug for LaunchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchSession")
            .field("image", &self.image)
            .field("url", &self.url)
            .field("app_pid", &self.app.pid())
            .field("browser_pid", &self.browser_pid)
            .finish()
    }
}

/// Run the launch flow.
///
/// If anything fails after the app has started, the app is left running and
/// the teardown steps are logged.
pub fn run_launch(cfg: &Config, runner: &dyn Runner) -> Result<LaunchSession> {
    let launch = &cfg.launch;

    if runner.locate(&cfg.engine).is_none() {
        return Err(FlowError::MissingTool {
            tool: cfg.engine.clone(),
            hint: "Install a container engine, e.g. `sudo apt install docker.io`.".into(),
        });
    }

    let image = resolver::resolve(runner, &cfg.resolver, &launch.image, Step::ResolveAppImage)?;

    info!(step = %Step::StartApp, image = %image, "starting");
    let mut app = runner
        .spawn(&app_run_command(&cfg.engine, launch, &image))
        .map_err(FlowError::io(Step::StartApp))?;
    info!(pid = app.pid(), "app started in background");

    let url = launch.url();
    let after_start = |err: FlowError, app: &dyn BackgroundJob| {
        warn!(
            "the app is still running; stop it manually:\n{}",
            teardown_instructions(&cfg.engine, &image, app.pid())
        );
        err
    };

    info!(step = %Step::WaitReady, url = %url, "starting");
    if let Err(e) = readiness::wait_ready(
        &launch.host,
        launch.port,
        Duration::from_secs(launch.settle_secs),
        Duration::from_secs(launch.ready_timeout_secs),
        app.as_mut(),
    ) {
        return Err(after_start(e, app.as_ref()));
    }

    info!(step = %Step::OpenBrowser, browser = %launch.browser, "starting");
    if runner.locate(&launch.browser).is_none() {
        let err = FlowError::MissingTool {
            tool: launch.browser.clone(),
            hint: format!(
                "Install it with `sudo apt install {}`, or open {url} yourself.",
                launch.browser
            ),
        };
        return Err(after_start(err, app.as_ref()));
    }
    let browser = match runner.spawn(&CommandSpec::new(launch.browser.as_str()).arg(url.as_str())) {
        Ok(job) => job,
        Err(e) => return Err(after_start(FlowError::io(Step::OpenBrowser)(e), app.as_ref())),
    };

    Ok(LaunchSession {
        browser_pid: browser.pid(),
        image,
        url,
        app,
    })
}

/// Operator instructions for stopping what the launch flow left running.
pub fn teardown_instructions(engine: &str, image: &str, app_pid: u32) -> String {
    format!(
        "  1. Find the app container:  {engine} ps --filter ancestor={image}\n\
         \x20 2. Stop it:                 {engine} stop <container-id>\n\
         \x20 3. Or end the background job: kill {app_pid}\n\
         \x20 Close the browser window when done.\n"
    )
}
