use std::fmt;

/// Identifies which flow step is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    // provision
    Prerequisites,
    CloneToolkit,
    InstallToolkit,
    ResolveBaseImage,
    StartContainer,
    VerifyRunning,
    GenerateBuildDescription,
    BuildImage,
    // launch
    ResolveAppImage,
    StartApp,
    WaitReady,
    OpenBrowser,
}

impl Step {
    /// Ordered steps of the provisioning flow.
    pub const PROVISION: [Step; 8] = [
        Step::Prerequisites,
        Step::CloneToolkit,
        Step::InstallToolkit,
        Step::ResolveBaseImage,
        Step::StartContainer,
        Step::VerifyRunning,
        Step::GenerateBuildDescription,
        Step::BuildImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Prerequisites => "prerequisite check",
            Step::CloneToolkit => "clone toolkit",
            Step::InstallToolkit => "install toolkit",
            Step::ResolveBaseImage => "resolve base image",
            Step::StartContainer => "start container",
            Step::VerifyRunning => "verify container running",
            Step::GenerateBuildDescription => "generate build description",
            Step::BuildImage => "build image",
            Step::ResolveAppImage => "resolve app image",
            Step::StartApp => "start app",
            Step::WaitReady => "wait for app",
            Step::OpenBrowser => "open browser",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
