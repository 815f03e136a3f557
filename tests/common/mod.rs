//! Scripted stand-in for the host: a container table behind a fake engine
//! CLI, plus `git`, the installer, the resolver and the browser.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use jetkit::config::Config;
use jetkit::process::{BackgroundJob, CancelToken, CommandOutput, CommandSpec, ExecResult, Runner};

pub const BASE_REF: &str = "dustynv/l4t-ml:r36.2.0";

#[derive(Debug, Clone)]
pub struct Container {
    pub id: String,
    pub status: String,
}

impl Container {
    pub fn new(id: &str, status: &str) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }
}

#[derive(Debug)]
pub struct HostState {
    pub containers: BTreeMap<String, Container>,
    pub next_id: u32,
    /// Programs `locate` can find.
    pub tools: BTreeSet<String>,
    pub resolver_output: String,
    /// Operations that exit nonzero: "daemon", "clone", "install", "run", "build".
    pub failing: BTreeSet<&'static str>,
    /// Streamed operation during which the flow gets interrupted.
    pub interrupt_during: Option<&'static str>,
    /// Started containers exit right away.
    pub containers_die: bool,
    /// Exit status the app job reports, if it has exited.
    pub app_exit: Option<i32>,
    pub calls: Vec<CommandSpec>,
    pub spawned: Vec<CommandSpec>,
    pub built_images: Vec<String>,
    /// Dockerfile contents seen by the build.
    pub build_input: Option<String>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            containers: BTreeMap::new(),
            next_id: 1,
            tools: ["git", "bash", "docker", "autotag", "chromium-browser"]
                .into_iter()
                .map(String::from)
                .collect(),
            resolver_output: format!("-- L4T_VERSION=36.2.0\n-- Finding compatible image\n{BASE_REF}\n"),
            failing: BTreeSet::new(),
            interrupt_during: None,
            containers_die: false,
            app_exit: None,
            calls: Vec::new(),
            spawned: Vec::new(),
            built_images: Vec::new(),
            build_input: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub state: RefCell<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(f: impl FnOnce(&mut HostState)) -> Self {
        let host = Self::new();
        f(&mut host.state.borrow_mut());
        host
    }

    /// Number of recorded calls to `program` whose first argument is `first`.
    pub fn count(&self, program: &str, first: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.program == program && c.args.first().map(String::as_str) == Some(first))
            .count()
    }

    pub fn container(&self, name: &str) -> Option<Container> {
        self.state.borrow().containers.get(name).cloned()
    }

    fn engine(&self, args: &[String]) -> CommandOutput {
        let mut st = self.state.borrow_mut();
        let sub = args.first().map(String::as_str).unwrap_or_default();
        let last = args.last().cloned().unwrap_or_default();
        match sub {
            "version" if st.failing.contains("daemon") => fail(1, "Cannot connect to the Docker daemon"),
            "version" => ok("27.3.1\n"),
            "container" => match st.containers.get(&last) {
                Some(c) => ok(&format!(
                    r#"{{"Status":"{}","Running":{},"Pid":0}}"#,
                    c.status,
                    c.status == "running"
                )),
                None => fail(1, &format!("Error: No such container: {last}")),
            },
            "stop" => match st.containers.get_mut(&last) {
                Some(c) => {
                    c.status = "exited".into();
                    ok(&format!("{last}\n"))
                }
                None => fail(1, "No such container"),
            },
            "rm" => match st.containers.remove(&last) {
                Some(_) => ok(&format!("{last}\n")),
                None => fail(1, "No such container"),
            },
            "run" => {
                if st.failing.contains("run") {
                    return fail(125, "docker: Error response from daemon: unknown runtime");
                }
                let name = args
                    .iter()
                    .position(|a| a == "--name")
                    .and_then(|i| args.get(i + 1))
                    .cloned()
                    .unwrap_or_default();
                if st.containers.contains_key(&name) {
                    return fail(125, "Conflict. The container name is already in use");
                }
                let id = format!("c{}", st.next_id);
                st.next_id += 1;
                let status = if st.containers_die { "exited" } else { "running" };
                st.containers.insert(name, Container::new(&id, status));
                ok(&format!("{id}\n"))
            }
            _ => fail(1, "unknown command"),
        }
    }

    fn streamed(&self, cmd: &CommandSpec, cancel: &CancelToken) -> ExecResult {
        let op = match (cmd.program.as_str(), cmd.args.first().map(String::as_str)) {
            ("git", Some("clone")) => "clone",
            ("bash", _) => "install",
            ("docker", Some("build")) => "build",
            _ => return exec(127),
        };

        let mut st = self.state.borrow_mut();
        if st.interrupt_during == Some(op) {
            cancel.cancel();
            return ExecResult {
                success: false,
                exit_code: None,
                cancelled: true,
            };
        }
        if st.failing.contains(op) {
            return exec(1);
        }

        match op {
            "clone" => {
                let dest = PathBuf::from(&cmd.args[2]);
                std::fs::create_dir_all(&dest).unwrap();
                std::fs::write(dest.join("install.sh"), "#!/bin/bash\n").unwrap();
            }
            "build" => {
                let context = PathBuf::from(cmd.args.last().unwrap());
                st.build_input = std::fs::read_to_string(context.join("Dockerfile")).ok();
                let tag_at = cmd.args.iter().position(|a| a == "-t").unwrap() + 1;
                st.built_images.push(cmd.args[tag_at].clone());
            }
            _ => {}
        }
        exec(0)
    }
}

impl Runner for FakeHost {
    fn output(&self, cmd: &CommandSpec) -> io::Result<CommandOutput> {
        self.state.borrow_mut().calls.push(cmd.clone());
        let out = match cmd.program.as_str() {
            "docker" => self.engine(&cmd.args),
            "autotag" => ok(&self.state.borrow().resolver_output),
            _ => fail(127, "command not found"),
        };
        Ok(out)
    }

    fn stream(&self, cmd: &CommandSpec, cancel: &CancelToken) -> io::Result<ExecResult> {
        self.state.borrow_mut().calls.push(cmd.clone());
        Ok(self.streamed(cmd, cancel))
    }

    fn spawn(&self, cmd: &CommandSpec) -> io::Result<Box<dyn BackgroundJob>> {
        let mut st = self.state.borrow_mut();
        st.spawned.push(cmd.clone());
        let exit = if cmd.program == "docker" { st.app_exit } else { None };
        Ok(Box::new(FakeJob {
            pid: 1000 + st.spawned.len() as u32,
            exit,
        }))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.state
            .borrow()
            .tools
            .contains(program)
            .then(|| Path::new("/usr/bin").join(program))
    }
}

pub struct FakeJob {
    pid: u32,
    exit: Option<i32>,
}

impl BackgroundJob for FakeJob {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn try_status(&mut self) -> io::Result<Option<i32>> {
        Ok(self.exit)
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        status_code: 0,
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn fail(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        status_code: code,
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

fn exec(code: i32) -> ExecResult {
    ExecResult {
        success: code == 0,
        exit_code: Some(code),
        cancelled: false,
    }
}

/// Defaults with every delay removed.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.temp_container.settle_secs = 0;
    cfg.launch.settle_secs = 0;
    cfg.launch.ready_timeout_secs = 2;
    cfg
}
