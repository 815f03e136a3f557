//! Generated Dockerfile for the derived image.
//!
//! Rendered at run time rather than shipped as a static file so that the
//! resolved base image can be injected through a build argument.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ImageConfig;
use crate::engine::BASE_IMAGE_ARG;

pub const FILE_NAME: &str = "Dockerfile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDescription {
    pub fallback_base: String,
    pub system_packages: Vec<String>,
    pub pip_groups: Vec<Vec<String>>,
    pub workdir: String,
    pub command: Vec<String>,
}

impl BuildDescription {
    pub fn from_config(cfg: &ImageConfig) -> Self {
        Self {
            fallback_base: cfg.fallback_base.clone(),
            system_packages: cfg.system_packages.clone(),
            pip_groups: cfg.pip_groups.clone(),
            workdir: cfg.workdir.clone(),
            command: cfg.command.clone(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "ARG {BASE_IMAGE_ARG}={}", self.fallback_base);
        let _ = writeln!(out, "FROM ${{{BASE_IMAGE_ARG}}}");
        out.push('\n');
        out.push_str("ENV DEBIAN_FRONTEND=noninteractive\n");

        if !self.system_packages.is_empty() {
            let _ = writeln!(
                out,
                "RUN apt-get update && \\\n    apt-get install -y --no-install-recommends {} && \\\n    rm -rf /var/lib/apt/lists/*",
                shell_words::join(&self.system_packages)
            );
        }

        for group in &self.pip_groups {
            let _ = writeln!(
                out,
                "RUN pip3 install --no-cache-dir {}",
                shell_words::join(group)
            );
        }

        out.push('\n');
        if !self.workdir.is_empty() {
            let _ = writeln!(out, "WORKDIR {}", self.workdir);
        }
        if !self.command.is_empty() {
            // Exec form; a JSON array of strings is exactly what it expects.
            let cmd = serde_json::to_string(&self.command).unwrap_or_else(|_| "[]".into());
            let _ = writeln!(out, "CMD {cmd}");
        }
        out
    }

    /// Create `dir` and write the rendered description into it.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(FILE_NAME);
        std::fs::write(&path, self.render())?;
        Ok(path)
    }
}
