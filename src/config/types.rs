use std::path::{Component, Path};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Top-level settings. Every field has a default, so an empty file (or no
/// file at all) reproduces the stock Jetson setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Container engine executable.
    pub engine: String,
    /// Image-tag resolver command; may carry leading arguments.
    pub resolver: String,
    pub toolkit: ToolkitConfig,
    pub temp_container: TempContainerConfig,
    pub image: ImageConfig,
    pub launch: LaunchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    pub repo: String,
    /// Checkout directory, relative to the work dir.
    pub dir: String,
    /// Installer script, relative to the checkout.
    pub installer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TempContainerConfig {
    pub name: String,
    pub runtime: Option<String>,
    /// Keeps the container alive while it is checked.
    pub command: Vec<String>,
    /// Pause between start and the liveness check.
    pub settle_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Logical name handed to the resolver.
    pub base: String,
    /// Used when the build runs without a resolved base.
    pub fallback_base: String,
    pub tag: String,
    /// Build context directory, relative to the work dir.
    pub build_dir: String,
    pub system_packages: Vec<String>,
    /// One `pip3 install` per group, in order.
    pub pip_groups: Vec<Vec<String>>,
    pub workdir: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchConfig {
    /// Logical name handed to the resolver.
    pub image: String,
    /// Arguments between `run` and the image reference.
    pub run_args: Vec<String>,
    /// Overrides the image's default command when non-empty.
    pub command: Vec<String>,
    pub host: String,
    pub port: u16,
    pub browser: String,
    pub settle_secs: u64,
    pub ready_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            resolver: "autotag".to_string(),
            toolkit: ToolkitConfig::default(),
            temp_container: TempContainerConfig::default(),
            image: ImageConfig::default(),
            launch: LaunchConfig::default(),
        }
    }
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            repo: "https://github.com/dusty-nv/jetson-containers".to_string(),
            dir: "jetson-containers".to_string(),
            installer: "install.sh".to_string(),
        }
    }
}

impl Default for TempContainerConfig {
    fn default() -> Self {
        Self {
            name: "temp_container".to_string(),
            runtime: Some("nvidia".to_string()),
            command: vec!["sleep".to_string(), "infinity".to_string()],
            settle_secs: 5,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base: "l4t-ml".to_string(),
            fallback_base: "dustynv/l4t-ml:r36.2.0".to_string(),
            tag: "l4t-ml-chromium:latest".to_string(),
            build_dir: "temp_build".to_string(),
            system_packages: vec!["chromium-browser".to_string()],
            pip_groups: vec![
                vec!["--upgrade".to_string(), "pip".to_string()],
                vec!["flask".to_string(), "flask-cors".to_string()],
                vec!["opencv-python-headless".to_string(), "pillow".to_string()],
            ],
            workdir: "/app".to_string(),
            command: vec!["python3".to_string(), "app.py".to_string()],
        }
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            image: "l4t-ml-chromium".to_string(),
            run_args: vec![
                "--rm".to_string(),
                "--runtime".to_string(),
                "nvidia".to_string(),
                "--network".to_string(),
                "host".to_string(),
            ],
            command: Vec::new(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            browser: "chromium-browser".to_string(),
            settle_secs: 5,
            ready_timeout_secs: 60,
        }
    }
}

impl LaunchConfig {
    /// What the browser is pointed at.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Config {
    /// Reject values that would make a flow act on the wrong resource.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("engine", &self.engine),
            ("resolver", &self.resolver),
            ("toolkit.repo", &self.toolkit.repo),
            ("toolkit.dir", &self.toolkit.dir),
            ("temp_container.name", &self.temp_container.name),
            ("image.base", &self.image.base),
            ("image.tag", &self.image.tag),
            ("image.build_dir", &self.image.build_dir),
            ("launch.image", &self.launch.image),
            ("launch.browser", &self.launch.browser),
        ] {
            if value.trim().is_empty() {
                bail!("`{field}` cannot be blank");
            }
        }
        for (field, value) in [
            ("toolkit.dir", &self.toolkit.dir),
            ("image.build_dir", &self.image.build_dir),
        ] {
            if !is_plain_relative(value) {
                bail!("`{field}` must be a relative path below the work dir without `.` or `..`: {value}");
            }
        }
        // The build dir is deleted on every exit path; it must not overlap the checkout.
        let build_dir = Path::new(&self.image.build_dir);
        let toolkit_dir = Path::new(&self.toolkit.dir);
        if build_dir.starts_with(toolkit_dir) || toolkit_dir.starts_with(build_dir) {
            bail!(
                "`image.build_dir` ({}) overlaps `toolkit.dir` ({})",
                self.image.build_dir,
                self.toolkit.dir
            );
        }
        if self.launch.port == 0 {
            bail!("`launch.port` must be a non-zero port");
        }
        if let Some(i) = self.image.pip_groups.iter().position(Vec::is_empty) {
            bail!("`image.pip_groups[{i}]` is empty");
        }
        if shell_words::split(&self.resolver).is_err() {
            bail!("`resolver` is not a valid command line: {}", self.resolver);
        }
        Ok(())
    }
}

fn is_plain_relative(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config = serde_yaml::from_str("launch:\n  port: 9090\n").unwrap();
        assert_eq!(cfg.launch.port, 9090);
        assert_eq!(cfg.launch.browser, "chromium-browser");
        assert_eq!(cfg.temp_container.name, "temp_container");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = serde_yaml::from_str::<Config>("imgae:\n  tag: x\n").unwrap_err();
        assert!(err.to_string().contains("imgae"));
    }

    #[test]
    fn blank_container_name_is_rejected() {
        let mut cfg = Config::default();
        cfg.temp_container.name = "  ".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("temp_container.name"));
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut cfg = Config::default();
        cfg.launch.port = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_pip_group_is_rejected() {
        let mut cfg = Config::default();
        cfg.image.pip_groups.push(Vec::new());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("pip_groups[3]"));
    }

    #[test]
    fn build_dir_outside_its_own_subtree_is_rejected() {
        for value in [".", "..", "./", "../build", "temp/../..", "/tmp/build", "/"] {
            let mut cfg = Config::default();
            cfg.image.build_dir = value.into();
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("image.build_dir"), "{value} accepted");
        }
    }

    #[test]
    fn build_dir_overlapping_checkout_is_rejected() {
        for (build_dir, toolkit_dir) in [
            ("jetson-containers", "jetson-containers"),
            ("jetson-containers/build", "jetson-containers"),
            ("vendor", "vendor/jetson-containers"),
        ] {
            let mut cfg = Config::default();
            cfg.image.build_dir = build_dir.into();
            cfg.toolkit.dir = toolkit_dir.into();
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("overlaps"), "{build_dir} accepted");
        }
    }

    #[test]
    fn nested_build_dir_is_accepted() {
        let mut cfg = Config::default();
        cfg.image.build_dir = "out/temp_build".into();
        cfg.validate().unwrap();
    }

    #[test]
    fn url_uses_port() {
        let cfg = LaunchConfig {
            port: 5000,
            ..LaunchConfig::default()
        };
        assert_eq!(cfg.url(), "http://localhost:5000");
    }
}
