use std::path::Path;

use anyhow::{Context, Result};

use super::types::Config;

/// File looked up in the work dir when no explicit path is given.
pub const DEFAULT_FILE: &str = ".jetkit.yaml";

/// Load config from `explicit`, or from [`DEFAULT_FILE`] in `dir`.
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = dir.join(DEFAULT_FILE);
            if !path.exists() {
                return Ok(Config::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
