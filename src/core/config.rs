//! Optional `objlint.toml` at the scan root.
//!
//! ```toml
//! jobs = 8
//! follow_links = false
//! exclude = ["build", "install"]
//! ```

use crate::core::error::LintError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "objlint.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    /// Worker threads; absent means one per available core.
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub follow_links: bool,
    /// Directory names skipped wherever they appear in the tree.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Load `objlint.toml` from `root`. No file means defaults.
pub fn load_config(root: &Path) -> Result<LintConfig, LintError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(LintConfig::default());
    }
    load_config_file(&config_path)
}

/// Load an explicitly named config file; it must exist.
pub fn load_config_file(config_path: &Path) -> Result<LintConfig, LintError> {
    let content = fs::read_to_string(config_path).map_err(|source| LintError::ReadError {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: LintConfig = toml::from_str(&content)
        .map_err(|e| LintError::ConfigError(format!("{}: {}", config_path.display(), e)))?;
    if config.jobs == Some(0) {
        return Err(LintError::ConfigError(format!(
            "{}: jobs must be at least 1",
            config_path.display()
        )));
    }
    Ok(config)
}
