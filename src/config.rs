use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("NECLATENT_CONFIG_PATH").unwrap_or("/usr/local/etc/neclatent/config.toml"))
});

pub static TEMPLATE_DIR: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("NECLATENT_TEMPLATE_DIR").unwrap_or("/var/lib/neclatent/templates"))
});

/// Score reported when the vendor's verify call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScorePolicy {
    /// Report the "cannot compare" minimum, same as for empty templates.
    #[default]
    Sentinel,
    /// Report whatever the vendor wrote to its score argument.
    Vendor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Take the SDK lock for comparisons as well as enrollments.
    pub serialize_comparisons: bool,
    pub error_score: ErrorScorePolicy,
    pub template_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serialize_comparisons: true,
            error_score: ErrorScorePolicy::Sentinel,
            template_dir: TEMPLATE_DIR.to_path_buf(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}
