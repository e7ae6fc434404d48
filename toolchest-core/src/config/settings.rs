//! Provisioning settings.
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "data_dir": "/opt/toolchest", "max_concurrency": 2 }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::external_tools::paths;
use crate::external_tools::PlatformTag;

/// Default number of installs allowed to run at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Settings for an [`ExternalToolManager`](crate::ExternalToolManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Directory downloads and executables are placed in.
    pub data_dir: PathBuf,
    /// Platform to install for instead of the running host.
    pub platform: Option<PlatformTag>,
    /// Upper bound on concurrent installs in a batch.
    pub max_concurrency: usize,
    /// Deadline for a whole batch, in milliseconds. No deadline when unset.
    pub install_timeout_ms: Option<u64>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            data_dir: paths::default_data_dir(),
            platform: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            install_timeout_ms: None,
        }
    }
}

impl ProvisionConfig {
    /// Config with defaults and the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Config with defaults; the data directory honors `TOOLCHEST_DATA_DIR`.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_platform(mut self, platform: PlatformTag) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the batch deadline, rounded up to whole milliseconds.
    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if timeout > Duration::from_millis(millis) {
            millis = millis.saturating_add(1);
        }
        self.install_timeout_ms = Some(millis);
        self
    }

    /// Batch deadline, if any.
    pub fn install_timeout(&self) -> Option<Duration> {
        self.install_timeout_ms.map(Duration::from_millis)
    }

    /// Concurrency bound, never below one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }

    /// The data directory as an absolute path.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        paths::absolutize(&self.data_dir)
    }
}
