use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::auth::{Credentials, Password};

/// Polling interval used when `update-interval` is unset or not positive (30 minutes).
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 1800;

/// Configuration file structure for the exporter.
///
/// Keys are kebab-case; the CamelCase spelling used by older deployments
/// (`[Jenkins]`, `URL`, `UpdateInterval`, ...) is accepted as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default, alias = "Jenkins")]
    pub jenkins: JenkinsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsConfig {
    /// Jenkins base URL, e.g. `https://jenkins.example.com/`
    #[serde(default, alias = "URL")]
    pub url: String,

    /// User for basic auth; empty means anonymous
    #[serde(default, alias = "User")]
    pub user: String,

    /// Password or API token
    #[serde(default, alias = "Password")]
    pub password: Password,

    /// Job names to export, folder jobs as `folder/job`
    #[serde(default, alias = "Jobs")]
    pub jobs: Vec<String>,

    /// Seconds between polls; zero or negative falls back to the default
    #[serde(default, alias = "UpdateInterval")]
    pub update_interval: i64,

    /// Skip TLS certificate verification
    #[serde(default = "default_tls_insecure", alias = "TLSInsecure")]
    pub tls_insecure: bool,
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: Password::default(),
            jobs: Vec::new(),
            update_interval: 0,
            tls_insecure: default_tls_insecure(),
        }
    }
}

fn default_tls_insecure() -> bool {
    true
}

impl JenkinsConfig {
    pub fn poll_interval(&self) -> Duration {
        match u64::try_from(self.update_interval) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_UPDATE_INTERVAL_SECS),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(&self.user, &self.password)
    }

    pub fn base_url(&self) -> Result<Url> {
        if self.url.is_empty() {
            bail!("jenkins.url is not set");
        }
        Url::parse(&self.url).with_context(|| format!("Invalid jenkins.url: {}", self.url))
    }
}

impl Config {
    /// Load and validate configuration from a file.
    ///
    /// The format is picked from the extension (`toml`, `json`, `yaml`/`yml`);
    /// anything else is tried as TOML, then JSON, then YAML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Config file {} not found. Please provide one with `--config <yourconfig>` or create `config.toml` in this directory",
                path.display()
            );
        }

        let config = Self::load_from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    fn validate(&self) -> Result<()> {
        self.jenkins.base_url()?;

        if self.jenkins.jobs.is_empty() {
            warn!("No jobs configured, only the connection to Jenkins will be checked");
        }

        Ok(())
    }
}
