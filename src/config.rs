//! Process configuration: command-line options, secret files and the plugin
//! configuration file. Everything here is read once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::plugins::config::{PluginsConfig, ScopeError};

/// Startup configuration errors. Any of these aborts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid {section} configuration: {source}")]
    Invalid {
        section: &'static str,
        #[source]
        source: ScopeError,
    },

    #[error("{0} is empty")]
    EmptySecret(PathBuf),
}

/// Command-line options. Each can also be set through the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatops-hook")]
#[command(about = "Webhook-driven ChatOps plugins for GitHub repositories", long_about = None)]
pub struct Options {
    /// Port to listen on
    #[arg(long, env = "CHATOPS_PORT", default_value_t = 8888)]
    pub port: u16,

    /// Path to the plugin configuration file
    #[arg(long, env = "CHATOPS_CONFIG", default_value = "/etc/plugins/config.yaml")]
    pub config: PathBuf,

    /// Path to the file containing the webhook HMAC secret
    #[arg(long, env = "CHATOPS_HMAC_SECRET_FILE", default_value = "/etc/webhook/hmac")]
    pub hmac_secret_file: PathBuf,

    /// Path to the file containing the GitHub token
    #[arg(long, env = "CHATOPS_GITHUB_TOKEN_FILE", default_value = "/etc/github/oauth")]
    pub github_token_file: PathBuf,

    /// Login the bot posts comments as
    #[arg(long, env = "CHATOPS_BOT_NAME", default_value = "ci-bot")]
    pub bot_name: String,

    /// Seconds to wait for in-flight work on shutdown
    #[arg(long, env = "CHATOPS_SHUTDOWN_TIMEOUT_SECS", default_value_t = 180)]
    pub shutdown_timeout_secs: u64,
}

impl Options {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Reads a secret file, trimming surrounding whitespace.
pub fn read_secret_file(path: &Path) -> Result<String, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let secret = contents.trim();
    if secret.is_empty() {
        return Err(ConfigError::EmptySecret(path.to_path_buf()));
    }
    Ok(secret.to_string())
}

/// Loads and validates the plugin configuration file.
pub fn load_plugins_config(path: &Path) -> Result<PluginsConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: PluginsConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    config
        .validate()
        .map_err(|(section, source)| ConfigError::Invalid { section, source })?;
    Ok(config)
}
