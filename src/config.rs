use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::connection::Settings;
use crate::http::parser::Limits;

/// Environment variable naming a YAML configuration file.
pub const CONFIG_ENV: &str = "GRIDSERVE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub header_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub keep_alive_timeout_secs: u64,
    pub max_line_length: usize,
    pub max_headers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            header_timeout_secs: 30,
            read_timeout_secs: 30,
            keep_alive_timeout_secs: 60,
            max_line_length: 8192,
            max_headers: 100,
        }
    }
}

impl Config {
    /// Loads the file named by `GRIDSERVE_CONFIG` (defaults when unset),
    /// then applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("loading config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content).context("invalid YAML")?;
        cfg.server.validate()?;
        Ok(cfg)
    }
}

impl ServerConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.is_empty() {
            anyhow::bail!("server.listen_addr must not be empty");
        }
        if self.header_timeout_secs == 0 || self.read_timeout_secs == 0 || self.keep_alive_timeout_secs == 0 {
            anyhow::bail!("server timeouts must be at least one second");
        }
        if self.max_line_length == 0 || self.max_headers == 0 {
            anyhow::bail!("server.max_line_length and server.max_headers must be positive");
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_line_length: self.max_line_length,
            max_headers: self.max_headers,
        }
    }

    /// Runtime settings handed to every connection.
    pub fn settings(&self) -> Settings {
        Settings {
            limits: self.limits(),
            header_timeout: Duration::from_secs(self.header_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            keep_alive_timeout: Duration::from_secs(self.keep_alive_timeout_secs),
        }
    }
}
