// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration loaded from a TOML file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// All client tunables, loaded from a single TOML file.
///
/// Every field has a default so a partial (or absent) file still yields a
/// working configuration; `conf_file` records where the values came from for
/// error messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User the master runs as; selects the key file for root/sudo callers.
    pub user: String,
    /// Default reply-gathering timeout in seconds.
    pub timeout: u64,
    /// Directory holding the master's local sockets.
    pub sock_dir: PathBuf,
    /// Master cache root; job directories and key files live under it.
    pub cachedir: PathBuf,
    /// Digest used to derive job directory names.
    pub hash_type: String,
    /// Master address for the publish request/reply.
    pub interface: String,
    pub ret_port: u16,
    /// Named groups of agents, each mapping to a compound expression.
    pub nodegroups: HashMap<String, String>,
    /// Extra return sink appended to every publish when non-empty.
    pub ext_job_cache: String,
    /// Range server endpoint for expanding range expressions.
    pub range_server: String,
    /// Set when this master forwards publishes to downstream masters.
    pub order_masters: bool,
    #[serde(skip)]
    pub conf_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            timeout: 5,
            sock_dir: PathBuf::from("/var/run/muster"),
            cachedir: PathBuf::from("/var/cache/muster"),
            hash_type: "sha256".to_string(),
            interface: "127.0.0.1".to_string(),
            ret_port: 4506,
            nodegroups: HashMap::new(),
            ext_job_cache: String::new(),
            range_server: String::new(),
            order_masters: false,
            conf_file: PathBuf::new(),
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: ClientConfig = toml::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.conf_file = path.to_path_buf();
        Ok(config)
    }

    /// The configured default gather timeout.
    pub fn base_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
