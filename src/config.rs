// SPDX-License-Identifier: MIT

//! Runtime configuration read from the environment (and `.env`)

use std::path::PathBuf;

use crate::error::VerdictError;
use crate::predicate::DEFAULT_MAX_DEPTH;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Settings for the HTTP server and rule evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `VERDICT_HOST`
    pub host: String,
    /// `VERDICT_PORT`
    pub port: u16,
    /// `VERDICT_RULES`: rule book loaded at startup
    pub rules_path: Option<PathBuf>,
    /// `VERDICT_MAX_DEPTH`: deepest AST accepted
    pub max_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            rules_path: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, VerdictError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VerdictError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("VERDICT_HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("VERDICT_PORT") {
            config.port = port
                .parse()
                .map_err(|_| VerdictError::config(format!("invalid VERDICT_PORT: {}", port)))?;
        }
        if let Some(path) = lookup("VERDICT_RULES").filter(|p| !p.is_empty()) {
            config.rules_path = Some(PathBuf::from(path));
        }
        if let Some(depth) = lookup("VERDICT_MAX_DEPTH") {
            config.max_depth = match depth.parse::<usize>() {
                Ok(d) if d > 0 => d,
                _ => {
                    return Err(VerdictError::config(format!(
                        "invalid VERDICT_MAX_DEPTH: {}",
                        depth
                    )))
                }
            };
        }

        Ok(config)
    }

    /// Socket address string, e.g. `127.0.0.1:3000`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
