//! Application configuration
//!
//! Process-level settings that sit outside the CalTopo credentials.

use crate::server::auth::DEFAULT_IDENTITY_URL;

pub const ENV_BIND: &str = "CALTOPO_MISSION_BIND";
pub const ENV_IDENTITY_URL: &str = "PB_INTERNAL_URL";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Address the HTTP server listens on
    pub bind: String,
    /// Base URL of the identity service used for admin checks
    pub identity_url: String,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            ..Self::default()
        }
    }

    /// Override defaults from the process environment
    pub fn merge_env_vars(self) -> Self {
        self.merge_lookup(|key| std::env::var(key).ok())
    }

    pub fn merge_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND).filter(|v| !v.trim().is_empty()) {
            self.bind = bind;
        }

        if let Some(url) = lookup(ENV_IDENTITY_URL).filter(|v| !v.trim().is_empty()) {
            self.identity_url = url;
        }

        self
    }

    /// Set the listen address
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,tower=debug",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            bind: DEFAULT_BIND.to_string(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
        }
    }
}
