//! Host facts from the running system

use layerconf_merge::Environment;
use std::env;

/// Reads the machine hostname and process environment.
///
/// The hostname can be pinned, which the CLI exposes as `--hostname`.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironment {
    hostname_override: Option<String>,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        Self {
            hostname_override: Some(hostname.into()),
        }
    }
}

impl Environment for SystemEnvironment {
    fn hostname(&self) -> Option<String> {
        if let Some(hostname) = &self.hostname_override {
            return Some(hostname.clone());
        }
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
    }

    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}
