//! Host facts consulted by the stage preprocessor.

use std::collections::HashMap;

/// Read-only view of the host running the merge.
///
/// Both lookups may fail; a failed lookup never matches a stage.
pub trait Environment {
    /// Name of the current host.
    fn hostname(&self) -> Option<String>;

    /// Value of an environment variable.
    fn var(&self, name: &str) -> Option<String>;
}

/// Fixed hostname and variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    hostname: Option<String>,
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for StaticEnvironment {
    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}
