//! Cloner configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the subprocess-backed cloner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClonerConfig {
    /// Helper command line; the first element is the binary.
    #[serde(default)]
    pub helper_argv: Vec<String>,
    /// Extra environment variables for the helper process.
    #[serde(default)]
    pub helper_env: Vec<(String, String)>,
    /// Per-invocation wall-clock budget.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            helper_argv: Vec::new(),
            helper_env: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClonerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("cloner timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}
