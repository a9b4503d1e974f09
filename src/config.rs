//! Router configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every transition a service creates.
///
/// # Example
///
/// ```rust
/// use waypoint::RouterConfig;
///
/// let config = RouterConfig::from_json(r#"{ "max_redirects": 3 }"#).unwrap();
/// assert_eq!(config.max_redirects, 3);
/// assert!(!config.trace);
/// assert_eq!(config.max_history, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Longest redirect chain before the transition fails
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Emit trace events for every transition
    #[serde(default)]
    pub trace: bool,
    /// Priority of hooks registered without one
    #[serde(default)]
    pub default_priority: i32,
    /// Settled transitions kept in the history, oldest dropped first
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_redirects() -> usize {
    20
}

fn default_max_history() -> usize {
    100
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            trace: false,
            default_priority: 0,
            max_history: default_max_history(),
        }
    }
}

impl RouterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }
}
