//! Lifecycle Configuration

use serde::{Deserialize, Serialize};

/// Request driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `tracing` filter directives used when `RUST_LOG` is not set
    pub log_filter: String,

    /// Return decode faults as request errors instead of degrading the
    /// request to render-only
    pub propagate_decode_faults: bool,

    /// Produce a state snapshot at the end of each request
    pub state_saving: bool,

    /// Pretty-print JSON snapshots
    pub pretty_state: bool,
}

impl Config {
    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            propagate_decode_faults: false,
            state_saving: true,
            pretty_state: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_filter, "info");
        assert!(!config.propagate_decode_faults);
        assert!(config.state_saving);
        assert!(!config.pretty_state);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"state_saving": false, "log_filter": "fos_component=debug"}"#).unwrap();
        assert!(!config.state_saving);
        assert_eq!(config.log_filter, "fos_component=debug");
        assert!(!config.pretty_state);
    }

    #[test]
    fn test_invalid_json() {
        assert!(Config::from_json("{\"state_saving\": 3}").is_err());
    }
}
