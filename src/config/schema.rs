//! Configuration schema for aptbridge
//!
//! Configuration is read from `~/.config/aptbridge/config.toml`

use crate::cache::TtlRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Bridge tool invocation
    pub bridge: BridgeConfig,

    /// Query cache settings
    pub cache: CacheConfig,

    /// Lock polling settings
    pub lock: LockConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Bridge tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bridge executable name or path
    pub program: String,

    /// Program used for commands that need administrator rights
    pub elevation_program: String,

    /// Timeout for read-only queries (0 = none)
    pub query_timeout_secs: u64,

    /// Timeout for install/remove/update (0 = none)
    pub operation_timeout_secs: u64,
}

impl BridgeConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            program: "cockpit-apt-bridge".to_string(),
            elevation_program: "pkexec".to_string(),
            query_timeout_secs: 30,
            operation_timeout_secs: 0,
        }
    }
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache query results (default: true)
    pub enabled: bool,

    /// TTL for keys no rule matches
    pub default_ttl_secs: u64,

    /// Per key-prefix TTL overrides, e.g. `"search:" = 60`
    pub ttl: BTreeMap<String, u64>,
}

impl CacheConfig {
    /// Built-in TTL rules with the configured overrides applied
    pub fn ttl_rules(&self) -> TtlRules {
        let mut rules =
            TtlRules::default().with_default(Duration::from_secs(self.default_ttl_secs));
        for (pattern, secs) in &self.ttl {
            rules.set_rule(pattern.clone(), Duration::from_secs(*secs));
        }
        rules
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: 300,
            ttl: BTreeMap::new(),
        }
    }
}

/// Package manager lock polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Delay between lock probes in milliseconds
    pub poll_interval_ms: u64,

    /// Give up waiting after this many seconds
    pub timeout_secs: u64,
}

impl LockConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[bridge]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bridge.program, "cockpit-apt-bridge");
        assert!(config.cache.enabled);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [bridge]
            program = "/usr/local/bin/apt-bridge"

            [cache.ttl]
            "search:" = 5
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bridge.program, "/usr/local/bin/apt-bridge");
        assert_eq!(config.bridge.query_timeout_secs, 30); // default preserved
        assert_eq!(config.cache.ttl.get("search:"), Some(&5));
    }

    #[test]
    fn ttl_overrides_apply_on_top_of_builtin_rules() {
        let mut cache = CacheConfig {
            default_ttl_secs: 7,
            ..CacheConfig::default()
        };
        cache.ttl.insert("search:".to_string(), 5);

        let rules = cache.ttl_rules();
        assert_eq!(rules.resolve("search:nginx"), Duration::from_secs(5));
        assert_eq!(rules.resolve("installed"), Duration::from_secs(30));
        assert_eq!(rules.resolve("unknown"), Duration::from_secs(7));
    }
}
