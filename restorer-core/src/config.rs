//! # Restorer Configuration
//!
//! A minimal configuration system based on a string key/value store,
//! layered as: built-in defaults, then environment overrides, then
//! whatever the application sets explicitly.
//!
//! ## Setting and reading values
//! ```rust
//! use restorer_core::RestoreConfig;
//! let mut config = RestoreConfig::new();
//!
//! config.set("http.port", "8080");
//!
//! assert_eq!(config.get("http.port"), Some("8080"));
//! ```
//!
//! ## Environment overrides
//! Variables under a prefix are normalized into dotted keys:
//!
//! ```bash
//! export RESTORER__CLIENT__POLL_INTERVAL_MS=500   # client.poll_interval_ms
//! ```

use std::collections::HashMap;
use std::time::Duration;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RESTORER__";

/// Default instruction sent to the image model with every photo.
pub const DEFAULT_RESTORE_PROMPT: &str = "Ultra-realistic recreation of an old vintage photo, keeping the same original face (99% likeness, no alteration). Transform into a modern high-quality digital portrait with vibrant updated colors, smooth realistic skin textures, and natural lighting. Try not to change any clothing or accessories";

/// Built-in defaults, applied by [`RestoreConfig::with_defaults`].
pub const DEFAULTS: &[(&str, &str)] = &[
    ("http.host", "127.0.0.1"),
    ("http.port", "3030"),
    ("http.public_prefix", "/api"),
    ("blob.namespace", "restorations"),
    ("blob.backend", "memory"),
    ("blob.max_bytes", "20971520"),
    ("genai.model", "gemini-2.5-flash-image"),
    ("genai.endpoint", "https://generativelanguage.googleapis.com/v1beta"),
    ("restore.prompt", DEFAULT_RESTORE_PROMPT),
    ("client.poll_interval_ms", "2000"),
    ("client.max_poll_failures", "5"),
];

#[derive(Debug, Default, Clone)]
pub struct RestoreConfig {
    values: HashMap<String, String>,
}

impl RestoreConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Create a config store pre-filled with [`DEFAULTS`].
    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        for (key, value) in DEFAULTS {
            config.set(*key, *value);
        }
        config
    }

    /// Defaults, overridden by `RESTORER__*` variables from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::with_defaults();
        config.load_env(ENV_PREFIX, std::env::vars());
        config
    }

    /// Apply `PREFIX__SECTION__KEY=value` pairs as `section.key` overrides.
    pub fn load_env<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> RestoreConfigSnapshot {
        RestoreConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreConfigSnapshot {
    map: HashMap<String, String>,
}

impl RestoreConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Milliseconds value as a `Duration`.
    pub fn get_millis(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_millis)
    }

    /// Seconds value as a `Duration`.
    pub fn get_secs(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_secs)
    }
}
