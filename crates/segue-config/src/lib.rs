//! Segue configuration system
//!
//! This crate provides centralized configuration for the page-transition
//! orchestrator, loading settings from `segue.toml` with environment variable
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "segue.toml";

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure for Segue
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SegueConfig {
    /// Transition orchestration settings
    pub transition: TransitionConfig,
    /// Style marker names shared with the presentation layer
    pub markers: MarkerConfig,
    /// Per-session history storage
    pub session: SessionConfig,
}

/// Transition orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    /// Namespace under which navigation history is stored
    pub namespace: String,
    /// Force cleanup of a transition after this many milliseconds without
    /// both completion signals. `None` leaves stuck transitions in place.
    pub safety_timeout_ms: Option<u64>,
}

/// Names of the style markers applied during a transition.
///
/// Defaults match the class names existing transition stylesheets key on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkerConfig {
    /// Attribute carrying the transition id on the outgoing element and its duplicate
    pub id_attribute: String,
    /// Container-level "transition in progress" class
    pub in_progress: String,
    /// Role class for the outgoing duplicate
    pub outgoing: String,
    /// Role class for the incoming element
    pub incoming: String,
    /// Prefix of the direction class (`{prefix}{forward|backward}`)
    pub direction_prefix: String,
    /// Direction suffix for forward navigation
    pub forward: String,
    /// Direction suffix for backward navigation
    pub backward: String,
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file backing the session store. In-memory when unset.
    pub file: Option<PathBuf>,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            namespace: "app".to_string(),
            safety_timeout_ms: None,
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            id_attribute: "data-anim-id".to_string(),
            in_progress: "anim-parent".to_string(),
            outgoing: "anim-last-element".to_string(),
            incoming: "anim-next-element".to_string(),
            direction_prefix: "anim-direction-".to_string(),
            forward: "next".to_string(),
            backward: "prev".to_string(),
        }
    }
}

impl SegueConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (segue.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(namespace) = std::env::var("SEGUE_NAMESPACE") {
            if !namespace.is_empty() {
                self.transition.namespace = namespace;
            }
        }
        if let Ok(val) = std::env::var("SEGUE_SAFETY_TIMEOUT_MS") {
            if val.eq_ignore_ascii_case("off") || val == "0" {
                self.transition.safety_timeout_ms = None;
            } else if let Ok(ms) = val.parse::<u64>() {
                self.transition.safety_timeout_ms = Some(ms);
            }
        }
        if let Ok(file) = std::env::var("SEGUE_SESSION_FILE") {
            self.session.file = Some(PathBuf::from(file));
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from segue.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

impl MarkerConfig {
    /// Full direction class for forward or backward navigation.
    pub fn direction_class(&self, forward: bool) -> String {
        let suffix = if forward { &self.forward } else { &self.backward };
        format!("{}{}", self.direction_prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SegueConfig::default();
        assert_eq!(config.transition.namespace, "app");
        assert_eq!(config.transition.safety_timeout_ms, None);
        assert_eq!(config.markers.id_attribute, "data-anim-id");
        assert!(config.session.file.is_none());
    }

    #[test]
    fn test_direction_class() {
        let markers = MarkerConfig::default();
        assert_eq!(markers.direction_class(true), "anim-direction-next");
        assert_eq!(markers.direction_class(false), "anim-direction-prev");
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = SegueConfig::default();
        config.transition.safety_timeout_ms = Some(750);
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: SegueConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[transition]\nnamespace = \"shop\"\n\n[markers]\nin_progress = \"busy\""
        )
        .unwrap();

        let config = SegueConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.transition.namespace, "shop");
        assert_eq!(config.markers.in_progress, "busy");
        assert_eq!(config.markers.outgoing, "anim-last-element");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transition\nnamespace = ").unwrap();

        let err = SegueConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = SegueConfig::load_from_file("/nonexistent/segue.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("SEGUE_NAMESPACE", "checkout");
            std::env::set_var("SEGUE_SAFETY_TIMEOUT_MS", "900");
        }

        let mut config = SegueConfig::default();
        config.merge_with_env();

        assert_eq!(config.transition.namespace, "checkout");
        assert_eq!(config.transition.safety_timeout_ms, Some(900));

        unsafe {
            std::env::remove_var("SEGUE_NAMESPACE");
            std::env::remove_var("SEGUE_SAFETY_TIMEOUT_MS");
        }
    }
}
