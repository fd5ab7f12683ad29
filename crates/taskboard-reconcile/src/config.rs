#![forbid(unsafe_code)]

//! Tunable parameters for the reconciliation layer.
//!
//! [`SyncConfig`] can be loaded from TOML or JSON at startup when the
//! `config` feature is enabled.
//!
//! # Loading
//!
//! ```toml
//! # taskboard.toml
//! [timeline]
//! px_per_day = 48.0
//! expand_days = 14
//!
//! [cache]
//! rollback_depth = 32
//! ```
//!
//! ```rust,ignore
//! let config = SyncConfig::from_toml_file("taskboard.toml")?;
//! let config = SyncConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Missing fields keep their defaults, so a partial file only overrides
//! what it names.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SyncConfig {
    pub timeline: TimelineConfig,
    pub cache: CacheConfig,
}

/// Timeline geometry and expansion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct TimelineConfig {
    /// Width of one calendar day in pixels.
    pub px_per_day: f64,
    /// Days rendered past each edge of the viewport.
    pub header_buffer_days: u32,
    /// Distance from either scroll edge that triggers range expansion.
    pub edge_threshold_px: f64,
    /// Days added per expansion.
    pub expand_days: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            px_per_day: 40.0,
            header_buffer_days: 3,
            edge_threshold_px: 200.0,
            expand_days: 7,
        }
    }
}

/// Optimistic write bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct CacheConfig {
    /// In-flight writes that keep a rollback record.
    pub rollback_depth: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { rollback_depth: 64 }
    }
}

impl SyncConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every parameter; an empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let t = &self.timeline;
        if !(t.px_per_day.is_finite() && t.px_per_day > 0.0) {
            errors.push(format!(
                "timeline.px_per_day must be > 0, got {}",
                t.px_per_day
            ));
        }
        if !(t.edge_threshold_px.is_finite() && t.edge_threshold_px >= 0.0) {
            errors.push(format!(
                "timeline.edge_threshold_px must be >= 0, got {}",
                t.edge_threshold_px
            ));
        }
        if t.expand_days == 0 {
            errors.push("timeline.expand_days must be > 0".into());
        }
        if self.cache.rollback_depth == 0 {
            errors.push("cache.rollback_depth must be > 0".into());
        }
        errors
    }

    /// `self` if [`validate`](Self::validate) finds nothing.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),

    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
