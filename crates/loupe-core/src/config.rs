//! Composer configuration.
//!
//! Everything here follows the serde-default pattern: a config file may name
//! any subset of fields and the rest fall back to compiled defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Top-level composer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Channel sizing.
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Display labels for promoted and fixed panes.
    #[serde(default)]
    pub labels: LabelConfig,
}

/// Channel capacities for the composer's internal plumbing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity of the merged source-event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Capacity of the handle command channel.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
            command_capacity: default_command_capacity(),
        }
    }
}

fn default_event_capacity() -> usize {
    64
}

fn default_command_capacity() -> usize {
    16
}

/// Display labels used by the pane builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Title of the promoted primary file preview pane.
    #[serde(default = "default_preview_label")]
    pub preview: String,

    /// Title of the promoted rendered-image pane.
    #[serde(default = "default_rendered_image_label")]
    pub rendered_image: String,

    /// First-label marker that identifies a rendered image derivative.
    #[serde(default = "default_rendered_image_marker")]
    pub rendered_image_marker: String,

    /// Title of the byte-level system pane.
    #[serde(default = "default_bytes_label")]
    pub bytes: String,

    /// Title of the textual-search system pane.
    #[serde(default = "default_search_label")]
    pub search: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            preview: default_preview_label(),
            rendered_image: default_rendered_image_label(),
            rendered_image_marker: default_rendered_image_marker(),
            bytes: default_bytes_label(),
            search: default_search_label(),
        }
    }
}

fn default_preview_label() -> String {
    "Preview".to_string()
}

fn default_rendered_image_label() -> String {
    "Rendered image".to_string()
}

fn default_rendered_image_marker() -> String {
    "rendered-image".to_string()
}

fn default_bytes_label() -> String {
    "Bytes".to_string()
}

fn default_search_label() -> String {
    "Search".to_string()
}

// =============================================================================
// Logging configuration
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-friendly output for interactive use.
    #[default]
    Pretty,
    /// JSON lines for CI and ops tooling.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level filter (trace, debug, info, warn, error).
    /// Overridden by the `RUST_LOG` environment variable when set.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Optional log file; when set, output also goes to this path.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: ComposerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.channels.event_capacity, 64);
        assert_eq!(cfg.labels.bytes, "Bytes");
        assert_eq!(cfg.labels.rendered_image_marker, "rendered-image");
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg: ComposerConfig =
            serde_json::from_str(r#"{"labels": {"bytes": "Raw bytes"}}"#).unwrap();
        assert_eq!(cfg.labels.bytes, "Raw bytes");
        assert_eq!(cfg.labels.search, "Search");
        assert_eq!(cfg.channels.command_capacity, 16);
    }

    #[test]
    fn log_format_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
