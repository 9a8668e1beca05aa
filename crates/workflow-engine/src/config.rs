//! Engine configuration
//!
//! All fields default to the values in [`crate::constants`]; a JSON file
//! only needs to name the fields it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{layout, limits, timing};
use crate::error::Result;

/// Top-level configuration for the graph model and the debugger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Layout rules used by graph surgery
    pub layout: LayoutConfig,
    /// Interpreter pacing and log retention
    pub execution: ExecutionConfig,
    /// Undo history settings
    pub history: HistoryConfig,
}

impl EngineConfig {
    /// Parse a configuration from JSON, defaulting missing fields
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        log::info!("Loaded engine config from {:?}", path);
        Ok(config)
    }
}

/// Layout rules for inserting and duplicating nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Gap between a source and an inserted node, also the downstream shift
    pub insert_gap: f64,
    /// Margin deciding whether a source→target edge has room for a new node
    pub cramped_margin: f64,
    /// Offset applied to duplicated nodes
    pub duplicate_offset: f64,
    /// Iteration cap for the downstream search
    pub downstream_search_cap: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            insert_gap: layout::INSERT_GAP,
            cramped_margin: layout::CRAMPED_MARGIN,
            duplicate_offset: layout::DUPLICATE_OFFSET,
            downstream_search_cap: limits::DOWNSTREAM_SEARCH_CAP,
        }
    }
}

/// Interpreter pacing and log retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// Delay before each tick, for visual feedback only
    pub tick_delay_ms: u64,
    /// Delay before the completion message after the last tick
    pub completion_delay_ms: u64,
    /// Number of log lines retained
    pub log_capacity: usize,
}

impl ExecutionConfig {
    pub fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tick_delay_ms: timing::TICK_DELAY_MS,
            completion_delay_ms: timing::COMPLETION_DELAY_MS,
            log_capacity: limits::LOG_CAPACITY,
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HistoryConfig {
    /// Record snapshots after structural edits
    pub enabled: bool,
    /// Snapshots kept per workflow
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_snapshots: limits::UNDO_SNAPSHOTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.layout.insert_gap, 250.0);
        assert_eq!(config.layout.cramped_margin, 50.0);
        assert_eq!(config.layout.downstream_search_cap, 1000);
        assert_eq!(config.execution.log_capacity, 20);
        assert_eq!(config.execution.tick_delay(), Duration::from_millis(600));
        assert!(config.history.enabled);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{"execution": {"tickDelayMs": 0}, "layout": {"insertGap": 300.0}}"#,
        )
        .unwrap();
        assert_eq!(config.execution.tick_delay_ms, 0);
        assert_eq!(config.execution.completion_delay_ms, 500);
        assert_eq!(config.layout.insert_gap, 300.0);
        assert_eq!(config.layout.cramped_margin, 50.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"history": {{"enabled": false}}}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(!config.history.enabled);
        assert_eq!(config.history.max_snapshots, 100);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/engine.json").unwrap_err();
        assert!(matches!(err, crate::error::WorkflowError::Io(_)));
    }
}
