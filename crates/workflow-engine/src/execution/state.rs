//! Transient state of a debugging run

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::NodeId;

/// Phase of a debugging run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// No run in progress
    #[default]
    Idle,
    /// A tick is scheduled or in flight
    Running,
    /// Waiting for resume, step or stop
    Paused,
}

/// Run state observed by the editor between ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionState {
    pub status: ExecutionStatus,
    /// Node the next tick evaluates
    pub current_node_id: Option<NodeId>,
    /// Variable environment; undefined variables hold `null`
    pub variables: HashMap<String, Value>,
    /// Most recent log lines, oldest first
    pub logs: Vec<String>,
}

impl ExecutionState {
    /// The reset state: idle, nowhere, no variables, no logs
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.status == ExecutionStatus::Idle
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == ExecutionStatus::Paused
    }

    /// Get a variable, treating `null` as undefined
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).filter(|v| !v.is_null())
    }

    /// Append a log line, keeping only the last `capacity` lines
    pub fn push_log(&mut self, line: impl Into<String>, capacity: usize) {
        self.logs.push(line.into());
        if self.logs.len() > capacity {
            let excess = self.logs.len() - capacity;
            self.logs.drain(..excess);
        }
    }
}
